use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use labhost_core::{
    ArtifactSelector, ArtifactSet, BuildProvider, FetchMethod, HostResult, ProviderKind,
    ResourceLocator,
};

use super::Console;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ProviderType {
    #[value(name = "local_fs")]
    LocalFs,
    Gcs,
    Pab,
    Ab,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum MethodArg {
    #[value(name = "GET")]
    Get,
    #[value(name = "POST")]
    Post,
}

impl From<MethodArg> for FetchMethod {
    fn from(method: MethodArg) -> Self {
        match method {
            MethodArg::Get => FetchMethod::Get,
            MethodArg::Post => FetchMethod::Post,
        }
    }
}

/// Fetch a build artifact.
#[derive(Parser, Debug)]
#[command(name = "fetch", disable_help_flag = true)]
pub struct FetchArgs {
    /// Build provider type.
    #[arg(long = "type", value_enum, default_value_t = ProviderType::Pab)]
    pub provider_type: ProviderType,

    /// Method for fetching.
    #[arg(long, value_enum, default_value_t = MethodArg::Get)]
    pub method: MethodArg,

    /// The path of a local directory which keeps the artifacts, or a
    /// cloud-storage object path.
    #[arg(long)]
    pub path: Option<String>,

    /// Branch to grab the artifact from.
    #[arg(long)]
    pub branch: Option<String>,

    /// Target product to grab the artifact from.
    #[arg(long)]
    pub target: Option<String>,

    /// Partner build account to use.
    #[arg(long = "account_id")]
    pub account_id: Option<String>,

    /// Build id to use, default latest.
    #[arg(long = "build_id", default_value = "latest")]
    pub build_id: String,

    /// Name of the artifact to be fetched. `{id}` is replaced with the
    /// build id.
    #[arg(long = "artifact_name")]
    pub artifact_name: Option<String>,

    /// Credential file for POST fetching.
    #[arg(long = "userinfo_file")]
    pub userinfo_file: Option<PathBuf>,

    /// The path of a custom tool to be fetched from cloud storage.
    #[arg(long)]
    pub tool: Option<String>,

    /// Resource locator short form; the scheme picks the provider.
    #[arg(value_name = "URL")]
    pub url: Option<String>,
}

impl FetchArgs {
    fn selector(&self, console: &Console) -> ArtifactSelector {
        ArtifactSelector {
            account_id: Some(
                self.account_id
                    .clone()
                    .unwrap_or_else(|| console.default_account_id.clone()),
            ),
            branch: self.branch.clone(),
            target: self.target.clone(),
            build_id: Some(self.build_id.clone()),
            artifact_name: self.artifact_name.clone(),
            method: self.method.into(),
            path: self.path.clone(),
            tool: self.tool.clone(),
            userinfo_file: self.userinfo_file.clone(),
        }
    }
}

pub async fn run(console: &Console, args: FetchArgs) -> HostResult<()> {
    let set = match &args.url {
        Some(url) => {
            let locator = ResourceLocator::parse(url)?;
            let provider: &dyn BuildProvider = match locator.kind {
                ProviderKind::Pab => console.pab.as_ref(),
                ProviderKind::Ab => console.ab.as_ref(),
                ProviderKind::Gcs => console.gcs.as_ref(),
            };
            provider.fetch(&locator.selector).await?
        }
        None => {
            let selector = args.selector(console);
            let provider: &dyn BuildProvider = match args.provider_type {
                ProviderType::LocalFs => console.local_fs.as_ref(),
                ProviderType::Gcs => console.gcs.as_ref(),
                ProviderType::Pab => console.pab.as_ref(),
                ProviderType::Ab => console.ab.as_ref(),
            };
            provider.fetch(&selector).await?
        }
    };

    console
        .state
        .record_fetch(set.build_id.clone(), args.branch.clone(), args.target.clone());
    log_fetched(&set);
    console.state.merge_artifacts(set);
    Ok(())
}

fn log_fetched(set: &ArtifactSet) {
    if !set.device_images.is_empty() {
        info!(
            "device images:\n{}",
            set.device_images
                .iter()
                .map(|(name, path)| format!("{}: {}", name, path.display()))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }
    if !set.test_suites.is_empty() {
        info!(
            "test suites:\n{}",
            set.test_suites
                .iter()
                .map(|(name, path)| format!("{}: {}", name, path.display()))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }
}
