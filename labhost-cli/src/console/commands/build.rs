use clap::Parser;
use std::time::Duration;

use labhost_core::{HostError, HostResult};

use super::{Console, UpdateAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ArtifactType {
    Device,
    Gsi,
    Test,
}

impl ArtifactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactType::Device => "device",
            ArtifactType::Gsi => "gsi",
            ArtifactType::Test => "test",
        }
    }
}

/// Specify branches and targets to monitor for new builds.
#[derive(Parser, Debug)]
#[command(name = "build", disable_help_flag = true)]
pub struct BuildArgs {
    /// Update build info.
    #[arg(long, value_enum, default_value_t = UpdateAction::Start)]
    pub update: UpdateAction,

    /// Session id; required for the stop sub-verb.
    #[arg(long)]
    pub id: Option<u32>,

    /// Interval (seconds) to repeat the build update.
    #[arg(long, default_value_t = 30)]
    pub interval: i64,

    /// The type of artifact to update.
    #[arg(long = "artifact-type", value_enum, default_value_t = ArtifactType::Device)]
    pub artifact_type: ArtifactType,

    /// Branch to grab the artifact from.
    #[arg(long, required = true)]
    pub branch: String,

    /// A comma-separated list of build target product(s).
    #[arg(long, required = true)]
    pub target: String,

    /// Partner build account to use.
    #[arg(long = "account_id")]
    pub account_id: Option<String>,
}

pub async fn run(console: &Console, args: BuildArgs) -> HostResult<()> {
    let account_id = args
        .account_id
        .clone()
        .unwrap_or_else(|| console.default_account_id.clone());

    match args.update {
        UpdateAction::Single => {
            console
                .build_updater
                .update(
                    &account_id,
                    &args.branch,
                    &args.target,
                    args.artifact_type.as_str(),
                )
                .await
        }
        UpdateAction::List => {
            println!("Running build update sessions:");
            for (id, state) in console.build_sessions.list() {
                println!("  ID {} ({})", id, state);
            }
            Ok(())
        }
        UpdateAction::Start => {
            if args.interval <= 0 {
                return Err(HostError::Argument(
                    "update interval must be positive".to_string(),
                ));
            }
            let interval = Duration::from_secs(args.interval as u64);
            let label = format!("branch={} target={}", args.branch, args.target);

            let updater = console.build_updater.clone();
            let branch = args.branch.clone();
            let target = args.target.clone();
            let artifact_type = args.artifact_type;
            let id = console.build_sessions.start(args.id, label, interval, move || {
                let updater = updater.clone();
                let account_id = account_id.clone();
                let branch = branch.clone();
                let target = target.clone();
                async move {
                    updater
                        .update(&account_id, &branch, &target, artifact_type.as_str())
                        .await
                }
            })?;
            println!("build update session started (ID {})", id);
            Ok(())
        }
        UpdateAction::Stop => {
            let id = args.id.ok_or_else(|| {
                HostError::Argument("--id must be set for stop".to_string())
            })?;
            console.build_sessions.stop(id)
        }
    }
}
