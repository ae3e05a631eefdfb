//! Build-artifact fetch providers.
//!
//! Every provider resolves an [`ArtifactSelector`] into local file paths
//! behind the same [`BuildProvider`] contract; the console merges the
//! resulting [`ArtifactSet`] into shared state.

pub mod locator;

mod ab;
mod gcs;
mod local_fs;
mod pab;

pub use ab::InternalBuildClient;
pub use gcs::GcsProvider;
pub use local_fs::LocalFsProvider;
pub use pab::{BuildEntry, PartnerBuildClient};

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{HostError, HostResult};

/// Name of the packed full-image archive some builds publish instead of
/// individual partition images.
pub const FULL_ZIPFILE: &str = "img.zip";

/// Suffix that marks a test-suite launcher in an artifact directory.
const SUITE_LAUNCHER_SUFFIX: &str = "-tradefed";

/// Prefix/suffix of the global config bundle artifact.
const CONFIG_BUNDLE_PREFIX: &str = "vti-global-config-";
const CONFIG_BUNDLE_SUFFIX: &str = ".zip";

/// HTTP method a provider uses for fetching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchMethod {
    #[default]
    Get,
    Post,
}

impl FetchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchMethod::Get => "GET",
            FetchMethod::Post => "POST",
        }
    }
}

/// What to fetch. Each provider reads the fields it needs and rejects
/// requests missing its required ones.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSelector {
    pub account_id: Option<String>,
    pub branch: Option<String>,
    pub target: Option<String>,
    /// `None` means the latest successful build.
    pub build_id: Option<String>,
    /// `{id}` in the name is replaced with the resolved build id.
    pub artifact_name: Option<String>,
    pub method: FetchMethod,
    /// Local directory (local_fs) or `gs://` object path (gcs).
    pub path: Option<String>,
    /// Extra tool object to fetch (gcs).
    pub tool: Option<String>,
    /// Credential file for POST fetching (pab).
    pub userinfo_file: Option<PathBuf>,
}

/// Artifact name -> local path maps reported by one fetch.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSet {
    pub device_images: HashMap<String, PathBuf>,
    pub test_suites: HashMap<String, PathBuf>,
    pub tools: HashMap<String, PathBuf>,
    /// Config bundles keyed by config type (`prod`, `test`).
    pub configs: HashMap<String, PathBuf>,
    /// Build id the artifacts came from, when the provider knows it.
    pub build_id: Option<String>,
}

impl ArtifactSet {
    pub fn is_empty(&self) -> bool {
        self.device_images.is_empty()
            && self.test_suites.is_empty()
            && self.tools.is_empty()
            && self.configs.is_empty()
    }
}

/// External collaborator that resolves a build/artifact selector into local
/// file paths.
#[async_trait]
pub trait BuildProvider: Send + Sync {
    fn provider_name(&self) -> &str;

    async fn fetch(&self, selector: &ArtifactSelector) -> HostResult<ArtifactSet>;
}

/// Sort one fetched file into the right map of an [`ArtifactSet`].
pub(crate) fn classify_artifact(set: &mut ArtifactSet, name: &str, path: PathBuf) {
    if let Some(config_type) = name
        .strip_prefix(CONFIG_BUNDLE_PREFIX)
        .and_then(|rest| rest.strip_suffix(CONFIG_BUNDLE_SUFFIX))
    {
        set.configs.insert(config_type.to_string(), path);
    } else if let Some(suite) = name.strip_suffix(SUITE_LAUNCHER_SUFFIX) {
        set.test_suites.insert(suite.to_string(), path);
    } else {
        // .img files, the full-image zip, and anything else the caller asked
        // for by name stay addressable through the device-image map.
        set.device_images.insert(name.to_string(), path);
    }
}

/// Scan a directory of build output into an artifact set.
pub(crate) fn scan_artifact_dir(dir: &Path) -> ArtifactSet {
    let mut set = ArtifactSet::default();
    for entry in walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if name.ends_with(".img") || name == FULL_ZIPFILE {
            set.device_images
                .insert(name.to_string(), entry.path().to_path_buf());
        } else if let Some(suite) = name.strip_suffix(SUITE_LAUNCHER_SUFFIX) {
            set.test_suites
                .insert(suite.to_string(), entry.path().to_path_buf());
        }
    }
    debug!(
        dir = %dir.display(),
        images = set.device_images.len(),
        suites = set.test_suites.len(),
        "scanned artifact directory"
    );
    set
}

/// Download a URL to a file, treating any non-2xx status as a transport
/// failure.
pub(crate) async fn download_file(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
) -> HostResult<()> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(HostError::Transport(format!("GET {} returned {}", url, status)));
    }
    let bytes = response.bytes().await?;
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(dest, &bytes).await?;
    Ok(())
}
