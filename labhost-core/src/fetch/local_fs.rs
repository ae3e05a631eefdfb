use async_trait::async_trait;
use std::path::Path;
use tracing::info;

use crate::error::{HostError, HostResult};

use super::{scan_artifact_dir, ArtifactSelector, ArtifactSet, BuildProvider};

/// Fetch provider for build output already present on the local filesystem.
#[derive(Debug, Default)]
pub struct LocalFsProvider;

impl LocalFsProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BuildProvider for LocalFsProvider {
    fn provider_name(&self) -> &str {
        "local_fs"
    }

    async fn fetch(&self, selector: &ArtifactSelector) -> HostResult<ArtifactSet> {
        let path = selector
            .path
            .as_deref()
            .ok_or_else(|| HostError::Argument("--path is required for local_fs".to_string()))?;
        let dir = Path::new(path);
        if !dir.is_dir() {
            return Err(HostError::NotFound(format!(
                "artifact directory does not exist: {}",
                path
            )));
        }

        let set = scan_artifact_dir(dir);
        info!(
            path,
            images = set.device_images.len(),
            suites = set.test_suites.len(),
            "fetched local artifacts"
        );
        Ok(set)
    }
}
