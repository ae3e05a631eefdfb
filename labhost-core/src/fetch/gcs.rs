use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::info;

use crate::error::{HostError, HostResult};

use super::{scan_artifact_dir, ArtifactSelector, ArtifactSet, BuildProvider};

/// Fetch provider for artifacts in cloud storage, driven through the
/// `gsutil` command-line tool.
#[derive(Debug)]
pub struct GcsProvider {
    gsutil: String,
    cache_dir: PathBuf,
}

impl GcsProvider {
    pub fn new(gsutil: impl Into<String>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            gsutil: gsutil.into(),
            cache_dir: cache_dir.into(),
        }
    }

    /// Local directory one object path downloads into.
    fn dest_dir(&self, object_path: &str) -> PathBuf {
        let sanitized: String = object_path
            .trim_start_matches("gs://")
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        self.cache_dir.join(sanitized)
    }

    async fn gsutil_copy(&self, src: &str, dest: &PathBuf) -> HostResult<()> {
        tokio::fs::create_dir_all(dest).await?;
        let output = Command::new(&self.gsutil)
            .arg("cp")
            .arg("-r")
            .arg(src)
            .arg(dest)
            .output()
            .await
            .map_err(|e| HostError::tool(&self.gsutil, e.to_string()))?;
        if !output.status.success() {
            return Err(HostError::tool(
                &self.gsutil,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl BuildProvider for GcsProvider {
    fn provider_name(&self) -> &str {
        "gcs"
    }

    async fn fetch(&self, selector: &ArtifactSelector) -> HostResult<ArtifactSet> {
        let path = selector
            .path
            .as_deref()
            .ok_or_else(|| HostError::Argument("--path is required for gcs".to_string()))?;
        if !path.starts_with("gs://") {
            return Err(HostError::Argument(format!(
                "not a cloud storage path: {}",
                path
            )));
        }

        let dest = self.dest_dir(path);
        self.gsutil_copy(path, &dest).await?;
        let mut set = scan_artifact_dir(&dest);

        if let Some(tool) = selector.tool.as_deref() {
            let tool_dest = dest.join("tools");
            self.gsutil_copy(tool, &tool_dest).await?;
            let name = tool
                .rsplit('/')
                .next()
                .unwrap_or(tool)
                .to_string();
            set.tools.insert(name.clone(), tool_dest.join(&name));
        }

        info!(path, dest = %dest.display(), "fetched cloud-storage artifacts");
        Ok(set)
    }
}
