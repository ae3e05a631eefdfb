//! Security-patch-level respin for generic system images.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::info;

use crate::error::{HostError, HostResult};

/// Validate and canonicalize a patch-level version string (`YYYY-MM-DD`,
/// zero-padded).
pub fn validate_spl_version(version: &str) -> HostResult<String> {
    let date = NaiveDate::parse_from_str(version, "%Y-%m-%d").map_err(|_| {
        HostError::Argument(format!(
            "version must be a valid YYYY-MM-DD date, got {}",
            version
        ))
    })?;
    Ok(date.format("%Y-%m-%d").to_string())
}

/// Where the respun image lands: `system-<version>.img` beside the source.
pub fn respin_output_path(gsi: &Path, version: &str) -> PathBuf {
    let dir = gsi.parent().unwrap_or_else(|| Path::new("."));
    dir.join(format!("system-{}.img", version))
}

/// Drives the external patch-level respin tool.
pub struct GsiTool {
    spl_tool: String,
}

impl GsiTool {
    pub fn new(spl_tool: impl Into<String>) -> Self {
        Self {
            spl_tool: spl_tool.into(),
        }
    }

    /// Rewrite the security patch level of `gsi`, producing a new image
    /// beside it. The version is validated before anything is touched.
    pub async fn respin(&self, gsi: &Path, version: &str) -> HostResult<PathBuf> {
        let version = validate_spl_version(version)?;
        if !gsi.is_file() {
            return Err(HostError::NotFound(format!(
                "cannot find system image at {}",
                gsi.display()
            )));
        }

        let output_path = respin_output_path(gsi, &version);
        let output = Command::new(&self.spl_tool)
            .arg(gsi)
            .arg(&output_path)
            .arg(&version)
            .output()
            .await
            .map_err(|e| HostError::tool(&self.spl_tool, e.to_string()))?;
        if !output.status.success() {
            return Err(HostError::tool(
                &self.spl_tool,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        info!(gsi = %gsi.display(), version, output = %output_path.display(), "respun security patch level");
        Ok(output_path)
    }
}
