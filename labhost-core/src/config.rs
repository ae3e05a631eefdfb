use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{HostError, HostResult};

/// The default partner build account. Access is granted per lab by the
/// partner engineering contact.
pub const DEFAULT_ACCOUNT_ID: &str = "543365459";

/// Top-level configuration for a host-controller process.
///
/// Loaded from an optional `labhost.toml` with `LABHOST_*` environment
/// overrides layered on top.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HostConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub tasks: TaskServerConfig,
    #[serde(default)]
    pub build: BuildServerConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub hosts: Vec<HostEntry>,
}

/// The central scheduling endpoint that receives build/device/config state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_scheduler_url")]
    pub url: String,
}

/// The task-queue server that requests are submitted to and tasks leased
/// from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskServerConfig {
    #[serde(default = "default_task_url")]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildServerConfig {
    /// Partner build server base URL.
    #[serde(default = "default_pab_url")]
    pub partner_url: String,

    /// Internal build server base URL.
    #[serde(default = "default_ab_url")]
    pub internal_url: String,

    #[serde(default = "default_account_id")]
    pub account_id: String,

    /// Where fetched artifacts are cached. Defaults to the platform cache
    /// directory.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

/// External tools the console shells out to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_fastboot")]
    pub fastboot: String,

    #[serde(default = "default_adb")]
    pub adb: String,

    #[serde(default = "default_gsutil")]
    pub gsutil: String,

    #[serde(default = "default_unzip")]
    pub unzip: String,

    /// Security-patch-level respin tool for GSI images.
    #[serde(default = "default_spl_tool")]
    pub spl_tool: String,
}

/// One lab machine this console controls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostEntry {
    pub hostname: String,
    #[serde(default)]
    pub cluster_ids: Vec<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            url: default_scheduler_url(),
        }
    }
}

impl Default for TaskServerConfig {
    fn default() -> Self {
        Self {
            url: default_task_url(),
        }
    }
}

impl Default for BuildServerConfig {
    fn default() -> Self {
        Self {
            partner_url: default_pab_url(),
            internal_url: default_ab_url(),
            account_id: default_account_id(),
            cache_dir: None,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            fastboot: default_fastboot(),
            adb: default_adb(),
            gsutil: default_gsutil(),
            unzip: default_unzip(),
            spl_tool: default_spl_tool(),
        }
    }
}

fn default_scheduler_url() -> String {
    "https://scheduler.test-lab.example.com".to_string()
}

fn default_task_url() -> String {
    "https://tasks.test-lab.example.com".to_string()
}

fn default_pab_url() -> String {
    "https://partner-build.example.com".to_string()
}

fn default_ab_url() -> String {
    "https://build.example.com".to_string()
}

fn default_account_id() -> String {
    DEFAULT_ACCOUNT_ID.to_string()
}

fn default_fastboot() -> String {
    "fastboot".to_string()
}

fn default_adb() -> String {
    "adb".to_string()
}

fn default_gsutil() -> String {
    "gsutil".to_string()
}

fn default_unzip() -> String {
    "unzip".to_string()
}

fn default_spl_tool() -> String {
    "change-spl".to_string()
}

impl HostConfig {
    /// Load configuration from an optional file plus `LABHOST_*` environment
    /// overrides.
    pub fn load(path: Option<&str>) -> HostResult<Self> {
        let mut builder = ConfigBuilder::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path));
        } else {
            builder = builder.add_source(File::with_name("labhost").required(false));
        }
        builder = builder.add_source(Environment::with_prefix("LABHOST").separator("__"));

        let config = builder.build()?;
        let config: HostConfig = config.try_deserialize()?;
        Ok(config)
    }

    /// Resolve the artifact cache directory, creating it if needed.
    pub fn cache_dir(&self) -> HostResult<PathBuf> {
        let dir = match &self.build.cache_dir {
            Some(dir) => dir.clone(),
            None => dirs::cache_dir()
                .ok_or_else(|| HostError::Config("no cache directory available".to_string()))?
                .join("labhost"),
        };
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HostConfig::default();
        assert_eq!(config.build.account_id, DEFAULT_ACCOUNT_ID);
        assert_eq!(config.tools.fastboot, "fastboot");
        assert_eq!(config.tools.spl_tool, "change-spl");
        assert!(config.hosts.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labhost.toml");
        std::fs::write(
            &path,
            r#"
[scheduler]
url = "lab-scheduler.appspot.com"

[[hosts]]
hostname = "lab-host-01"
cluster_ids = ["cluster-a"]

[[hosts]]
hostname = "lab-host-02"
"#,
        )
        .unwrap();

        let config = HostConfig::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.scheduler.url, "lab-scheduler.appspot.com");
        assert_eq!(config.hosts.len(), 2);
        assert_eq!(config.hosts[0].cluster_ids, vec!["cluster-a"]);
        assert!(config.hosts[1].cluster_ids.is_empty());
        // untouched sections fall back to defaults
        assert_eq!(config.build.account_id, DEFAULT_ACCOUNT_ID);
    }
}
