//! Units of work behind the `build`, `config`, and `device` update
//! commands. Each runs once for `--update=single` and repeatedly inside a
//! polling session for `--update=start`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;
use tracing::{info, warn};

use crate::device::DeviceScanner;
use crate::error::{HostError, HostResult};
use crate::fetch::{ArtifactSelector, BuildProvider, FetchMethod, PartnerBuildClient};
use crate::host::Host;
use crate::scheduler::{BuildInfo, LabConfig, ScheduleConfig, SchedulerClient};
use crate::tfc::{HostEvent, TaskClient};

/// Which cloud scheduler a device update reports to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerType {
    Vti,
    Tfc,
}

impl ServerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerType::Vti => "vti",
            ServerType::Tfc => "tfc",
        }
    }
}

/// Lists new builds for monitored branch/targets and reports them.
pub struct BuildUpdater {
    pab: Arc<PartnerBuildClient>,
    scheduler: Arc<SchedulerClient>,
}

impl BuildUpdater {
    pub fn new(pab: Arc<PartnerBuildClient>, scheduler: Arc<SchedulerClient>) -> Self {
        Self { pab, scheduler }
    }

    /// One build update pass over a comma-separated target list.
    pub async fn update(
        &self,
        account_id: &str,
        branch: &str,
        targets: &str,
        artifact_type: &str,
    ) -> HostResult<()> {
        let mut builds = Vec::new();
        for target in targets.split(',').filter(|t| !t.is_empty()) {
            let listed = self
                .pab
                .list_builds(account_id, branch, target, "", 100)
                .await?;
            for entry in listed.into_iter().filter(|b| b.successful) {
                builds.push(build_info_for(branch, target, &entry.build_id, artifact_type));
            }
        }
        info!(branch, targets, count = builds.len(), "uploading build info");
        self.scheduler.upload_build_info(&builds).await
    }
}

/// Build one upload row; targets written as `product-variant` carry the
/// variant as the build type.
fn build_info_for(branch: &str, target: &str, build_id: &str, artifact_type: &str) -> BuildInfo {
    let (build_target, build_type) = match target.split_once('-') {
        Some((product, variant)) => (product.to_string(), variant.to_string()),
        None => (target.to_string(), String::new()),
    };
    BuildInfo {
        manifest_branch: branch.to_string(),
        build_id: build_id.to_string(),
        build_target,
        build_type,
        artifact_type: artifact_type.to_string(),
        artifacts: vec![],
    }
}

/// Fetches the global config bundle of the latest build and pushes the
/// schedule and lab tables it contains.
pub struct ConfigUpdater {
    pab: Arc<PartnerBuildClient>,
    scheduler: Arc<SchedulerClient>,
    unzip: String,
}

impl ConfigUpdater {
    pub fn new(
        pab: Arc<PartnerBuildClient>,
        scheduler: Arc<SchedulerClient>,
        unzip: impl Into<String>,
    ) -> Self {
        Self {
            pab,
            scheduler,
            unzip: unzip.into(),
        }
    }

    /// One config update pass over a comma-separated target list.
    pub async fn update(
        &self,
        account_id: &str,
        branch: &str,
        targets: &str,
        config_type: &str,
        method: FetchMethod,
    ) -> HostResult<()> {
        for target in targets.split(',').filter(|t| !t.is_empty()) {
            let listed = self.pab.list_builds(account_id, branch, target, "", 1).await?;
            let Some(latest) = listed.into_iter().next().filter(|b| b.successful) else {
                warn!(branch, target, "no successful build to pull configs from");
                continue;
            };

            let selector = ArtifactSelector {
                account_id: Some(account_id.to_string()),
                branch: Some(branch.to_string()),
                target: Some(target.to_string()),
                build_id: Some(latest.build_id.clone()),
                artifact_name: Some(format!("vti-global-config-{}.zip", config_type)),
                method,
                ..Default::default()
            };
            let set = self.pab.fetch(&selector).await?;
            let Some(bundle) = set.configs.get(config_type) else {
                warn!(target, config_type, "fetch returned no config bundle");
                continue;
            };

            let dir = self.extract_bundle(bundle).await?;
            let (schedules, labs) = load_configs_from_dir(&dir)?;
            info!(
                target,
                schedules = schedules.len(),
                labs = labs.len(),
                "uploading config info"
            );
            self.scheduler.upload_schedule_info(&schedules).await?;
            self.scheduler.upload_lab_info(&labs).await?;
        }
        Ok(())
    }

    async fn extract_bundle(&self, bundle: &Path) -> HostResult<PathBuf> {
        let dest = bundle.with_extension("d");
        tokio::fs::create_dir_all(&dest).await?;
        let output = Command::new(&self.unzip)
            .arg("-o")
            .arg(bundle)
            .arg("-d")
            .arg(&dest)
            .output()
            .await
            .map_err(|e| HostError::tool(&self.unzip, e.to_string()))?;
        if !output.status.success() {
            return Err(HostError::tool(
                &self.unzip,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(dest)
    }
}

/// Parse every schedule and lab config under an extracted bundle.
pub fn load_configs_from_dir(dir: &Path) -> HostResult<(Vec<ScheduleConfig>, Vec<LabConfig>)> {
    let mut schedules = Vec::new();
    let mut labs = Vec::new();
    for entry in walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        match path.extension().and_then(|e| e.to_str()) {
            Some("schedule_config") => {
                let raw = std::fs::read_to_string(path)?;
                schedules.push(toml::from_str(&raw)?);
            }
            Some("lab_config") => {
                let raw = std::fs::read_to_string(path)?;
                labs.push(toml::from_str(&raw)?);
            }
            _ => {}
        }
    }
    Ok((schedules, labs))
}

/// Reports the device state of one host to the cloud scheduler.
pub struct DeviceUpdater {
    scheduler: Arc<SchedulerClient>,
    tasks: Arc<TaskClient>,
    scanner: DeviceScanner,
}

impl DeviceUpdater {
    pub fn new(
        scheduler: Arc<SchedulerClient>,
        tasks: Arc<TaskClient>,
        scanner: DeviceScanner,
    ) -> Self {
        Self {
            scheduler,
            tasks,
            scanner,
        }
    }

    /// One device update pass for the given host.
    pub async fn update(&self, server_type: ServerType, host: &Host) -> HostResult<()> {
        match server_type {
            ServerType::Vti => {
                let devices = self.scanner.scan().await?;
                self.scheduler
                    .upload_device_info(host.hostname(), &devices)
                    .await
            }
            ServerType::Tfc => {
                let mut devices = host.list_devices().await?;
                for device in &mut devices {
                    extend_telephony(device);
                }
                let event = HostEvent {
                    cluster: host.primary_cluster().to_string(),
                    hostname: host.hostname().to_string(),
                    devices,
                };
                self.tasks.submit_host_events(&[event]).await
            }
        }
    }
}

/// Snapshot rows carry telephony fields the device listing omits.
fn extend_telephony(device: &mut crate::tfc::DeviceInfo) {
    device.sim_state.get_or_insert_with(|| "unknown".to_string());
    device.sim_operator.get_or_insert_with(|| "unknown".to_string());
    device.mac_address.get_or_insert_with(|| "unknown".to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_info_splits_target_and_type() {
        let info = build_info_for("main", "sailfish-userdebug", "100", "device");
        assert_eq!(info.build_target, "sailfish");
        assert_eq!(info.build_type, "userdebug");
        assert_eq!(info.manifest_branch, "main");
        assert_eq!(info.artifact_type, "device");
    }

    #[test]
    fn test_build_info_without_variant() {
        let info = build_info_for("main", "sailfish", "100", "gsi");
        assert_eq!(info.build_target, "sailfish");
        assert_eq!(info.build_type, "");
    }

    #[test]
    fn test_load_configs_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("west.schedule_config"),
            r#"
manifest_branch = "main"

[[build_target]]
name = "sailfish-userdebug"

[[build_target.test_schedule]]
test_name = "vts/vts-kernel"
period = 24
"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("west.lab_config"),
            r#"
name = "lab-west"
owner = "admin@example.com"

[[host]]
hostname = "lab-host-01"
"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("README"), "ignored").unwrap();

        let (schedules, labs) = load_configs_from_dir(dir.path()).unwrap();
        assert_eq!(schedules.len(), 1);
        assert_eq!(schedules[0].manifest_branch, "main");
        assert_eq!(labs.len(), 1);
        assert_eq!(labs[0].name, "lab-west");
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.schedule_config"), "not [valid").unwrap();
        let err = load_configs_from_dir(dir.path()).unwrap_err();
        assert!(matches!(err, HostError::Serialization(_)));
    }

    #[test]
    fn test_extend_telephony_preserves_existing() {
        let mut device = crate::tfc::DeviceInfo {
            sim_state: Some("ready".to_string()),
            ..Default::default()
        };
        extend_telephony(&mut device);
        assert_eq!(device.sim_state.as_deref(), Some("ready"));
        assert_eq!(device.sim_operator.as_deref(), Some("unknown"));
        assert_eq!(device.mac_address.as_deref(), Some("unknown"));
    }
}
