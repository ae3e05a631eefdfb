//! Image flashing through fastboot or a custom flasher binary.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};

use crate::device::DeviceScanner;
use crate::error::{HostError, HostResult};
use crate::fetch::FULL_ZIPFILE;

/// Artifacts flashed by default when no explicit partition pairs are given.
pub const DEFAULT_FLASH_IMAGES: &[&str] = &[
    FULL_ZIPFILE,
    "boot.img",
    "cache.img",
    "system.img",
    "userdata.img",
    "vbmeta.img",
    "vendor.img",
];

/// How long a custom flasher may run before being abandoned.
const CUSTOM_FLASH_TIMEOUT: Duration = Duration::from_secs(300);

/// Polling cadence while waiting for a device to reappear.
const WAIT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Build a partition map from explicit `partition=image` pairs; every image
/// name must resolve through the fetched device-image map.
pub fn partition_map_from_pairs(
    pairs: &[(String, String)],
    images: &HashMap<String, PathBuf>,
) -> HostResult<HashMap<String, PathBuf>> {
    let mut map = HashMap::new();
    for (partition, image) in pairs {
        let path = images.get(image).ok_or_else(|| {
            HostError::NotFound(format!("image {} has not been fetched", image))
        })?;
        map.insert(partition.clone(), path.clone());
    }
    Ok(map)
}

/// Build a partition map from the default artifact list, keeping only
/// entries that were actually fetched. The partition name is the image name
/// minus its `.img` suffix.
pub fn partition_map_from_defaults(
    images: &HashMap<String, PathBuf>,
) -> HashMap<String, PathBuf> {
    DEFAULT_FLASH_IMAGES
        .iter()
        .filter_map(|image| {
            images.get(*image).map(|path| {
                let partition = image.strip_suffix(".img").unwrap_or(image);
                (partition.to_string(), path.clone())
            })
        })
        .collect()
}

/// Flashes one device. An empty serial means the flasher tool's default
/// device.
pub struct BuildFlasher {
    serial: String,
    fastboot: String,
    scanner: DeviceScanner,
}

impl BuildFlasher {
    pub fn new(
        serial: impl Into<String>,
        fastboot: impl Into<String>,
        adb: impl Into<String>,
    ) -> Self {
        let fastboot = fastboot.into();
        Self {
            serial: serial.into(),
            scanner: DeviceScanner::new(adb, fastboot.clone()),
            fastboot,
        }
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    fn fastboot_command(&self) -> Command {
        let mut cmd = Command::new(&self.fastboot);
        if !self.serial.is_empty() {
            cmd.arg("-s").arg(&self.serial);
        }
        cmd
    }

    async fn run(&self, mut cmd: Command) -> HostResult<()> {
        let output = cmd
            .output()
            .await
            .map_err(|e| HostError::tool(&self.fastboot, e.to_string()))?;
        if !output.status.success() {
            return Err(HostError::tool(
                &self.fastboot,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }

    /// Flash each partition in the map, one fastboot invocation per entry,
    /// then reboot.
    pub async fn flash(&self, partitions: &HashMap<String, PathBuf>) -> HostResult<()> {
        for (partition, image) in partitions {
            info!(serial = %self.serial, partition, image = %image.display(), "flashing partition");
            let mut cmd = self.fastboot_command();
            cmd.arg("flash").arg(partition).arg(image);
            self.run(cmd).await?;
        }
        let mut cmd = self.fastboot_command();
        cmd.arg("reboot");
        self.run(cmd).await
    }

    /// Flash a full build directory (`fastboot flashall`).
    pub async fn flashall(&self, build_dir: &Path) -> HostResult<()> {
        info!(serial = %self.serial, build_dir = %build_dir.display(), "flashing full build");
        let mut cmd = self.fastboot_command();
        cmd.env("ANDROID_PRODUCT_OUT", build_dir).arg("flashall");
        self.run(cmd).await
    }

    /// Flash a generic system image, plus a vbmeta image when given.
    pub async fn flash_gsi(&self, gsi: &Path, vbmeta: Option<&Path>) -> HostResult<()> {
        if let Some(vbmeta) = vbmeta {
            let mut cmd = self.fastboot_command();
            cmd.arg("flash").arg("vbmeta").arg(vbmeta);
            self.run(cmd).await?;
        }
        let mut cmd = self.fastboot_command();
        cmd.arg("erase").arg("system");
        self.run(cmd).await?;

        let mut cmd = self.fastboot_command();
        cmd.arg("flash").arg("system").arg(gsi);
        self.run(cmd).await?;

        let mut cmd = self.fastboot_command();
        cmd.arg("reboot");
        self.run(cmd).await
    }

    /// Repackage fetched artifacts into the given format next to the first
    /// image, returning the archive path. Only `tar.md5` is supported.
    pub async fn repackage_artifacts(
        &self,
        images: &HashMap<String, PathBuf>,
        format: &str,
    ) -> HostResult<PathBuf> {
        if format != "tar.md5" {
            return Err(HostError::Argument(format!(
                "unsupported repackage format: {}",
                format
            )));
        }
        let first = images.values().next().ok_or_else(|| {
            HostError::NotFound("no fetched images to repackage".to_string())
        })?;
        let dir = first
            .parent()
            .ok_or_else(|| HostError::Internal("image path has no parent".to_string()))?;
        let archive = dir.join("artifacts.tar.md5");

        let mut cmd = Command::new("tar");
        cmd.arg("-C").arg(dir).arg("-cf").arg(&archive);
        for image in images.values() {
            if let Some(name) = image.file_name() {
                cmd.arg(name);
            }
        }
        let output = cmd
            .output()
            .await
            .map_err(|e| HostError::tool("tar", e.to_string()))?;
        if !output.status.success() {
            return Err(HostError::tool(
                "tar",
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        // tar.md5 carries its own checksum appended to the archive
        let sum = Command::new("md5sum")
            .arg(&archive)
            .output()
            .await
            .map_err(|e| HostError::tool("md5sum", e.to_string()))?;
        if !sum.status.success() {
            return Err(HostError::tool(
                "md5sum",
                String::from_utf8_lossy(&sum.stderr).trim().to_string(),
            ));
        }
        let digest = String::from_utf8_lossy(&sum.stdout).into_owned();
        let mut contents = tokio::fs::read(&archive).await?;
        contents.extend_from_slice(digest.as_bytes());
        tokio::fs::write(&archive, contents).await?;

        info!(archive = %archive.display(), "repackaged artifacts");
        Ok(archive)
    }

    /// Flash through a custom binary instead of fastboot.
    pub async fn flash_custom(
        &self,
        flasher_path: &Path,
        archive: &Path,
        reboot_mode: &str,
        extra_args: Option<&str>,
    ) -> HostResult<()> {
        let mut cmd = Command::new(flasher_path);
        if !self.serial.is_empty() {
            cmd.arg("-s").arg(&self.serial);
        }
        cmd.arg(format!("--reboot={}", reboot_mode));
        if let Some(extra) = extra_args {
            cmd.args(extra.split_whitespace());
        }
        cmd.arg(archive);

        let tool = flasher_path.display().to_string();
        let result = tokio::time::timeout(CUSTOM_FLASH_TIMEOUT, cmd.output()).await;
        let output = match result {
            Ok(output) => output.map_err(|e| HostError::tool(&tool, e.to_string()))?,
            Err(_) => {
                return Err(HostError::tool(
                    &tool,
                    format!("timed out after {:?}", CUSTOM_FLASH_TIMEOUT),
                ))
            }
        };
        if !output.status.success() {
            return Err(HostError::tool(
                &tool,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }

    /// Block until the device reappears over adb, or the timeout elapses.
    pub async fn wait_for_device(&self, timeout: Duration) -> HostResult<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.scanner.scan().await {
                Ok(devices) => {
                    let found = if self.serial.is_empty() {
                        !devices.is_empty()
                    } else {
                        devices.iter().any(|d| d.serial == self.serial)
                    };
                    if found {
                        info!(serial = %self.serial, "device reappeared");
                        return Ok(());
                    }
                }
                Err(e) => warn!("device scan failed while waiting: {}", e),
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(HostError::tool(
                    "adb",
                    format!("device {} did not reappear within {:?}", self.serial, timeout),
                ));
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }
}
