//! Attached-device scanning through the adb and fastboot tools.

use serde::{Serialize, Serializer};
use tokio::process::Command;
use tracing::debug;

use crate::error::{HostError, HostResult};

/// Device states as reported to the scheduler, wire-encoded as numeric
/// codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Unknown,
    Fastboot,
    Online,
    Ready,
    InUse,
    Error,
}

impl DeviceStatus {
    pub fn code(&self) -> u8 {
        match self {
            DeviceStatus::Unknown => 0,
            DeviceStatus::Fastboot => 1,
            DeviceStatus::Online => 2,
            DeviceStatus::Ready => 3,
            DeviceStatus::InUse => 4,
            DeviceStatus::Error => 5,
        }
    }
}

impl Serialize for DeviceStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

/// One device attached to this host.
#[derive(Debug, Clone, Serialize)]
pub struct AttachedDevice {
    pub serial: String,
    pub product: String,
    pub status: DeviceStatus,
}

/// Shells out to adb and fastboot to enumerate attached devices.
#[derive(Debug, Clone)]
pub struct DeviceScanner {
    adb: String,
    fastboot: String,
}

impl DeviceScanner {
    pub fn new(adb: impl Into<String>, fastboot: impl Into<String>) -> Self {
        Self {
            adb: adb.into(),
            fastboot: fastboot.into(),
        }
    }

    /// List devices visible over adb plus those sitting in fastboot mode.
    pub async fn scan(&self) -> HostResult<Vec<AttachedDevice>> {
        let mut devices = Vec::new();

        let adb_out = self.run(&self.adb, &["devices"]).await?;
        for serial in parse_device_listing(&adb_out, true) {
            let product = match self
                .run(&self.adb, &["-s", &serial, "shell", "getprop", "ro.product.board"])
                .await
            {
                Ok(out) => out.trim().to_string(),
                Err(_) => "error".to_string(),
            };
            devices.push(AttachedDevice {
                serial,
                product,
                status: DeviceStatus::Online,
            });
        }

        let fastboot_out = self.run(&self.fastboot, &["devices"]).await?;
        for serial in parse_device_listing(&fastboot_out, false) {
            devices.push(AttachedDevice {
                serial,
                product: "unknown".to_string(),
                status: DeviceStatus::Fastboot,
            });
        }

        debug!(count = devices.len(), "scanned attached devices");
        Ok(devices)
    }

    async fn run(&self, tool: &str, args: &[&str]) -> HostResult<String> {
        let output = Command::new(tool)
            .args(args)
            .output()
            .await
            .map_err(|e| HostError::tool(tool, e.to_string()))?;
        if !output.status.success() {
            return Err(HostError::tool(
                tool,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Pull serial numbers out of an `adb devices` / `fastboot devices`
/// listing. adb prefixes its listing with a header line.
fn parse_device_listing(stdout: &str, skip_header: bool) -> Vec<String> {
    stdout
        .lines()
        .skip(if skip_header { 1 } else { 0 })
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| line.split_whitespace().next())
        .map(|serial| serial.to_string())
        .collect()
}
