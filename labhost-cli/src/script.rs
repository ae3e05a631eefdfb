//! Scripted command source: replay a TOML command list through the
//! dispatcher.
//!
//! A script is a `.toml` file with a `commands` array. Each element is
//! either one command line (run in order) or an array of lines (run as one
//! concurrent batch):
//!
//! ```toml
//! commands = [
//!     "fetch --type=local_fs --path=/srv/builds/100",
//!     ["device --set_serial=SER1", "info"],
//!     "flash --serial=SER1",
//! ]
//! ```

use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use labhost_core::{HostError, HostResult};

use crate::console::Console;

/// Environment variable that supplies a default device serial for scripted
/// runs.
pub const SERIAL_ENV: &str = "ANDROID_SERIAL";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ScriptEntry {
    /// One command line, executed in order.
    Line(String),
    /// Several lines executed as one concurrent batch.
    Batch(Vec<String>),
}

#[derive(Debug, Default, Deserialize)]
struct CommandScript {
    #[serde(default)]
    commands: Vec<ScriptEntry>,
}

/// Load the command list from a script file. Anything but a `.toml` path is
/// a usage error.
pub fn load_script(path: &Path) -> HostResult<Vec<ScriptEntry>> {
    if path.extension().and_then(|e| e.to_str()) != Some("toml") {
        return Err(HostError::Argument(format!(
            "script file is not a .toml file: {}",
            path.display()
        )));
    }
    let raw = std::fs::read_to_string(path)?;
    let script: CommandScript = toml::from_str(&raw)?;
    Ok(script.commands)
}

/// Replay a script through the console. When the environment supplies a
/// default serial, a `device --set_serial` line runs first. An empty
/// command list means there is nothing further to do.
pub async fn run_script(console: &Arc<Console>, path: &Path) -> HostResult<()> {
    let entries = load_script(path)?;

    if let Ok(serial) = std::env::var(SERIAL_ENV) {
        if !serial.is_empty() {
            console
                .execute_line(&format!("device --set_serial={}", serial))
                .await;
        }
    }

    info!(script = %path.display(), commands = entries.len(), "replaying command script");
    for entry in entries {
        match entry {
            ScriptEntry::Line(line) => {
                console.execute_line(&line).await;
            }
            ScriptEntry::Batch(lines) => {
                console.execute_batch(&lines).await;
            }
        }
    }
    Ok(())
}
