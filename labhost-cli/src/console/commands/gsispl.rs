use clap::Parser;
use std::path::PathBuf;

use labhost_core::{validate_spl_version, HostError, HostResult};

use super::Console;

/// Change the security patch level of a selected GSI file.
#[derive(Parser, Debug)]
#[command(name = "gsispl", disable_help_flag = true)]
pub struct GsiSplArgs {
    /// Path to the GSI image. Without it, the most recently fetched
    /// system.img is used and the fetched entry is updated afterwards.
    #[arg(long)]
    pub gsi: Option<PathBuf>,

    /// New version, YYYY-MM-DD.
    #[arg(long, required = true)]
    pub version: String,
}

pub async fn run(console: &Console, args: GsiSplArgs) -> HostResult<()> {
    // reject a malformed version before looking at any state
    validate_spl_version(&args.version)?;

    let (gsi_path, from_fetch) = match &args.gsi {
        Some(path) => {
            if !path.is_file() {
                return Err(HostError::NotFound(format!(
                    "cannot find system image at {}",
                    path.display()
                )));
            }
            (path.clone(), false)
        }
        None => {
            let path = console.state.device_image("system.img").ok_or_else(|| {
                HostError::NotFound("cannot find a fetched system image".to_string())
            })?;
            (path, true)
        }
    };

    let output = console.gsi_tool.respin(&gsi_path, &args.version).await?;
    println!("respun image: {}", output.display());

    if from_fetch {
        console.state.set_device_image("system.img", &output);
    }
    Ok(())
}
