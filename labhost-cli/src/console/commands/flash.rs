use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;

use labhost_core::{
    partition_map_from_defaults, partition_map_from_pairs, BuildFlasher, HostError, HostResult,
};

use super::Console;

/// How long to wait for each flashed device to reappear.
const DEVICE_WAIT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FlasherType {
    Fastboot,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RebootMode {
    Bootloader,
    Download,
}

impl RebootMode {
    fn as_str(&self) -> &'static str {
        match self {
            RebootMode::Bootloader => "bootloader",
            RebootMode::Download => "download",
        }
    }
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(partition, image)| (partition.to_string(), image.to_string()))
        .ok_or_else(|| format!("expected <partition>=<image>, got {}", raw))
}

/// Flash images to one or more devices.
#[derive(Parser, Debug)]
#[command(name = "flash", disable_help_flag = true)]
pub struct FlashArgs {
    /// The partitions and images to be flashed, as `<partition>=<image>`
    /// pairs. Without pairs, the default artifact list intersected with the
    /// fetched images is used.
    #[arg(long, value_parser = parse_pair, num_args = 0.., value_name = "PARTITION_IMAGE")]
    pub current: Option<Vec<(String, String)>>,

    /// Serial number for the device.
    #[arg(long, default_value = "")]
    pub serial: String,

    /// Directory containing build images to be flashed.
    #[arg(long = "build_dir")]
    pub build_dir: Option<PathBuf>,

    /// Path to a generic system image.
    #[arg(long)]
    pub gsi: Option<PathBuf>,

    /// Path to a vbmeta image.
    #[arg(long)]
    pub vbmeta: Option<PathBuf>,

    /// Flasher binary type.
    #[arg(long = "flasher_type", value_enum, default_value_t = FlasherType::Fastboot)]
    pub flasher_type: FlasherType,

    /// Path to the flasher binary; fetched tool names resolve through the
    /// tools map.
    #[arg(long = "flasher_path")]
    pub flasher_path: Option<String>,

    /// Reboot the device to bootloader/download mode.
    #[arg(long = "reboot_mode", value_enum, default_value_t = RebootMode::Bootloader)]
    pub reboot_mode: RebootMode,

    /// Extra arguments passed to the custom binary.
    #[arg(long = "arg_flasher")]
    pub arg_flasher: Option<String>,

    /// Repackage artifacts into the given format before flashing.
    #[arg(long, default_value = "tar.md5", value_parser = ["tar.md5"])]
    pub repackage: String,
}

pub async fn run(console: &Console, args: FlashArgs) -> HostResult<()> {
    // explicit serial, else the previously selected list, else the flasher
    // tool's default device
    let serials: Vec<String> = if !args.serial.is_empty() {
        vec![args.serial.clone()]
    } else {
        let selected = console.state.serials();
        if selected.is_empty() {
            vec![String::new()]
        } else {
            selected
        }
    };

    let images = console.state.device_images();
    let partitions = match &args.current {
        Some(pairs) if !pairs.is_empty() => partition_map_from_pairs(pairs, &images)?,
        _ => partition_map_from_defaults(&images),
    };

    let flashers: Vec<BuildFlasher> = serials
        .iter()
        .map(|serial| BuildFlasher::new(serial, &console.tools.fastboot, &console.tools.adb))
        .collect();

    // each target is attempted independently; a failure on one device does
    // not abort the rest
    let mut flashed = Vec::new();
    let mut first_err = None;
    for flasher in &flashers {
        let result = flash_one(console, &args, flasher, &partitions).await;
        match result {
            Ok(()) => flashed.push(flasher),
            Err(e) => {
                let target = if flasher.serial().is_empty() {
                    "<default device>"
                } else {
                    flasher.serial()
                };
                println!("{}: flashing {} failed: {}", e.kind().red().bold(), target, e);
                first_err.get_or_insert(e);
            }
        }
    }

    for flasher in flashed {
        flasher.wait_for_device(DEVICE_WAIT_TIMEOUT).await?;
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

async fn flash_one(
    console: &Console,
    args: &FlashArgs,
    flasher: &BuildFlasher,
    partitions: &std::collections::HashMap<String, PathBuf>,
) -> HostResult<()> {
    match args.flasher_type {
        FlasherType::Fastboot => {
            if let Some(build_dir) = &args.build_dir {
                flasher.flashall(build_dir).await?;
            }
            if let Some(gsi) = &args.gsi {
                flasher.flash_gsi(gsi, args.vbmeta.as_deref()).await?;
            }
            if args.build_dir.is_none() && args.gsi.is_none() {
                if partitions.is_empty() {
                    return Err(HostError::NotFound(
                        "nothing to flash: no images fetched and no --current pairs".to_string(),
                    ));
                }
                flasher.flash(partitions).await?;
            }
            Ok(())
        }
        FlasherType::Custom => {
            let flasher_path = args.flasher_path.as_deref().ok_or_else(|| {
                HostError::Argument(
                    "please specify the path to the custom flash tool".to_string(),
                )
            })?;
            // fetched tool names take precedence over literal paths
            let tool_path = console
                .state
                .tool(flasher_path)
                .unwrap_or_else(|| PathBuf::from(flasher_path));

            let images = console.state.device_images();
            let archive = flasher.repackage_artifacts(&images, &args.repackage).await?;
            flasher
                .flash_custom(
                    &tool_path,
                    &archive,
                    args.reboot_mode.as_str(),
                    args.arg_flasher.as_deref(),
                )
                .await
        }
    }
}
