use clap::Parser;
use std::time::Duration;

use labhost_core::{HostError, HostResult, ServerType};

use super::{resolve_host_index, Console};

/// Device update sub-verbs. Device updating runs at most one concurrent
/// session, so there is no id-keyed list variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DeviceUpdateAction {
    Single,
    Start,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ServerTypeArg {
    Vti,
    Tfc,
}

impl From<ServerTypeArg> for ServerType {
    fn from(arg: ServerTypeArg) -> Self {
        match arg {
            ServerTypeArg::Vti => ServerType::Vti,
            ServerTypeArg::Tfc => ServerType::Tfc,
        }
    }
}

/// Select device(s) under test and keep the cloud scheduler's device state
/// fresh.
#[derive(Parser, Debug)]
#[command(name = "device", disable_help_flag = true)]
pub struct DeviceArgs {
    /// Serial number(s) for the device, comma-separated.
    #[arg(long = "set_serial", default_value = "")]
    pub set_serial: String,

    /// Update device info on the cloud scheduler.
    #[arg(long, value_enum)]
    pub update: Option<DeviceUpdateAction>,

    /// Interval (seconds) to repeat the device update.
    #[arg(long, default_value_t = 30)]
    pub interval: i64,

    /// The index of the host.
    #[arg(long)]
    pub host: Option<usize>,

    /// The type of cloud-based test scheduler server.
    #[arg(long = "server_type", value_enum, default_value_t = ServerTypeArg::Vti)]
    pub server_type: ServerTypeArg,
}

pub async fn run(console: &Console, args: DeviceArgs) -> HostResult<()> {
    if !args.set_serial.is_empty() {
        let serials: Vec<String> = args
            .set_serial
            .split(',')
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
        println!("serials: {}", serials.join(","));
        console.state.set_serials(serials);
    }

    let Some(update) = args.update else {
        return Ok(());
    };

    // resolve now so a bad index is reported before a session spawns
    let host_index = resolve_host_index(console, args.host)?;
    let server_type: ServerType = args.server_type.into();

    match update {
        DeviceUpdateAction::Single => {
            let host = &console.hosts[host_index];
            console.device_updater.update(server_type, host).await
        }
        DeviceUpdateAction::Start => {
            if args.interval <= 0 {
                return Err(HostError::Argument(
                    "update interval must be positive".to_string(),
                ));
            }
            let interval = Duration::from_secs(args.interval as u64);
            let label = format!("server_type={}", server_type.as_str());

            let updater = console.device_updater.clone();
            let hosts = console.hosts.clone();
            console.device_session.start(label, interval, move || {
                let updater = updater.clone();
                let hosts = hosts.clone();
                async move { updater.update(server_type, &hosts[host_index]).await }
            })?;
            println!("device update session started");
            Ok(())
        }
        DeviceUpdateAction::Stop => console.device_session.stop(),
    }
}
