use clap::Parser;

use labhost_core::HostResult;

use super::{selected_hosts, Console};
use crate::console::output::{device_table, host_table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ListType {
    Hosts,
    Devices,
}

/// Show information about the hosts.
#[derive(Parser, Debug)]
#[command(name = "list", disable_help_flag = true)]
pub struct ListArgs {
    /// The type of the shown objects.
    #[arg(value_enum)]
    pub what: ListType,

    /// The index of the host.
    #[arg(long)]
    pub host: Option<usize>,
}

pub async fn run(console: &Console, args: ListArgs) -> HostResult<()> {
    match args.what {
        ListType::Hosts => {
            println!("{}", host_table(&console.hosts));
        }
        ListType::Devices => {
            for (index, host) in selected_hosts(console, args.host)? {
                let devices = host.list_devices().await?;
                println!("[{:3}]  {}", index, host.hostname());
                println!("{}", device_table(&devices));
            }
        }
    }
    Ok(())
}
