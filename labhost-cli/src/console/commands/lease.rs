use clap::Parser;

use labhost_core::HostResult;

use super::{resolve_host, Console};
use crate::console::output::task_table;

/// Make a host lease command tasks from the task server.
#[derive(Parser, Debug)]
#[command(name = "lease", disable_help_flag = true)]
pub struct LeaseArgs {
    /// The index of the host.
    #[arg(long)]
    pub host: Option<usize>,
}

pub async fn run(console: &Console, args: LeaseArgs) -> HostResult<()> {
    let host = resolve_host(console, args.host)?;
    let tasks = host.lease_command_tasks().await?;
    println!("{}", task_table(&tasks));
    Ok(())
}
