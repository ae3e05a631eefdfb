#![allow(
    dead_code,
    unused_imports,
    unused_variables,
    unused_mut,
    clippy::too_many_arguments,
    clippy::needless_borrows_for_generic_args,
    clippy::useless_format,
    clippy::len_zero,
    clippy::map_entry
)]

use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use labhost_cli::console::Console;
use labhost_cli::script;
use labhost_core::HostConfig;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "labhost")]
#[command(version = VERSION)]
#[command(about = "Interactive host-controller console for test-lab infrastructure")]
#[command(long_about = r#"
labhost is the interactive console for one lab machine: it fetches build
artifacts, flashes them to attached devices, leases test-execution tasks
from the scheduling backend, and keeps build/config/device state reported
through named background update sessions.

Start it with no arguments for the interactive prompt, or pass --script to
replay a TOML command list.
"#)]
struct Cli {
    /// Configuration file (defaults to labhost.toml when present).
    #[arg(long)]
    config: Option<String>,

    /// Scheduler endpoint URL override.
    #[arg(long)]
    endpoint: Option<String>,

    /// Task-server endpoint URL override.
    #[arg(long)]
    task_endpoint: Option<String>,

    /// Replay a command script instead of reading from the prompt.
    #[arg(long)]
    script: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run(cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut config = HostConfig::load(cli.config.as_deref())?;
    if let Some(endpoint) = cli.endpoint {
        config.scheduler.url = endpoint;
    }
    if let Some(endpoint) = cli.task_endpoint {
        config.tasks.url = endpoint;
    }

    let console = Arc::new(Console::new(config)?);

    match cli.script {
        Some(path) => script::run_script(&console, &path).await?,
        None => console.run_interactive().await?,
    }
    Ok(())
}
