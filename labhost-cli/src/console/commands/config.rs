use clap::Parser;
use std::time::Duration;

use labhost_core::{HostError, HostResult};

use super::fetch::MethodArg;
use super::{Console, UpdateAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ConfigType {
    Prod,
    Test,
}

impl ConfigType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigType::Prod => "prod",
            ConfigType::Test => "test",
        }
    }
}

/// Specify a global config type to monitor.
#[derive(Parser, Debug)]
#[command(name = "config", disable_help_flag = true)]
pub struct ConfigArgs {
    /// Update config info.
    #[arg(long, value_enum, default_value_t = UpdateAction::Start)]
    pub update: UpdateAction,

    /// Session id; required for the stop sub-verb.
    #[arg(long)]
    pub id: Option<u32>,

    /// Interval (seconds) to repeat the config update.
    #[arg(long, default_value_t = 60)]
    pub interval: i64,

    /// Which config flavor to pull.
    #[arg(long = "config-type", value_enum, default_value_t = ConfigType::Prod)]
    pub config_type: ConfigType,

    /// Branch to grab the config bundle from.
    #[arg(long, required = true)]
    pub branch: String,

    /// A comma-separated list of build target product(s).
    #[arg(long, required = true)]
    pub target: String,

    /// Partner build account to use.
    #[arg(long = "account_id")]
    pub account_id: Option<String>,

    /// Method for fetching.
    #[arg(long, value_enum, default_value_t = MethodArg::Get)]
    pub method: MethodArg,
}

pub async fn run(console: &Console, args: ConfigArgs) -> HostResult<()> {
    let account_id = args
        .account_id
        .clone()
        .unwrap_or_else(|| console.default_account_id.clone());

    match args.update {
        UpdateAction::Single => {
            console
                .config_updater
                .update(
                    &account_id,
                    &args.branch,
                    &args.target,
                    args.config_type.as_str(),
                    args.method.into(),
                )
                .await
        }
        UpdateAction::List => {
            println!("Running config update sessions:");
            for (id, state) in console.config_sessions.list() {
                println!("  ID {} ({})", id, state);
            }
            Ok(())
        }
        UpdateAction::Start => {
            if args.interval <= 0 {
                return Err(HostError::Argument(
                    "update interval must be positive".to_string(),
                ));
            }
            let interval = Duration::from_secs(args.interval as u64);
            let label = format!(
                "branch={} target={} type={}",
                args.branch,
                args.target,
                args.config_type.as_str()
            );

            let updater = console.config_updater.clone();
            let branch = args.branch.clone();
            let target = args.target.clone();
            let config_type = args.config_type;
            let method = args.method;
            let id = console.config_sessions.start(args.id, label, interval, move || {
                let updater = updater.clone();
                let account_id = account_id.clone();
                let branch = branch.clone();
                let target = target.clone();
                async move {
                    updater
                        .update(
                            &account_id,
                            &branch,
                            &target,
                            config_type.as_str(),
                            method.into(),
                        )
                        .await
                }
            })?;
            println!("config update session started (ID {})", id);
            Ok(())
        }
        UpdateAction::Stop => {
            let id = args.id.ok_or_else(|| {
                HostError::Argument("--id must be set for stop".to_string())
            })?;
            console.config_sessions.stop(id)
        }
    }
}
