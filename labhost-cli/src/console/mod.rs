//! The interactive console: collaborator wiring, line dispatch, batch
//! execution, and the readline loop.

pub mod commands;
pub mod output;

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::Arc;
use tracing::debug;

use labhost_core::{
    BuildUpdater, ConfigUpdater, ConsoleState, DeviceScanner, DeviceUpdater, GcsProvider, GsiTool,
    Host, HostConfig, HostError, HostResult, InternalBuildClient, LocalFsProvider,
    PartnerBuildClient, SchedulerClient, SessionRegistry, SingleSession, TaskClient, ToolsConfig,
};

/// Whether the read loop keeps going after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    Continue,
    Exit,
}

/// The host-controller console. One instance per process, shared across the
/// read loop and every spawned batch member and background session.
pub struct Console {
    pub(crate) state: Arc<ConsoleState>,
    pub(crate) build_sessions: SessionRegistry,
    pub(crate) config_sessions: SessionRegistry,
    pub(crate) device_session: SingleSession,

    pub(crate) local_fs: Arc<LocalFsProvider>,
    pub(crate) gcs: Arc<GcsProvider>,
    pub(crate) pab: Arc<PartnerBuildClient>,
    pub(crate) ab: Arc<InternalBuildClient>,

    pub(crate) tasks: Arc<TaskClient>,
    pub(crate) hosts: Arc<Vec<Host>>,

    pub(crate) build_updater: Arc<BuildUpdater>,
    pub(crate) config_updater: Arc<ConfigUpdater>,
    pub(crate) device_updater: Arc<DeviceUpdater>,
    pub(crate) gsi_tool: Arc<GsiTool>,

    pub(crate) tools: ToolsConfig,
    pub(crate) default_account_id: String,
}

impl Console {
    /// Wire up every collaborator from configuration.
    pub fn new(config: HostConfig) -> HostResult<Self> {
        let cache_dir = config.cache_dir()?;
        let tools = config.tools.clone();

        let pab = Arc::new(PartnerBuildClient::new(
            &config.build.partner_url,
            &config.build.account_id,
            &cache_dir,
        ));
        let ab = Arc::new(InternalBuildClient::new(
            &config.build.internal_url,
            &cache_dir,
        ));
        let gcs = Arc::new(GcsProvider::new(&tools.gsutil, &cache_dir));
        let local_fs = Arc::new(LocalFsProvider::new());

        let scheduler = Arc::new(SchedulerClient::new(&config.scheduler.url));
        let tasks = Arc::new(TaskClient::new(&config.tasks.url));
        let hosts: Vec<Host> = config
            .hosts
            .iter()
            .map(|entry| {
                Host::new(
                    &entry.hostname,
                    entry.cluster_ids.clone(),
                    tasks.clone(),
                )
            })
            .collect();

        let scanner = DeviceScanner::new(&tools.adb, &tools.fastboot);
        let build_updater = Arc::new(BuildUpdater::new(pab.clone(), scheduler.clone()));
        let config_updater = Arc::new(ConfigUpdater::new(
            pab.clone(),
            scheduler.clone(),
            &tools.unzip,
        ));
        let device_updater = Arc::new(DeviceUpdater::new(
            scheduler.clone(),
            tasks.clone(),
            scanner,
        ));
        let gsi_tool = Arc::new(GsiTool::new(&tools.spl_tool));

        Ok(Self {
            state: Arc::new(ConsoleState::new()),
            build_sessions: SessionRegistry::new("build update"),
            config_sessions: SessionRegistry::new("config update"),
            device_session: SingleSession::new("device update"),
            local_fs,
            gcs,
            pab,
            ab,
            tasks,
            hosts: Arc::new(hosts),
            build_updater,
            config_updater,
            device_updater,
            gsi_tool,
            tools,
            default_account_id: config.build.account_id.clone(),
        })
    }

    pub fn state(&self) -> &Arc<ConsoleState> {
        &self.state
    }

    /// Execute one command line, printing any failure as a
    /// `<ErrorKind>: <message>` line. Errors never abort the read loop.
    pub async fn execute_line(self: &Arc<Self>, line: &str) -> LoopAction {
        let line = line.trim();
        if line.is_empty() {
            return LoopAction::Continue;
        }
        println!("Command: {}", line);
        match self.dispatch(line).await {
            Ok(action) => action,
            Err(e) => {
                println!("{}: {}", e.kind().red().bold(), e);
                LoopAction::Continue
            }
        }
    }

    /// Execute several command lines concurrently, one task per line, and
    /// wait for all of them. Each failure is printed and returned tagged
    /// with its originating line; no ordering is guaranteed between lines.
    pub async fn execute_batch(self: &Arc<Self>, lines: &[String]) -> Vec<(String, HostResult<()>)> {
        let mut handles = Vec::with_capacity(lines.len());
        for line in lines {
            let console = self.clone();
            let line = line.clone();
            handles.push(tokio::spawn(async move {
                println!("Command: {}", line);
                let result = console.dispatch(&line).await.map(|_| ());
                if let Err(e) = &result {
                    println!("{}: {}", e.kind().red().bold(), e);
                }
                (line, result)
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(tagged) => results.push(tagged),
                Err(e) => results.push((
                    String::new(),
                    Err(HostError::Internal(format!("batch member panicked: {}", e))),
                )),
            }
        }
        results
    }

    /// Route one line to its verb handler, surfacing the handler's result.
    pub async fn dispatch(&self, line: &str) -> HostResult<LoopAction> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((verb, rest)) = tokens.split_first() else {
            return Ok(LoopAction::Continue);
        };
        debug!(verb = *verb, "dispatching command");

        match *verb {
            "request" => commands::request::run(self, commands::parse(verb, rest)?).await?,
            "list" => commands::list::run(self, commands::parse(verb, rest)?).await?,
            "lease" => commands::lease::run(self, commands::parse(verb, rest)?).await?,
            "fetch" => commands::fetch::run(self, commands::parse(verb, rest)?).await?,
            "flash" => commands::flash::run(self, commands::parse(verb, rest)?).await?,
            "build" => commands::build::run(self, commands::parse(verb, rest)?).await?,
            "config" => commands::config::run(self, commands::parse(verb, rest)?).await?,
            "device" => commands::device::run(self, commands::parse(verb, rest)?).await?,
            "gsispl" => commands::gsispl::run(self, commands::parse(verb, rest)?).await?,
            "copy" => commands::copy::run(self, commands::parse(verb, rest)?).await?,
            "test" => commands::test::run(self, commands::parse(verb, rest)?).await?,
            "info" => commands::info::run(self).await?,
            "exit" => return Ok(LoopAction::Exit),
            unknown => {
                println!("Unknown command: {}", unknown);
            }
        }
        Ok(LoopAction::Continue)
    }

    /// The interactive read loop. End-of-input takes the same path as the
    /// `exit` command.
    pub async fn run_interactive(self: &Arc<Self>) -> anyhow::Result<()> {
        let mut editor = DefaultEditor::new()?;
        loop {
            match editor.readline("> ") {
                Ok(line) => {
                    let _ = editor.add_history_entry(&line);
                    if self.execute_line(&line).await == LoopAction::Exit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "Type 'exit' to quit.".yellow());
                }
                Err(ReadlineError::Eof) => break,
                Err(e) => {
                    eprintln!("{}: {}", "read error".red(), e);
                    break;
                }
            }
        }
        Ok(())
    }
}
