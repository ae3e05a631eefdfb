//! One module per console verb; each pairs a clap parser with an async
//! handler.

pub mod build;
pub mod config;
pub mod copy;
pub mod device;
pub mod fetch;
pub mod flash;
pub mod gsispl;
pub mod info;
pub mod lease;
pub mod list;
pub mod request;

use clap::Parser;

use labhost_core::{Host, HostError, HostResult};

use super::Console;

/// Parse one verb's arguments, mapping clap failures into reported
/// argument errors so a malformed line never aborts the read loop.
pub fn parse<T: Parser>(verb: &str, args: &[&str]) -> HostResult<T> {
    T::try_parse_from(std::iter::once(verb).chain(args.iter().copied()))
        .map_err(|e| HostError::Argument(e.to_string()))
}

/// Update sub-verbs shared by the session commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum UpdateAction {
    Single,
    Start,
    Stop,
    List,
}

/// Resolve a `--host` index. With no index given, exactly one configured
/// host is required.
pub fn resolve_host_index(console: &Console, index: Option<usize>) -> HostResult<usize> {
    match index {
        Some(index) => {
            if console.hosts.get(index).is_none() {
                return Err(HostError::NotFound(format!("no host with index {}", index)));
            }
            Ok(index)
        }
        None => {
            if console.hosts.len() > 1 {
                return Err(HostError::Argument(
                    "more than one host; specify --host".to_string(),
                ));
            }
            if console.hosts.is_empty() {
                return Err(HostError::NotFound("no hosts configured".to_string()));
            }
            Ok(0)
        }
    }
}

pub fn resolve_host<'a>(console: &'a Console, index: Option<usize>) -> HostResult<&'a Host> {
    let index = resolve_host_index(console, index)?;
    Ok(&console.hosts[index])
}

/// Host index paired with the host, honoring an optional `--host` filter.
pub fn selected_hosts<'a>(
    console: &'a Console,
    index: Option<usize>,
) -> HostResult<Vec<(usize, &'a Host)>> {
    match index {
        Some(index) => {
            let host = console.hosts.get(index).ok_or_else(|| {
                HostError::NotFound(format!("no host with index {}", index))
            })?;
            Ok(vec![(index, host)])
        }
        None => Ok(console.hosts.iter().enumerate().collect()),
    }
}
