use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;

use crate::error::{HostError, HostResult};

use super::{poller, Session, SessionState};

/// A single update slot, for kinds that allow at most one concurrent
/// session (device-state updating). Not id-keyed on purpose; the build and
/// config registries are, and the asymmetry is part of the contract.
#[derive(Debug)]
pub struct SingleSession {
    kind: &'static str,
    slot: Mutex<Option<Session>>,
}

impl SingleSession {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            slot: Mutex::new(None),
        }
    }

    /// Spawn the session unless one is already running.
    pub fn start<W, Fut>(
        &self,
        label: impl Into<String>,
        interval: Duration,
        work: W,
    ) -> HostResult<()>
    where
        W: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = HostResult<()>> + Send + 'static,
    {
        if interval.is_zero() {
            return Err(HostError::Argument(
                "update interval must be positive".to_string(),
            ));
        }

        let mut slot = self.slot.lock().unwrap();
        if slot.as_ref().is_some_and(|s| s.is_running()) {
            return Err(HostError::AlreadyRunning(format!(
                "{} already running; run --update=stop first",
                self.kind
            )));
        }

        let session = Session::new(1, label);
        poller::spawn(
            work,
            interval,
            session.cancel_token(),
            session.state_cell(),
        );
        info!(kind = self.kind, interval_secs = interval.as_secs(), "session started");
        *slot = Some(session);
        Ok(())
    }

    pub fn stop(&self) -> HostResult<()> {
        let slot = self.slot.lock().unwrap();
        let session = slot
            .as_ref()
            .ok_or_else(|| HostError::NotFound(format!("no {} session to stop", self.kind)))?;
        session.request_stop();
        info!(kind = self.kind, "session stop requested");
        Ok(())
    }

    pub fn state(&self) -> Option<SessionState> {
        self.slot.lock().unwrap().as_ref().map(|s| s.state())
    }
}
