use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;

use crate::error::{HostError, HostResult};

use super::{poller, Session, SessionState};

/// Id-keyed registry of update sessions of one kind (build or config).
///
/// Stopped sessions stay registered; ids are only reused when the caller
/// asks for one explicitly.
#[derive(Debug)]
pub struct SessionRegistry {
    kind: &'static str,
    sessions: Mutex<BTreeMap<u32, Session>>,
}

impl SessionRegistry {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            sessions: Mutex::new(BTreeMap::new()),
        }
    }

    /// Register a session and spawn its polling loop.
    ///
    /// With no explicit id, assigns `1` on an empty table and
    /// `max(existing ids) + 1` otherwise. An explicit id that maps to a
    /// still-running session is rejected; one that maps to a stopped
    /// session is reused since the caller asked for it.
    pub fn start<W, Fut>(
        &self,
        id: Option<u32>,
        label: impl Into<String>,
        interval: Duration,
        work: W,
    ) -> HostResult<u32>
    where
        W: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = HostResult<()>> + Send + 'static,
    {
        if interval.is_zero() {
            return Err(HostError::Argument(
                "update interval must be positive".to_string(),
            ));
        }

        let mut sessions = self.sessions.lock().unwrap();
        let id = match id {
            Some(id) => {
                if sessions.get(&id).is_some_and(|s| s.is_running()) {
                    return Err(HostError::AlreadyRunning(format!(
                        "{} session {} already running; run --update=stop --id={} first",
                        self.kind, id, id
                    )));
                }
                id
            }
            None => match sessions.keys().next_back() {
                Some(max) => max + 1,
                None => 1,
            },
        };

        let session = Session::new(id, label);
        poller::spawn(
            work,
            interval,
            session.cancel_token(),
            session.state_cell(),
        );
        info!(kind = self.kind, id, interval_secs = interval.as_secs(), "session started");
        sessions.insert(id, session);
        Ok(id)
    }

    /// Flag a session for cancellation. Fire-and-forget.
    pub fn stop(&self, id: u32) -> HostResult<()> {
        let sessions = self.sessions.lock().unwrap();
        let session = sessions.get(&id).ok_or_else(|| {
            HostError::NotFound(format!("no {} session with id {}", self.kind, id))
        })?;
        session.request_stop();
        info!(kind = self.kind, id, "session stop requested");
        Ok(())
    }

    /// Ids and states in id order.
    pub fn list(&self) -> Vec<(u32, SessionState)> {
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .map(|(id, s)| (*id, s.state()))
            .collect()
    }
}
