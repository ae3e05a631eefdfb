//! Named, cancellable, repeating background update sessions.
//!
//! Build and config updates run under an id-keyed [`SessionRegistry`];
//! device updating uses a [`SingleSession`] slot. Both spawn the generic
//! polling loop in [`poller`] and stop it through a shared [`CancelToken`].

mod poller;
mod registry;
mod single;

pub use poller::run_until_cancelled;
pub use registry::SessionRegistry;
pub use single::SingleSession;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Cooperative cancellation flag handed to the polling loop at spawn time.
///
/// `stop` is fire-and-forget: setting the flag returns immediately and the
/// loop observes it at the top of its next iteration.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Lifecycle of one update session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// The loop is scheduled and no stop has been requested.
    Running,
    /// A stop was requested but the loop has not observed the flag yet.
    Stopping,
    /// The loop observed the flag and exited.
    Stopped,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Running => write!(f, "running"),
            SessionState::Stopping => write!(f, "stopping"),
            SessionState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Handle to one background update session.
///
/// Stays in its registry after the loop exits; stale entries are visible in
/// `list` output as `stopped` and are never pruned.
#[derive(Clone, Debug)]
pub struct Session {
    id: u32,
    label: String,
    cancel: CancelToken,
    state: Arc<Mutex<SessionState>>,
}

impl Session {
    pub(crate) fn new(id: u32, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            cancel: CancelToken::new(),
            state: Arc::new(Mutex::new(SessionState::Running)),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    /// A session blocks id reuse only while no stop has been requested.
    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    /// Request cancellation. Non-blocking; the loop exits eventually,
    /// before its next sleep completes.
    pub fn request_stop(&self) {
        self.cancel.cancel();
        let mut state = self.state.lock().unwrap();
        if *state == SessionState::Running {
            *state = SessionState::Stopping;
        }
    }

    pub(crate) fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub(crate) fn state_cell(&self) -> Arc<Mutex<SessionState>> {
        self.state.clone()
    }
}
