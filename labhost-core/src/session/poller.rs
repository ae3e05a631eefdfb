use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::HostResult;

use super::{CancelToken, SessionState};

/// Repeat a unit of work until the cancel flag is set.
///
/// A failed iteration is logged and never terminates the loop; only
/// cancellation does. Iterations within one loop are strictly sequential.
pub async fn run_until_cancelled<W, Fut>(mut work: W, interval: Duration, cancel: CancelToken)
where
    W: FnMut() -> Fut + Send,
    Fut: Future<Output = HostResult<()>> + Send,
{
    while !cancel.is_cancelled() {
        if let Err(e) = work().await {
            warn!(kind = e.kind(), "update iteration failed: {}", e);
        }
        tokio::time::sleep(interval).await;
    }
    debug!("polling loop observed cancellation, exiting");
}

/// Spawn the loop on its own task and flip the session handle to `Stopped`
/// once it exits.
pub(crate) fn spawn<W, Fut>(
    work: W,
    interval: Duration,
    cancel: CancelToken,
    state: Arc<Mutex<SessionState>>,
) -> JoinHandle<()>
where
    W: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = HostResult<()>> + Send + 'static,
{
    tokio::spawn(async move {
        run_until_cancelled(work, interval, cancel).await;
        *state.lock().unwrap() = SessionState::Stopped;
    })
}
