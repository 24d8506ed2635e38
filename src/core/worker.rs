//! Consumer workers.
//!
//! Each worker runs `Peek -> Evaluate -> {Claim | Decline}` against the
//! shared head request. A claim hands the request to the [`RequestHandler`]
//! outside the dispatch lock; a decline suspends the worker until the head is
//! consumed by someone else.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error};

use super::error::DispatchError;
use super::request::{Request, WorkerId};
use super::shared_state::{SharedState, Verdict};

/// Work performed on consumed requests.
///
/// Called from dispatch threads without the dispatch lock held.
pub trait RequestHandler: Send + Sync + Clone + 'static {
    /// A worker claimed a request addressed to it.
    fn handle(&self, worker: WorkerId, request: &Request);

    /// The collector discarded a request nobody wanted.
    fn discard(&self, request: &Request) {
        let _ = request;
    }
}

/// Handler that does nothing beyond the dispatch event log.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

impl RequestHandler for NoopHandler {
    fn handle(&self, _worker: WorkerId, _request: &Request) {}
}

/// Run one worker until shutdown.
pub fn worker_loop<H: RequestHandler>(worker_id: WorkerId, shared: &SharedState, handler: &H) {
    debug!(worker_id, "worker thread started");
    loop {
        let step = match shared.evaluate(worker_id) {
            Ok(Verdict::Claimed(request)) => {
                handler.handle(worker_id, &request);
                Ok(())
            }
            // Re-peek after waking; the head may have changed more than once.
            Ok(Verdict::Declined(_)) => shared.suspend(worker_id),
            Err(e) => Err(e),
        };
        match step {
            Ok(()) => {}
            Err(DispatchError::Shutdown) => break,
            Err(e) => {
                error!(worker_id, error = %e, "worker stopped");
                break;
            }
        }
    }
    debug!(worker_id, "worker thread exiting");
}

/// Spawn a worker thread.
///
/// # Errors
///
/// Returns `DispatchError::Spawn` if the OS refuses the thread.
pub fn spawn_worker<H: RequestHandler>(
    worker_id: WorkerId,
    shared: Arc<SharedState>,
    handler: H,
    stack_size: usize,
) -> Result<JoinHandle<()>, DispatchError> {
    thread::Builder::new()
        .name(format!("triage-worker-{worker_id}"))
        .stack_size(stack_size)
        .spawn(move || worker_loop(worker_id, &shared, &handler))
        .map_err(|e| DispatchError::Spawn(e.to_string()))
}
