//! Garbage collector for requests no worker wants.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error};

use super::error::DispatchError;
use super::shared_state::SharedState;
use super::worker::RequestHandler;

/// Run the collector until shutdown.
///
/// Sleeps on the decline signal and only wakes to test the decision vector,
/// so an idle pool costs no CPU.
pub fn collector_loop<H: RequestHandler>(shared: &SharedState, handler: &H) {
    debug!("collector thread started");
    loop {
        match shared.collect() {
            Ok(request) => handler.discard(&request),
            Err(DispatchError::Shutdown) => break,
            Err(e) => {
                error!(error = %e, "collector stopped");
                break;
            }
        }
    }
    debug!("collector thread exiting");
}

/// Spawn the collector thread.
///
/// # Errors
///
/// Returns `DispatchError::Spawn` if the OS refuses the thread.
pub fn spawn_collector<H: RequestHandler>(
    shared: Arc<SharedState>,
    handler: H,
    stack_size: usize,
) -> Result<JoinHandle<()>, DispatchError> {
    thread::Builder::new()
        .name("triage-collector".into())
        .stack_size(stack_size)
        .spawn(move || collector_loop(&shared, &handler))
        .map_err(|e| DispatchError::Spawn(e.to_string()))
}
