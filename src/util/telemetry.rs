//! Telemetry helpers for structured logging.

use tracing_subscriber::EnvFilter;

/// Install an env-filtered fmt subscriber if none is set.
///
/// `RUST_LOG` wins when present; otherwise `default_directive` (for example
/// `"info"` or `"triage_dispatch=debug"`) is used.
pub fn init_tracing(default_directive: &str) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init();
}
