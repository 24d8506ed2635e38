//! Tests for error types

use std::time::Duration;

use triage_dispatch::core::DispatchError;

#[test]
fn test_channel_full_error() {
    let err = DispatchError::ChannelFull;
    assert_eq!(format!("{}", err), "channel full");
}

#[test]
fn test_enqueue_timeout_error() {
    let err = DispatchError::EnqueueTimeout(Duration::from_millis(250));
    assert_eq!(format!("{}", err), "enqueue timed out after 250ms");
}

#[test]
fn test_shutdown_error() {
    let err = DispatchError::Shutdown;
    assert_eq!(format!("{}", err), "dispatcher shut down");
}

#[test]
fn test_unknown_worker_error() {
    let err = DispatchError::UnknownWorker(12);
    assert_eq!(format!("{}", err), "unknown worker 12");
}

#[test]
fn test_invalid_config_error() {
    let err = DispatchError::InvalidConfig("worker_count must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid configuration: worker_count must be greater than 0"
    );
}
