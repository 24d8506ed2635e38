//! Tests for configuration validation

use std::time::Duration;

use triage_dispatch::config::DispatchConfig;

#[test]
fn test_default_config_is_valid() {
    let cfg = DispatchConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.worker_count, 5);
    assert_eq!(cfg.garbage_spread, 5);
    assert_eq!(cfg.effective_capacity(), 5);
    assert_eq!(cfg.target_range(), Some(10));
}

#[test]
fn test_config_invalid_worker_count() {
    let invalid = DispatchConfig::new().with_worker_count(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_config_invalid_garbage_spread() {
    let invalid = DispatchConfig::new().with_garbage_spread(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_config_target_range_overflow() {
    let invalid = DispatchConfig::new().with_garbage_spread(usize::MAX);
    assert_eq!(invalid.target_range(), None);
    let err = invalid.validate().unwrap_err();
    assert!(err.contains("overflows"));
}

#[test]
fn test_config_invalid_capacity() {
    let invalid = DispatchConfig::new().with_channel_capacity(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_config_invalid_stack_size() {
    let invalid = DispatchConfig::new().with_thread_stack_size(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_config_durations() {
    let cfg = DispatchConfig::new()
        .with_backpressure_warn_ms(250)
        .with_dispatch_interval_ms(5);
    assert_eq!(cfg.backpressure_warn(), Duration::from_millis(250));
    assert_eq!(cfg.dispatch_interval(), Duration::from_millis(5));
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "worker_count": 3,
        "garbage_spread": 2,
        "channel_capacity": 8,
        "max_requests": 100
    }"#;

    let cfg = DispatchConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.worker_count, 3);
    assert_eq!(cfg.effective_capacity(), 8);
    assert_eq!(cfg.max_requests, Some(100));
    assert_eq!(cfg.backpressure_warn_ms, 1000);
}

#[test]
fn test_config_from_json_rejects_invalid() {
    assert!(DispatchConfig::from_json_str(r#"{ "worker_count": 0 }"#).is_err());
    assert!(DispatchConfig::from_json_str("not json").is_err());
}

#[test]
fn test_config_from_vars() {
    let cfg = DispatchConfig::from_vars([
        ("TRIAGE_WORKER_COUNT", "4"),
        ("TRIAGE_GARBAGE_SPREAD", "6"),
        ("TRIAGE_CHANNEL_CAPACITY", "2"),
        ("TRIAGE_DISPATCH_INTERVAL_MS", "10"),
        ("TRIAGE_SEED", "99"),
        ("HOME", "/root"),
    ])
    .unwrap();

    assert_eq!(cfg.worker_count, 4);
    assert_eq!(cfg.garbage_spread, 6);
    assert_eq!(cfg.channel_capacity, Some(2));
    assert_eq!(cfg.dispatch_interval_ms, 10);
    assert_eq!(cfg.seed, Some(99));
    assert_eq!(cfg.max_requests, None);
}

#[test]
fn test_config_from_vars_validates() {
    assert!(DispatchConfig::from_vars([("TRIAGE_WORKER_COUNT", "0")]).is_err());
    assert!(DispatchConfig::from_vars([("TRIAGE_WORKER_COUNT", "-1")]).is_err());
}
