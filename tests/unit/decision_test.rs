//! Tests for the decision vector

use triage_dispatch::core::DecisionVector;

#[test]
fn test_all_declined_needs_every_worker() {
    let mut v = DecisionVector::new(5);
    for worker in [4, 0, 3, 1] {
        v.decline(worker);
        assert!(!v.all_declined());
    }
    v.decline(2);
    assert!(v.all_declined());
    assert_eq!(v.declined_count(), 5);
}

#[test]
fn test_reset_allows_fresh_declines() {
    let mut v = DecisionVector::new(2);
    v.decline(0);
    v.reset();
    v.decline(0);
    assert!(v.is_declined(0));
    assert_eq!(v.len(), 2);
}

#[test]
fn test_is_declined_out_of_range_is_false() {
    let v = DecisionVector::new(2);
    assert!(!v.is_declined(10));
}
