//! Scenario tests for the dispatch-and-triage protocol.
//!
//! These tests drive a running dispatcher through known request sequences and
//! check the event log for:
//! 1. Undeliverable requests declined by every worker, then collected
//! 2. Deliverable requests claimed by their worker, never collected
//! 3. No declines recorded against a request after it was consumed
//! 4. Independent repetitions with no cross-request interference

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use triage_dispatch::builders::DispatcherBuilder;
use triage_dispatch::config::DispatchConfig;
use triage_dispatch::core::{
    DispatchEvent, Dispatcher, EventRecord, InMemoryEventSink, RequestId, SharedSink,
};

const WAIT: Duration = Duration::from_secs(10);

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn start_manual(workers: usize, garbage: usize) -> (Dispatcher, Arc<Mutex<InMemoryEventSink>>) {
    let log = Arc::new(Mutex::new(InMemoryEventSink::new(100_000)));
    let dispatcher = DispatcherBuilder::new(
        DispatchConfig::new()
            .with_worker_count(workers)
            .with_garbage_spread(garbage),
    )
    .with_sink(SharedSink(Arc::clone(&log)))
    .without_producer()
    .start()
    .unwrap();
    (dispatcher, log)
}

fn events_for(records: &[EventRecord], request: RequestId) -> Vec<&EventRecord> {
    records
        .iter()
        .filter(|r| r.event.request_id() == Some(request))
        .collect()
}

fn decliners(events: &[&EventRecord]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|r| match r.event {
            DispatchEvent::Declined { worker_id, .. } => Some(worker_id),
            _ => None,
        })
        .collect()
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn test_undeliverable_request_declined_by_all_then_collected() {
    let (dispatcher, log) = start_manual(5, 5);

    let req = dispatcher.submit(7).unwrap();
    assert!(dispatcher.wait_for_consumed(1, WAIT));
    dispatcher.shutdown();

    let records = log.lock().records();
    let events = events_for(&records, req.id);

    assert!(matches!(events[0].event, DispatchEvent::Dispatched { target_id: 7, .. }));
    let last = events.last().unwrap();
    assert_eq!(
        last.event,
        DispatchEvent::Collected {
            request_id: req.id,
            target_id: 7
        }
    );

    let mut workers = decliners(&events);
    assert_eq!(workers.len(), 5, "every worker declines exactly once");
    workers.sort_unstable();
    assert_eq!(workers, vec![0, 1, 2, 3, 4]);

    assert_eq!(dispatcher.shared().decision_snapshot(), vec![false; 5]);
    let stats = dispatcher.stats();
    assert_eq!(stats.collected, 1);
    assert_eq!(stats.claimed, 0);
}

#[test]
fn test_deliverable_request_claimed_by_its_worker() {
    let (dispatcher, log) = start_manual(5, 5);

    let req = dispatcher.submit(2).unwrap();
    assert!(dispatcher.wait_for_consumed(1, WAIT));
    dispatcher.shutdown();

    let records = log.lock().records();
    let events = events_for(&records, req.id);

    let last = events.last().unwrap();
    assert_eq!(
        last.event,
        DispatchEvent::Claimed {
            worker_id: 2,
            request_id: req.id,
            target_id: 2
        }
    );

    let workers = decliners(&events);
    assert!(workers.len() <= 4);
    assert!(!workers.contains(&2), "the addressed worker never declines");
    assert!(!events.iter().any(|r| matches!(r.event, DispatchEvent::Collected { .. })));

    assert_eq!(dispatcher.shared().decision_snapshot(), vec![false; 5]);
    assert_eq!(dispatcher.stats().claimed, 1);
}

#[test]
fn test_repeated_scenarios_do_not_interfere() {
    const ROUNDS: usize = 40;
    let (dispatcher, log) = start_manual(5, 5);

    let mut submitted = Vec::with_capacity(ROUNDS);
    for round in 0..ROUNDS {
        let target = if round % 2 == 0 { 7 } else { 2 };
        submitted.push(dispatcher.submit(target).unwrap());
    }
    assert!(dispatcher.wait_for_consumed(ROUNDS as u64, WAIT));
    dispatcher.shutdown();

    let records = log.lock().records();
    for req in &submitted {
        let events = events_for(&records, req.id);
        let consumes: Vec<_> = events.iter().filter(|r| r.event.is_consume()).collect();
        assert_eq!(consumes.len(), 1, "request {} consumed once", req.id);

        // Nothing may touch a request after it was consumed.
        assert_eq!(consumes[0].seq, events.last().unwrap().seq);

        let workers = decliners(&events);
        let distinct: BTreeSet<_> = workers.iter().copied().collect();
        assert_eq!(distinct.len(), workers.len(), "no double decline on request {}", req.id);

        if req.target_id == 7 {
            assert_eq!(workers.len(), 5);
            assert!(matches!(consumes[0].event, DispatchEvent::Collected { .. }));
        } else {
            assert!(!workers.contains(&2));
            assert!(matches!(consumes[0].event, DispatchEvent::Claimed { worker_id: 2, .. }));
        }
    }

    let stats = dispatcher.stats();
    assert_eq!(stats.claimed, (ROUNDS / 2) as u64);
    assert_eq!(stats.collected, (ROUNDS / 2) as u64);
    assert_eq!(stats.queued, 0);
}

#[test]
fn test_every_worker_claims_its_own_requests() {
    let (dispatcher, log) = start_manual(4, 3);

    for target in (0..4).cycle().take(40) {
        dispatcher.submit(target).unwrap();
    }
    assert!(dispatcher.wait_for_consumed(40, WAIT));
    dispatcher.shutdown();

    let mut per_worker: HashMap<usize, usize> = HashMap::new();
    for record in log.lock().records() {
        if let DispatchEvent::Claimed { worker_id, target_id, .. } = record.event {
            assert_eq!(worker_id, target_id);
            *per_worker.entry(worker_id).or_default() += 1;
        }
    }
    assert_eq!(per_worker.len(), 4);
    assert!(per_worker.values().all(|n| *n == 10));
}

#[test]
fn test_decline_vector_is_clear_before_next_head() {
    let (dispatcher, log) = start_manual(3, 2);

    for target in [4, 1, 3, 0, 2, 4] {
        dispatcher.submit(target).unwrap();
    }
    assert!(dispatcher.wait_for_consumed(6, WAIT));
    dispatcher.shutdown();

    // Between two consumes, declines only ever name the head of that interval.
    let records = log.lock().records();
    let mut current: Option<RequestId> = None;
    for record in &records {
        match &record.event {
            DispatchEvent::Declined { request_id, .. } => match current {
                Some(head) => assert_eq!(*request_id, head),
                None => current = Some(*request_id),
            },
            e if e.is_consume() => {
                if let Some(head) = current {
                    assert_eq!(e.request_id(), Some(head));
                }
                current = None;
            }
            _ => {}
        }
    }
}
