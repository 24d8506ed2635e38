//! Tests for event sinks

use triage_dispatch::core::{DispatchEvent, EventRecord, EventSink, InMemoryEventSink, JsonLinesEventSink};

fn record(seq: u64, event: DispatchEvent) -> EventRecord {
    EventRecord { seq, at_ms: 1, event }
}

#[test]
fn test_in_memory_event_sink() {
    let mut sink = InMemoryEventSink::new(10);

    sink.record(record(
        0,
        DispatchEvent::Dispatched {
            request_id: 0,
            target_id: 7,
        },
    ));
    assert_eq!(sink.records().len(), 1);

    let records = sink.records();
    assert_eq!(records[0].seq, 0);
    assert_eq!(records[0].event.request_id(), Some(0));
}

#[test]
fn test_event_sink_overflow() {
    let mut sink = InMemoryEventSink::new(2);

    for seq in 0..3 {
        sink.record(record(
            seq,
            DispatchEvent::Declined {
                worker_id: 1,
                request_id: seq,
                target_id: 9,
            },
        ));
    }

    let records = sink.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].seq, 1); // First one popped
    assert_eq!(records[1].seq, 2);
}

#[test]
fn test_json_lines_round_trip() {
    let mut sink = JsonLinesEventSink::new(Vec::new());
    let original = record(
        5,
        DispatchEvent::DispatchFailed {
            target_id: 3,
            reason: "channel full".into(),
        },
    );
    sink.record(original.clone());

    let bytes = sink.into_inner();
    let text = std::str::from_utf8(&bytes).unwrap();
    let parsed: EventRecord = serde_json::from_str(text.trim_end()).unwrap();
    assert_eq!(parsed, original);
}
