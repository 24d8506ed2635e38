//! Dispatch event log and sink implementations.
//!
//! Every dispatch, claim, decline and collection is recorded as a
//! [`DispatchEvent`]. Records are appended while the dispatch lock is held, so
//! the sequence numbers reflect the real order of decisions.

use std::collections::VecDeque;
use std::io::Write;

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::request::{RequestId, TargetId, WorkerId};
use crate::util::clock::now_ms;

/// A routine dispatch event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchEvent {
    /// Producer placed a request in the channel.
    Dispatched {
        /// Accepted request.
        request_id: RequestId,
        /// Addressed worker.
        target_id: TargetId,
    },
    /// Producer could not place a request.
    DispatchFailed {
        /// Addressed worker.
        target_id: TargetId,
        /// Why the enqueue failed.
        reason: String,
    },
    /// A worker removed a request addressed to it.
    Claimed {
        /// Claiming worker.
        worker_id: WorkerId,
        /// Claimed request.
        request_id: RequestId,
        /// Addressed worker, equal to `worker_id`.
        target_id: TargetId,
    },
    /// A worker passed on the head request.
    Declined {
        /// Declining worker.
        worker_id: WorkerId,
        /// Head request at the time.
        request_id: RequestId,
        /// Addressed worker.
        target_id: TargetId,
    },
    /// The collector removed a request every worker declined.
    Collected {
        /// Discarded request.
        request_id: RequestId,
        /// Addressed worker, matching nobody.
        target_id: TargetId,
    },
}

impl DispatchEvent {
    /// Request this event concerns, if it was accepted.
    #[must_use]
    pub const fn request_id(&self) -> Option<RequestId> {
        match self {
            Self::Dispatched { request_id, .. }
            | Self::Claimed { request_id, .. }
            | Self::Declined { request_id, .. }
            | Self::Collected { request_id, .. } => Some(*request_id),
            Self::DispatchFailed { .. } => None,
        }
    }

    /// Whether this event removed a request from the channel.
    #[must_use]
    pub const fn is_consume(&self) -> bool {
        matches!(self, Self::Claimed { .. } | Self::Collected { .. })
    }
}

/// A sequenced, timestamped event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Position in the log, starting at 0.
    pub seq: u64,
    /// Timestamp in milliseconds since epoch.
    pub at_ms: u128,
    /// The event itself.
    pub event: DispatchEvent,
}

/// Event sink abstraction.
pub trait EventSink: Send {
    /// Record an event.
    fn record(&mut self, record: EventRecord);
}

/// In-memory event sink for testing and dev.
pub struct InMemoryEventSink {
    records: VecDeque<EventRecord>,
    max_records: usize,
}

impl InMemoryEventSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_records: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(max_records.min(4096)),
            max_records,
        }
    }

    /// Retrieve a snapshot of stored records.
    #[must_use]
    pub fn records(&self) -> Vec<EventRecord> {
        self.records.iter().cloned().collect()
    }
}

impl EventSink for InMemoryEventSink {
    fn record(&mut self, record: EventRecord) {
        if self.max_records == 0 {
            return;
        }
        if self.records.len() >= self.max_records {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }
}

/// Sink that turns every event into a `tracing` line.
///
/// Routine traffic, garbage collections included, logs at `info`; declines
/// are per-worker noise and log at `debug`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn record(&mut self, record: EventRecord) {
        match record.event {
            DispatchEvent::Dispatched { request_id, target_id } => {
                tracing::info!(seq = record.seq, request_id, target_id, "dispatch request");
            }
            DispatchEvent::DispatchFailed { target_id, reason } => {
                tracing::info!(seq = record.seq, target_id, %reason, "request not dispatched");
            }
            DispatchEvent::Claimed { worker_id, request_id, target_id } => {
                tracing::info!(seq = record.seq, worker_id, request_id, target_id, "request claimed");
            }
            DispatchEvent::Declined { worker_id, request_id, target_id } => {
                tracing::debug!(seq = record.seq, worker_id, request_id, target_id, "request declined");
            }
            DispatchEvent::Collected { request_id, target_id } => {
                tracing::info!(
                    seq = record.seq,
                    request_id,
                    target_id,
                    "request not performed by any worker, collected"
                );
            }
        }
    }
}

/// Append-only JSON lines log over any writer.
pub struct JsonLinesEventSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesEventSink<W> {
    /// Wrap a writer.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Unwrap the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> EventSink for JsonLinesEventSink<W> {
    fn record(&mut self, record: EventRecord) {
        let line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(seq = record.seq, error = %e, "failed to encode event");
                return;
            }
        };
        if let Err(e) = writeln!(self.writer, "{line}") {
            tracing::error!(seq = record.seq, error = %e, "failed to write event");
        }
    }
}

/// Forwards records to an external collaborator over a channel.
///
/// Never blocks the dispatch lock: a full or disconnected channel drops the
/// record with a warning.
pub struct ChannelEventSink {
    tx: Sender<EventRecord>,
}

impl ChannelEventSink {
    /// Forward records into `tx`.
    #[must_use]
    pub const fn new(tx: Sender<EventRecord>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn record(&mut self, record: EventRecord) {
        let seq = record.seq;
        if let Err(e) = self.tx.try_send(record) {
            tracing::warn!(seq, error = %e, "event channel rejected record");
        }
    }
}

/// Sequencing front for a boxed sink.
pub struct EventLog {
    next_seq: Mutex<u64>,
    sink: Mutex<Box<dyn EventSink>>,
}

impl EventLog {
    /// Wrap a sink.
    #[must_use]
    pub fn new(sink: Box<dyn EventSink>) -> Self {
        Self {
            next_seq: Mutex::new(0),
            sink: Mutex::new(sink),
        }
    }

    /// Assign a sequence number and timestamp, then hand the event to the sink.
    pub fn emit(&self, event: DispatchEvent) {
        let seq = {
            let mut next = self.next_seq.lock();
            let seq = *next;
            *next += 1;
            seq
        };
        self.sink.lock().record(EventRecord {
            seq,
            at_ms: now_ms(),
            event,
        });
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(Box::new(TracingEventSink))
    }
}

/// Event sink shared with the caller, so records stay inspectable while the
/// dispatcher runs.
pub struct SharedSink<S: EventSink>(pub std::sync::Arc<Mutex<S>>);

impl<S: EventSink> EventSink for SharedSink<S> {
    fn record(&mut self, record: EventRecord) {
        self.0.lock().record(record);
    }
}
