//! Dispatch core: shared state, producer, workers and collector.

pub mod error;
pub mod request;
pub mod decision;
pub mod events;
pub mod stats;
pub mod shared_state;
pub mod producer;
pub mod worker;
pub mod collector;
pub mod dispatcher;

pub use error::{AppResult, DispatchError};
pub use request::{Request, RequestId, TargetId, WorkerId, WorkerState};
pub use decision::DecisionVector;
pub use events::{
    ChannelEventSink, DispatchEvent, EventLog, EventRecord, EventSink, InMemoryEventSink,
    JsonLinesEventSink, SharedSink, TracingEventSink,
};
pub use stats::DispatchStats;
pub use shared_state::{SharedState, Verdict};
pub use producer::{spawn_producer, Producer, ScriptedTargets, TargetSource, UniformTargets};
pub use worker::{spawn_worker, worker_loop, NoopHandler, RequestHandler};
pub use collector::{collector_loop, spawn_collector};
pub use dispatcher::Dispatcher;
