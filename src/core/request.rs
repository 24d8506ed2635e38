//! Request and worker identity types.

use serde::{Deserialize, Serialize};

/// Identifier of a consumer worker, `0..worker_count`.
pub type WorkerId = usize;

/// Worker a request is addressed to. Values `>= worker_count` match nobody.
pub type TargetId = usize;

/// Sequence number assigned when the channel accepts a request.
pub type RequestId = u64;

/// An addressed unit of work. Immutable once accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Request {
    /// Acceptance sequence number, unique per shared state.
    pub id: RequestId,
    /// Worker this request is addressed to.
    pub target_id: TargetId,
}

impl Request {
    /// Whether this request is addressed to `worker`.
    #[must_use]
    pub const fn is_for(&self, worker: WorkerId) -> bool {
        self.target_id == worker
    }
}

/// Scheduling state of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Peeking or evaluating the head request.
    Running,
    /// Declined the current head and waiting for it to change.
    Suspended,
}
