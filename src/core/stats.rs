//! Dispatch statistics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Statistics about dispatch activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStats {
    /// Number of consumer workers.
    pub worker_count: usize,

    /// Channel capacity.
    pub channel_capacity: usize,

    /// Requests currently waiting in the channel.
    pub queued: usize,

    /// Requests accepted into the channel.
    pub dispatched: u64,

    /// Enqueue attempts that failed (full, timed out, or shut down).
    pub failed_dispatches: u64,

    /// Requests claimed by their addressed worker.
    pub claimed: u64,

    /// Requests removed by the collector.
    pub collected: u64,

    /// Total declines recorded.
    pub declines: u64,

    /// Suspended workers woken without a head change.
    pub spurious_wakes: u64,

    /// Enqueues that found the channel full and had to wait.
    pub backpressure_waits: u64,
}

impl DispatchStats {
    /// Requests removed from the channel by either path.
    #[must_use]
    pub const fn consumed(&self) -> u64 {
        self.claimed + self.collected
    }
}

/// Internal counters for dispatch statistics (thread-safe).
///
/// Written under the dispatch lock, read without it.
#[derive(Debug, Default)]
pub(crate) struct DispatchCounters {
    pub dispatched: AtomicU64,
    pub failed_dispatches: AtomicU64,
    pub claimed: AtomicU64,
    pub collected: AtomicU64,
    pub declines: AtomicU64,
    pub spurious_wakes: AtomicU64,
    pub backpressure_waits: AtomicU64,
}

impl DispatchCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current statistics.
    pub fn snapshot(&self, worker_count: usize, channel_capacity: usize, queued: usize) -> DispatchStats {
        DispatchStats {
            worker_count,
            channel_capacity,
            queued,
            dispatched: self.dispatched.load(Ordering::Relaxed),
            failed_dispatches: self.failed_dispatches.load(Ordering::Relaxed),
            claimed: self.claimed.load(Ordering::Relaxed),
            collected: self.collected.load(Ordering::Relaxed),
            declines: self.declines.load(Ordering::Relaxed),
            spurious_wakes: self.spurious_wakes.load(Ordering::Relaxed),
            backpressure_waits: self.backpressure_waits.load(Ordering::Relaxed),
        }
    }
}
