//! Request producer and target selection.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use super::error::DispatchError;
use super::request::TargetId;
use super::shared_state::SharedState;

/// Supplies the target of each produced request.
pub trait TargetSource: Send + 'static {
    /// Next target, or `None` when the source is exhausted.
    fn next_target(&mut self) -> Option<TargetId>;
}

impl TargetSource for Box<dyn TargetSource> {
    fn next_target(&mut self) -> Option<TargetId> {
        (**self).next_target()
    }
}

/// Targets drawn uniformly from `[0, worker_count + garbage_spread)`.
///
/// Targets at or above `worker_count` match no worker and end up collected.
pub struct UniformTargets {
    rng: StdRng,
    range: usize,
}

impl UniformTargets {
    /// Build a source over `worker_count + garbage_spread` identifiers,
    /// seeded from `seed` or from the OS. The range saturates at `usize::MAX`.
    #[must_use]
    pub fn new(worker_count: usize, garbage_spread: usize, seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self {
            rng,
            range: worker_count.saturating_add(garbage_spread),
        }
    }

    /// Exclusive upper bound of produced targets.
    #[must_use]
    pub const fn range(&self) -> usize {
        self.range
    }
}

impl TargetSource for UniformTargets {
    fn next_target(&mut self) -> Option<TargetId> {
        if self.range == 0 {
            return None;
        }
        Some(self.rng.random_range(0..self.range))
    }
}

/// A fixed sequence of targets.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTargets {
    targets: VecDeque<TargetId>,
}

impl ScriptedTargets {
    /// Produce exactly `targets`, in order.
    pub fn new(targets: impl IntoIterator<Item = TargetId>) -> Self {
        Self {
            targets: targets.into_iter().collect(),
        }
    }
}

impl TargetSource for ScriptedTargets {
    fn next_target(&mut self) -> Option<TargetId> {
        self.targets.pop_front()
    }
}

/// Repeatedly synthesizes requests and pushes them into the shared channel.
pub struct Producer<S: TargetSource> {
    shared: Arc<SharedState>,
    source: S,
    interval: Duration,
    limit: Option<u64>,
}

impl<S: TargetSource> Producer<S> {
    /// Produce from `source` into `shared`, unpaced and unbounded.
    pub const fn new(shared: Arc<SharedState>, source: S) -> Self {
        Self {
            shared,
            source,
            interval: Duration::ZERO,
            limit: None,
        }
    }

    /// Pause between requests.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Stop after this many accepted requests.
    #[must_use]
    pub const fn with_limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    /// Run until the source is exhausted, the limit is reached, or shutdown.
    ///
    /// Returns the number of accepted requests.
    pub fn run(mut self) -> u64 {
        let mut produced = 0_u64;
        while self.limit.is_none_or(|limit| produced < limit) {
            let Some(target) = self.source.next_target() else {
                debug!(produced, "target source exhausted");
                break;
            };
            match self.shared.enqueue(target) {
                Ok(_) => produced += 1,
                Err(DispatchError::Shutdown) => break,
                Err(e) => {
                    warn!(target_id = target, error = %e, "producer could not enqueue request");
                    break;
                }
            }
            if !self.interval.is_zero() && self.shared.sleep_unless_shutdown(self.interval) {
                break;
            }
        }
        info!(produced, "producer finished");
        produced
    }
}

/// Spawn the producer on a dedicated thread.
///
/// # Errors
///
/// Returns `DispatchError::Spawn` if the OS refuses the thread.
pub fn spawn_producer<S: TargetSource>(
    producer: Producer<S>,
    stack_size: usize,
) -> Result<JoinHandle<()>, DispatchError> {
    thread::Builder::new()
        .name("triage-producer".into())
        .stack_size(stack_size)
        .spawn(move || {
            producer.run();
        })
        .map_err(|e| DispatchError::Spawn(e.to_string()))
}
