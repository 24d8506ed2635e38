//! Per-worker decline record for the current head request.

use super::request::WorkerId;

/// One flag per worker, set when that worker has declined the current head.
///
/// Only ever mutated under the dispatch lock. A flag set twice without an
/// intervening [`reset`](Self::reset), or a flag index outside the pool, means
/// the locking discipline was broken somewhere and is treated as fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionVector {
    flags: Vec<bool>,
    declined: usize,
}

impl DecisionVector {
    /// Create a vector of `worker_count` cleared flags.
    #[must_use]
    pub fn new(worker_count: usize) -> Self {
        Self {
            flags: vec![false; worker_count],
            declined: 0,
        }
    }

    /// Number of workers tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Whether the vector tracks no workers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Record that `worker` declined the current head.
    ///
    /// # Panics
    ///
    /// Panics if `worker` is out of range or already declined this head.
    pub fn decline(&mut self, worker: WorkerId) {
        assert!(
            worker < self.flags.len(),
            "inconsistent decision vector: worker {worker} outside pool of {}",
            self.flags.len()
        );
        assert!(
            !self.flags[worker],
            "inconsistent decision vector: worker {worker} declined the same head twice"
        );
        self.flags[worker] = true;
        self.declined += 1;
        assert!(
            self.declined <= self.flags.len(),
            "inconsistent decision vector: {} declines for {} workers",
            self.declined,
            self.flags.len()
        );
    }

    /// Whether `worker` has declined the current head.
    #[must_use]
    pub fn is_declined(&self, worker: WorkerId) -> bool {
        self.flags.get(worker).copied().unwrap_or(false)
    }

    /// Number of set flags.
    #[must_use]
    pub const fn declined_count(&self) -> usize {
        self.declined
    }

    /// Whether every worker has declined the current head.
    #[must_use]
    pub fn all_declined(&self) -> bool {
        !self.flags.is_empty() && self.declined == self.flags.len()
    }

    /// Clear all flags.
    pub fn reset(&mut self) {
        self.flags.iter_mut().for_each(|f| *f = false);
        self.declined = 0;
    }

    /// Copy of the flags, indexed by worker.
    #[must_use]
    pub fn snapshot(&self) -> Vec<bool> {
        self.flags.clone()
    }
}
