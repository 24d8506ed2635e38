//! Bounded request channel plus decision vector under one lock.
//!
//! All parties look at the same head request. Deciding about the head and
//! acting on that decision (removing it, or recording a decline) always happen
//! inside a single critical section, so two parties can never both remove the
//! same head, and a decline can never be attributed to the wrong request.
//!
//! # Wake protocol
//!
//! - A decline marks the worker `Suspended` in the same critical section that
//!   sets its flag. The worker then waits until someone flips it back.
//! - Every consume (claim or collection) clears all flags, flips every
//!   suspended worker to `Running`, and broadcasts, all before releasing the
//!   lock. A worker that has not reached its wait yet simply finds itself
//!   already running.
//! - The collector waits on `declines_changed`, signalled after each decline,
//!   and only acts once every flag is set.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{trace, warn};

use super::decision::DecisionVector;
use super::error::DispatchError;
use super::events::{DispatchEvent, EventLog};
use super::request::{Request, RequestId, TargetId, WorkerId, WorkerState};
use super::stats::{DispatchCounters, DispatchStats};
use crate::config::DispatchConfig;

/// Outcome of a worker evaluating the head request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Head was addressed to the worker and has been removed.
    Claimed(Request),
    /// Head was addressed elsewhere; the worker is now suspended.
    Declined(Request),
}

/// State guarded by the dispatch lock.
struct DispatchState {
    channel: VecDeque<Request>,
    decisions: DecisionVector,
    workers: Vec<WorkerState>,
    /// Bumped on every consume.
    generation: u64,
    next_request_id: RequestId,
    consumed: u64,
    shutdown: bool,
}

impl DispatchState {
    /// A worker is suspended exactly when it has declined the current head.
    fn check_consistency(&self, worker: WorkerId) {
        assert_eq!(
            self.decisions.is_declined(worker),
            self.workers[worker] == WorkerState::Suspended,
            "inconsistent decision vector: worker {worker} flag and state disagree"
        );
    }
}

/// Channel, decision vector and wake conditions shared by every dispatch task.
pub struct SharedState {
    worker_count: usize,
    capacity: usize,
    backpressure_warn: Duration,
    state: Mutex<DispatchState>,
    /// Signalled when a consume frees a slot.
    not_full: Condvar,
    /// Signalled when the head changes: a consume, or a push into an empty channel.
    head_changed: Condvar,
    /// Signalled after each decline.
    declines_changed: Condvar,
    counters: DispatchCounters,
    events: EventLog,
}

impl SharedState {
    /// Create shared state for `worker_count` workers over a channel of `capacity`.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::InvalidConfig` if either size is zero.
    pub fn new(
        worker_count: usize,
        capacity: usize,
        backpressure_warn: Duration,
        events: EventLog,
    ) -> Result<Self, DispatchError> {
        if worker_count == 0 {
            return Err(DispatchError::InvalidConfig("worker_count must be greater than 0".into()));
        }
        if capacity == 0 {
            return Err(DispatchError::InvalidConfig("channel_capacity must be greater than 0".into()));
        }
        Ok(Self {
            worker_count,
            capacity,
            backpressure_warn,
            state: Mutex::new(DispatchState {
                channel: VecDeque::with_capacity(capacity),
                decisions: DecisionVector::new(worker_count),
                workers: vec![WorkerState::Running; worker_count],
                generation: 0,
                next_request_id: 0,
                consumed: 0,
                shutdown: false,
            }),
            not_full: Condvar::new(),
            head_changed: Condvar::new(),
            declines_changed: Condvar::new(),
            counters: DispatchCounters::default(),
            events,
        })
    }

    /// Create shared state sized from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::InvalidConfig` if the configuration is invalid.
    pub fn from_config(config: &DispatchConfig, events: EventLog) -> Result<Self, DispatchError> {
        config.validate().map_err(DispatchError::InvalidConfig)?;
        Self::new(
            config.worker_count,
            config.effective_capacity(),
            config.backpressure_warn(),
            events,
        )
    }

    /// Number of workers in the pool.
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Requests currently in the channel.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().channel.len()
    }

    /// Whether the channel is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().channel.is_empty()
    }

    /// Current head request, without removing it.
    #[must_use]
    pub fn head(&self) -> Option<Request> {
        self.state.lock().channel.front().copied()
    }

    /// Head generation; bumped on every consume.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Requests removed so far by either path.
    #[must_use]
    pub fn consumed(&self) -> u64 {
        self.state.lock().consumed
    }

    /// Copy of the decision vector.
    #[must_use]
    pub fn decision_snapshot(&self) -> Vec<bool> {
        self.state.lock().decisions.snapshot()
    }

    /// Copy of every worker's state.
    #[must_use]
    pub fn worker_states(&self) -> Vec<WorkerState> {
        self.state.lock().workers.clone()
    }

    /// Whether shutdown has been signalled.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.state.lock().shutdown
    }

    /// Snapshot of the dispatch counters.
    #[must_use]
    pub fn stats(&self) -> DispatchStats {
        let queued = self.len();
        self.counters.snapshot(self.worker_count, self.capacity, queued)
    }

    /// Enqueue a request for `target`, blocking while the channel is full.
    ///
    /// Waiting longer than the backpressure threshold logs a warning once; the
    /// call keeps waiting regardless.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Shutdown` if shutdown is signalled before the
    /// request is accepted.
    pub fn enqueue(&self, target: TargetId) -> Result<Request, DispatchError> {
        let mut state = self.state.lock();
        if self.is_full(&state) {
            DispatchCounters::bump(&self.counters.backpressure_waits);
            let deadline = Instant::now().checked_add(self.backpressure_warn);
            let mut warned = false;
            while self.is_full(&state) {
                if warned {
                    self.not_full.wait(&mut state);
                } else if wait_deadline(&self.not_full, &mut state, deadline) {
                    warned = true;
                    if self.is_full(&state) {
                        warn!(
                            target_id = target,
                            waited = ?self.backpressure_warn,
                            "producer blocked on full channel"
                        );
                    }
                }
            }
        }
        if state.shutdown {
            return Err(self.reject(target, DispatchError::Shutdown));
        }
        Ok(self.push_locked(&mut state, target))
    }

    /// Enqueue a request for `target` without blocking.
    ///
    /// # Errors
    ///
    /// - `DispatchError::ChannelFull` if the channel is at capacity
    /// - `DispatchError::Shutdown` if shutdown has been signalled
    pub fn try_enqueue(&self, target: TargetId) -> Result<Request, DispatchError> {
        let mut state = self.state.lock();
        if state.shutdown {
            return Err(self.reject(target, DispatchError::Shutdown));
        }
        if state.channel.len() >= self.capacity {
            return Err(self.reject(target, DispatchError::ChannelFull));
        }
        Ok(self.push_locked(&mut state, target))
    }

    /// Enqueue a request for `target`, waiting at most `timeout` for space.
    ///
    /// # Errors
    ///
    /// - `DispatchError::EnqueueTimeout` if the channel stayed full
    /// - `DispatchError::Shutdown` if shutdown has been signalled
    pub fn enqueue_timeout(&self, target: TargetId, timeout: Duration) -> Result<Request, DispatchError> {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.state.lock();
        if self.is_full(&state) {
            DispatchCounters::bump(&self.counters.backpressure_waits);
        }
        while self.is_full(&state) {
            if wait_deadline(&self.not_full, &mut state, deadline) && self.is_full(&state) {
                return Err(self.reject(target, DispatchError::EnqueueTimeout(timeout)));
            }
        }
        if state.shutdown {
            return Err(self.reject(target, DispatchError::Shutdown));
        }
        Ok(self.push_locked(&mut state, target))
    }

    /// Peek at the head and act on it in one step, without blocking.
    ///
    /// Returns `None` when the channel is empty, or when `worker` has already
    /// declined the current head and must wait for it to change.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::UnknownWorker` if `worker` is outside the pool.
    pub fn try_evaluate(&self, worker: WorkerId) -> Result<Option<Verdict>, DispatchError> {
        self.check_worker(worker)?;
        let mut state = self.state.lock();
        Ok(self.evaluate_locked(&mut state, worker))
    }

    /// Block until there is a head `worker` has not yet declined, then act on it.
    ///
    /// # Errors
    ///
    /// - `DispatchError::UnknownWorker` if `worker` is outside the pool
    /// - `DispatchError::Shutdown` once shutdown is signalled
    pub fn evaluate(&self, worker: WorkerId) -> Result<Verdict, DispatchError> {
        self.check_worker(worker)?;
        let mut state = self.state.lock();
        loop {
            if state.shutdown {
                return Err(DispatchError::Shutdown);
            }
            if let Some(verdict) = self.evaluate_locked(&mut state, worker) {
                return Ok(verdict);
            }
            if state.workers[worker] == WorkerState::Suspended {
                self.wait_resumed(&mut state, worker);
            } else {
                self.head_changed.wait(&mut state);
            }
        }
    }

    /// Block a suspended worker until the head it declined is consumed.
    ///
    /// Returns immediately if the worker is already running again.
    ///
    /// # Errors
    ///
    /// - `DispatchError::UnknownWorker` if `worker` is outside the pool
    /// - `DispatchError::Shutdown` once shutdown is signalled
    pub fn suspend(&self, worker: WorkerId) -> Result<(), DispatchError> {
        self.check_worker(worker)?;
        let mut state = self.state.lock();
        self.wait_resumed(&mut state, worker);
        if state.shutdown {
            return Err(DispatchError::Shutdown);
        }
        Ok(())
    }

    /// Remove the head if every worker has declined it, without blocking.
    #[must_use]
    pub fn try_collect(&self) -> Option<Request> {
        let mut state = self.state.lock();
        self.collect_locked(&mut state)
    }

    /// Block until every worker has declined the head, then remove it.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Shutdown` once shutdown is signalled.
    pub fn collect(&self) -> Result<Request, DispatchError> {
        let mut state = self.state.lock();
        loop {
            if state.shutdown {
                return Err(DispatchError::Shutdown);
            }
            if let Some(request) = self.collect_locked(&mut state) {
                return Ok(request);
            }
            self.declines_changed.wait(&mut state);
        }
    }

    /// Wait until at least `count` requests have been consumed.
    ///
    /// Returns `false` if `timeout` elapses first. A timeout too large to
    /// represent as a deadline waits without one.
    #[must_use]
    pub fn wait_for_consumed(&self, count: u64, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.state.lock();
        while state.consumed < count {
            if wait_deadline(&self.head_changed, &mut state, deadline) {
                return state.consumed >= count;
            }
        }
        true
    }

    /// Sleep for `duration` unless shutdown arrives first.
    ///
    /// Returns `true` if shutdown was signalled.
    pub fn sleep_unless_shutdown(&self, duration: Duration) -> bool {
        let deadline = Instant::now().checked_add(duration);
        let mut state = self.state.lock();
        while !state.shutdown {
            if wait_deadline(&self.not_full, &mut state, deadline) {
                break;
            }
        }
        state.shutdown
    }

    /// Signal shutdown and wake every waiter.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        state.shutdown = true;
        drop(state);
        self.not_full.notify_all();
        self.head_changed.notify_all();
        self.declines_changed.notify_all();
    }

    fn check_worker(&self, worker: WorkerId) -> Result<(), DispatchError> {
        if worker >= self.worker_count {
            return Err(DispatchError::UnknownWorker(worker));
        }
        Ok(())
    }

    fn is_full(&self, state: &DispatchState) -> bool {
        !state.shutdown && state.channel.len() >= self.capacity
    }

    fn push_locked(&self, state: &mut DispatchState, target: TargetId) -> Request {
        let request = Request {
            id: state.next_request_id,
            target_id: target,
        };
        state.next_request_id += 1;
        let was_empty = state.channel.is_empty();
        state.channel.push_back(request);

        DispatchCounters::bump(&self.counters.dispatched);
        self.events.emit(DispatchEvent::Dispatched {
            request_id: request.id,
            target_id: target,
        });

        if was_empty {
            self.head_changed.notify_all();
        }
        request
    }

    fn reject(&self, target: TargetId, err: DispatchError) -> DispatchError {
        DispatchCounters::bump(&self.counters.failed_dispatches);
        self.events.emit(DispatchEvent::DispatchFailed {
            target_id: target,
            reason: err.to_string(),
        });
        err
    }

    fn evaluate_locked(&self, state: &mut DispatchState, worker: WorkerId) -> Option<Verdict> {
        state.check_consistency(worker);
        if state.workers[worker] == WorkerState::Suspended {
            return None;
        }
        let head = *state.channel.front()?;

        if head.is_for(worker) {
            state.channel.pop_front();
            self.consume_locked(state);
            DispatchCounters::bump(&self.counters.claimed);
            self.events.emit(DispatchEvent::Claimed {
                worker_id: worker,
                request_id: head.id,
                target_id: head.target_id,
            });
            Some(Verdict::Claimed(head))
        } else {
            state.decisions.decline(worker);
            state.workers[worker] = WorkerState::Suspended;
            DispatchCounters::bump(&self.counters.declines);
            self.events.emit(DispatchEvent::Declined {
                worker_id: worker,
                request_id: head.id,
                target_id: head.target_id,
            });
            self.declines_changed.notify_all();
            Some(Verdict::Declined(head))
        }
    }

    fn collect_locked(&self, state: &mut DispatchState) -> Option<Request> {
        if !state.decisions.all_declined() {
            return None;
        }
        let Some(request) = state.channel.pop_front() else {
            panic!("inconsistent decision vector: every worker declined an empty channel");
        };
        assert!(
            request.target_id >= self.worker_count,
            "inconsistent decision vector: request {} for worker {} declined by all",
            request.id,
            request.target_id
        );
        self.consume_locked(state);
        DispatchCounters::bump(&self.counters.collected);
        self.events.emit(DispatchEvent::Collected {
            request_id: request.id,
            target_id: request.target_id,
        });
        Some(request)
    }

    /// Clear declines, resume every suspended worker and free a slot.
    fn consume_locked(&self, state: &mut DispatchState) {
        state.decisions.reset();
        state.workers.iter_mut().for_each(|w| *w = WorkerState::Running);
        state.generation += 1;
        state.consumed += 1;
        self.head_changed.notify_all();
        self.not_full.notify_all();
    }

    fn wait_resumed(&self, state: &mut MutexGuard<'_, DispatchState>, worker: WorkerId) {
        while state.workers[worker] == WorkerState::Suspended && !state.shutdown {
            self.head_changed.wait(state);
            if state.workers[worker] == WorkerState::Suspended && !state.shutdown {
                DispatchCounters::bump(&self.counters.spurious_wakes);
                trace!(worker_id = worker, "spurious wake while suspended");
            }
        }
    }
}

/// Wait on `condvar` until `deadline`, or without a bound when there is none.
///
/// Returns `true` once the deadline has passed.
fn wait_deadline(
    condvar: &Condvar,
    state: &mut MutexGuard<'_, DispatchState>,
    deadline: Option<Instant>,
) -> bool {
    match deadline {
        Some(deadline) => condvar.wait_until(state, deadline).timed_out(),
        None => {
            condvar.wait(state);
            false
        }
    }
}
