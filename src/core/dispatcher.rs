//! Dispatcher owning the producer, worker and collector threads.
//!
//! # Design
//!
//! - **No polling**: workers and the collector block on condition variables
//! - **One lock**: channel, decision vector and worker states share a mutex
//! - **Clean shutdown**: a shutdown flag plus broadcast unblocks every thread

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::collector::spawn_collector;
use super::error::DispatchError;
use super::events::EventLog;
use super::producer::{spawn_producer, Producer, TargetSource};
use super::request::{Request, TargetId};
use super::shared_state::SharedState;
use super::stats::DispatchStats;
use super::worker::{spawn_worker, RequestHandler};
use crate::config::DispatchConfig;

/// How long shutdown waits for each thread before detaching it.
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Running dispatch system: one optional producer, N workers, one collector.
pub struct Dispatcher {
    config: DispatchConfig,
    shared: Arc<SharedState>,
    threads: Mutex<Vec<(String, JoinHandle<()>)>>,
    stopped: AtomicBool,
}

impl Dispatcher {
    /// Start the worker pool and collector, plus a producer if `source` is set.
    ///
    /// # Errors
    ///
    /// - `DispatchError::InvalidConfig` if the configuration is invalid
    /// - `DispatchError::Spawn` if a thread cannot be started; threads already
    ///   started are shut down
    pub fn start<H, S>(
        config: DispatchConfig,
        events: EventLog,
        handler: H,
        source: Option<S>,
    ) -> Result<Self, DispatchError>
    where
        H: RequestHandler,
        S: TargetSource,
    {
        let shared = Arc::new(SharedState::from_config(&config, events)?);
        let dispatcher = Self {
            config,
            shared,
            threads: Mutex::new(Vec::new()),
            stopped: AtomicBool::new(false),
        };
        if let Err(e) = dispatcher.spawn_all(handler, source) {
            dispatcher.shutdown();
            return Err(e);
        }

        info!(
            worker_count = dispatcher.config.worker_count,
            garbage_spread = dispatcher.config.garbage_spread,
            channel_capacity = dispatcher.shared.capacity(),
            "dispatcher started"
        );
        Ok(dispatcher)
    }

    fn spawn_all<H, S>(&self, handler: H, source: Option<S>) -> Result<(), DispatchError>
    where
        H: RequestHandler,
        S: TargetSource,
    {
        let stack = self.config.thread_stack_size;
        let mut threads = self.threads.lock();

        for worker_id in 0..self.config.worker_count {
            let handle = spawn_worker(worker_id, Arc::clone(&self.shared), handler.clone(), stack)?;
            threads.push((format!("worker-{worker_id}"), handle));
        }
        let handle = spawn_collector(Arc::clone(&self.shared), handler, stack)?;
        threads.push(("collector".into(), handle));

        if let Some(source) = source {
            let producer = Producer::new(Arc::clone(&self.shared), source)
                .with_interval(self.config.dispatch_interval())
                .with_limit(self.config.max_requests);
            threads.push(("producer".into(), spawn_producer(producer, stack)?));
        }
        Ok(())
    }

    /// Configuration this dispatcher was started with.
    #[must_use]
    pub const fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Shared channel and decision state.
    #[must_use]
    pub const fn shared(&self) -> &Arc<SharedState> {
        &self.shared
    }

    /// Enqueue a request, blocking while the channel is full.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Shutdown` after shutdown.
    pub fn submit(&self, target: TargetId) -> Result<Request, DispatchError> {
        self.shared.enqueue(target)
    }

    /// Enqueue a request without blocking.
    ///
    /// # Errors
    ///
    /// - `DispatchError::ChannelFull` if the channel is at capacity
    /// - `DispatchError::Shutdown` after shutdown
    pub fn try_submit(&self, target: TargetId) -> Result<Request, DispatchError> {
        self.shared.try_enqueue(target)
    }

    /// Wait until at least `count` requests have been claimed or collected.
    #[must_use]
    pub fn wait_for_consumed(&self, count: u64, timeout: Duration) -> bool {
        self.shared.wait_for_consumed(count, timeout)
    }

    /// Get current dispatch statistics.
    #[must_use]
    pub fn stats(&self) -> DispatchStats {
        self.shared.stats()
    }

    /// Shut down all dispatch threads.
    ///
    /// Joins each thread with a timeout; threads that do not exit in time are
    /// detached. Requests still in the channel stay there. Idempotent.
    pub fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }

        info!("shutting down dispatcher");
        self.shared.shutdown();

        let mut threads = self.threads.lock();
        let thread_count = threads.len();

        for (name, handle) in threads.drain(..) {
            let (tx, rx) = crossbeam_channel::bounded(1);
            let joiner = thread::spawn(move || {
                let _ = tx.send(handle.join().is_ok());
            });

            match rx.recv_timeout(JOIN_TIMEOUT) {
                Ok(true) => debug!(thread = %name, "thread joined"),
                Ok(false) => warn!(thread = %name, "thread panicked"),
                Err(_) => {
                    warn!(thread = %name, "thread did not exit within timeout - detaching");
                    continue;
                }
            }
            let _ = joiner.join();
        }

        info!(
            thread_count,
            queued = self.shared.len(),
            head = ?self.shared.head(),
            "dispatcher shut down complete"
        );
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // Signal only; explicit shutdown() is required to join.
        if !self.stopped.swap(true, Ordering::AcqRel) {
            self.shared.shutdown();
            debug!("Dispatcher dropped without explicit shutdown - threads will be detached");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{NoopHandler, ScriptedTargets, UniformTargets};

    #[test]
    fn test_start_rejects_invalid_config() {
        let config = DispatchConfig::new().with_worker_count(0);
        let result = Dispatcher::start(config, EventLog::default(), NoopHandler, None::<ScriptedTargets>);
        assert!(matches!(result, Err(DispatchError::InvalidConfig(_))));
    }

    #[test]
    fn test_dispatcher_drains_scripted_requests() {
        let config = DispatchConfig::new().with_worker_count(3).with_garbage_spread(2);
        let source = ScriptedTargets::new([0, 4, 2, 3, 1]);
        let dispatcher = Dispatcher::start(config, EventLog::default(), NoopHandler, Some(source)).unwrap();

        assert!(dispatcher.wait_for_consumed(5, Duration::from_secs(5)));
        let stats = dispatcher.stats();
        assert_eq!(stats.claimed, 3);
        assert_eq!(stats.collected, 2);
        assert_eq!(stats.queued, 0);

        dispatcher.shutdown();
        dispatcher.shutdown();
    }

    #[test]
    fn test_wait_for_consumed_without_deadline() {
        let config = DispatchConfig::new().with_worker_count(2).with_garbage_spread(1);
        let dispatcher = Dispatcher::start(config, EventLog::default(), NoopHandler, None::<ScriptedTargets>).unwrap();

        dispatcher.submit(2).unwrap();
        dispatcher.submit(1).unwrap();
        assert!(dispatcher.wait_for_consumed(2, Duration::MAX));
        dispatcher.shutdown();
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let dispatcher = Dispatcher::start(
            DispatchConfig::new(),
            EventLog::default(),
            NoopHandler,
            None::<UniformTargets>,
        )
        .unwrap();
        dispatcher.shutdown();
        assert!(matches!(dispatcher.submit(1), Err(DispatchError::Shutdown)));
        assert!(matches!(dispatcher.try_submit(1), Err(DispatchError::Shutdown)));
    }
}
