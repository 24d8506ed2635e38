//! # Triage Dispatch
//!
//! Addressed request dispatch over a shared bounded channel.
//!
//! A single producer injects requests, each addressed to one worker, into a
//! bounded FIFO. A fixed pool of workers all look at the same head request:
//! the addressed worker claims it, every other worker records a decline in a
//! shared decision vector and suspends until the head changes. Requests whose
//! target matches no worker are declined by everyone, and a garbage collector
//! removes them once the decision vector is full.
//!
//! ## Guarantees
//!
//! - **Exactly-once consumption**: every accepted request is removed once,
//!   either by its worker (claim) or by the collector (collection).
//! - **No premature collection**: a request addressed to a live worker is
//!   never collected, because that worker never declines it.
//! - **Clean decision vector**: every consume resets all declines in the same
//!   critical section that removes the head.
//! - **No lost wakeups**: waits re-check their predicate under the shared lock
//!   and every wake is a broadcast.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use triage_dispatch::builders::DispatcherBuilder;
//! use triage_dispatch::config::DispatchConfig;
//! use triage_dispatch::core::InMemoryEventSink;
//!
//! let config = DispatchConfig::new()
//!     .with_worker_count(5)
//!     .with_garbage_spread(5)
//!     .with_max_requests(100);
//!
//! let dispatcher = DispatcherBuilder::new(config)
//!     .with_sink(InMemoryEventSink::new(1024))
//!     .start()?;
//!
//! assert!(dispatcher.wait_for_consumed(100, Duration::from_secs(5)));
//! let stats = dispatcher.stats();
//! assert_eq!(stats.claimed + stats.collected, 100);
//! dispatcher.shutdown();
//! # Ok::<(), triage_dispatch::core::DispatchError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Dispatch core: shared state, producer, workers, collector.
pub mod core;
/// Configuration models for the dispatcher.
pub mod config;
/// Builders to assemble and start a dispatcher.
pub mod builders;
/// Shared utilities.
pub mod util;
