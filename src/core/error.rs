//! Error types for dispatch operations.

use std::time::Duration;

use thiserror::Error;

use super::request::WorkerId;

/// Errors produced by dispatch components.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Channel is at capacity and the caller asked not to block.
    #[error("channel full")]
    ChannelFull,
    /// Channel stayed full for the whole wait.
    #[error("enqueue timed out after {0:?}")]
    EnqueueTimeout(Duration),
    /// Dispatcher has been shut down.
    #[error("dispatcher shut down")]
    Shutdown,
    /// Worker id outside the configured pool.
    #[error("unknown worker {0}")]
    UnknownWorker(WorkerId),
    /// A dispatch thread could not be spawned.
    #[error("failed to spawn thread: {0}")]
    Spawn(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
