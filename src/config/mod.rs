//! Configuration models for the dispatcher.

pub mod dispatch;

pub use dispatch::{DispatchConfig, ENV_PREFIX};
