//! Dispatcher configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Prefix of the environment variables read by [`DispatchConfig::from_env`].
pub const ENV_PREFIX: &str = "TRIAGE_";

/// Dispatcher configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Number of consumer workers (N); also the decision vector length.
    pub worker_count: usize,
    /// Extra target identifiers beyond the pool (G) that match no worker.
    pub garbage_spread: usize,
    /// Channel capacity; `None` means `worker_count`.
    pub channel_capacity: Option<usize>,
    /// How long the producer may block on a full channel before warning.
    pub backpressure_warn_ms: u64,
    /// Pause between produced requests.
    pub dispatch_interval_ms: u64,
    /// Stop producing after this many accepted requests.
    pub max_requests: Option<u64>,
    /// Stack size for each dispatch thread, in bytes.
    pub thread_stack_size: usize,
    /// Seed for target selection; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            worker_count: 5,
            garbage_spread: 5,
            channel_capacity: None,
            backpressure_warn_ms: 1000,
            dispatch_interval_ms: 0,
            max_requests: None,
            thread_stack_size: 256 * 1024,
            seed: None,
        }
    }
}

impl DispatchConfig {
    /// Default configuration: five workers, five garbage identifiers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker count.
    #[must_use]
    pub const fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the garbage identifier spread.
    #[must_use]
    pub const fn with_garbage_spread(mut self, garbage_spread: usize) -> Self {
        self.garbage_spread = garbage_spread;
        self
    }

    /// Set an explicit channel capacity.
    #[must_use]
    pub const fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = Some(capacity);
        self
    }

    /// Set the backpressure warning threshold.
    #[must_use]
    pub const fn with_backpressure_warn_ms(mut self, ms: u64) -> Self {
        self.backpressure_warn_ms = ms;
        self
    }

    /// Set the pause between produced requests.
    #[must_use]
    pub const fn with_dispatch_interval_ms(mut self, ms: u64) -> Self {
        self.dispatch_interval_ms = ms;
        self
    }

    /// Limit the number of produced requests.
    #[must_use]
    pub const fn with_max_requests(mut self, max: u64) -> Self {
        self.max_requests = Some(max);
        self
    }

    /// Set the dispatch thread stack size.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = bytes;
        self
    }

    /// Seed target selection.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Channel capacity after applying the `worker_count` default.
    #[must_use]
    pub fn effective_capacity(&self) -> usize {
        self.channel_capacity.unwrap_or(self.worker_count)
    }

    /// Backpressure warning threshold.
    #[must_use]
    pub const fn backpressure_warn(&self) -> Duration {
        Duration::from_millis(self.backpressure_warn_ms)
    }

    /// Pause between produced requests.
    #[must_use]
    pub const fn dispatch_interval(&self) -> Duration {
        Duration::from_millis(self.dispatch_interval_ms)
    }

    /// Exclusive upper bound of produced targets, or `None` if
    /// `worker_count + garbage_spread` does not fit in a `usize`.
    #[must_use]
    pub const fn target_range(&self) -> Option<usize> {
        self.worker_count.checked_add(self.garbage_spread)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".into());
        }
        if self.garbage_spread == 0 {
            return Err("garbage_spread must be greater than 0".into());
        }
        if self.target_range().is_none() {
            return Err("worker_count + garbage_spread overflows the target range".into());
        }
        if self.effective_capacity() == 0 {
            return Err("channel_capacity must be greater than 0".into());
        }
        if self.thread_stack_size == 0 {
            return Err("thread_stack_size must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from `TRIAGE_*` environment variables, after
    /// loading a `.env` file if one exists. Unset variables keep defaults.
    ///
    /// # Errors
    ///
    /// Returns a description of an unparsable variable or validation failure.
    pub fn from_env() -> Result<Self, String> {
        // Missing .env is fine.
        let _ = dotenvy::dotenv();
        Self::from_vars(std::env::vars())
    }

    /// Build configuration from `(name, value)` pairs, as read from the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns a description of an unparsable variable or validation failure.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut cfg = Self::default();
        for (key, value) in vars {
            let Some(name) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.as_ref().trim();
            match name {
                "WORKER_COUNT" => cfg.worker_count = parse(name, value)?,
                "GARBAGE_SPREAD" => cfg.garbage_spread = parse(name, value)?,
                "CHANNEL_CAPACITY" => cfg.channel_capacity = Some(parse(name, value)?),
                "BACKPRESSURE_WARN_MS" => cfg.backpressure_warn_ms = parse(name, value)?,
                "DISPATCH_INTERVAL_MS" => cfg.dispatch_interval_ms = parse(name, value)?,
                "MAX_REQUESTS" => cfg.max_requests = Some(parse(name, value)?),
                "THREAD_STACK_SIZE" => cfg.thread_stack_size = parse(name, value)?,
                "SEED" => cfg.seed = Some(parse(name, value)?),
                _ => {}
            }
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| format!("{ENV_PREFIX}{name}={value:?}: {e}"))
}
