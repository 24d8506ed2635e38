//! Builder to construct and start a dispatcher from configuration.

use crate::config::DispatchConfig;
use crate::core::{
    Dispatcher, DispatchError, EventLog, EventSink, NoopHandler, RequestHandler, TargetSource,
    TracingEventSink, UniformTargets,
};

/// Assembles a [`Dispatcher`] from configuration, a sink, a handler and a
/// target source.
///
/// Defaults: events go to `tracing`, claimed requests are dropped, and the
/// producer draws uniform targets from `[0, N + G)`.
pub struct DispatcherBuilder<H: RequestHandler = NoopHandler> {
    config: DispatchConfig,
    sink: Option<Box<dyn EventSink>>,
    handler: H,
    source: Option<Box<dyn TargetSource>>,
    producer: bool,
}

impl DispatcherBuilder<NoopHandler> {
    /// Start from a configuration.
    #[must_use]
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            sink: None,
            handler: NoopHandler,
            source: None,
            producer: true,
        }
    }
}

impl<H: RequestHandler> DispatcherBuilder<H> {
    /// Send dispatch events to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Hand claimed and collected requests to `handler`.
    #[must_use]
    pub fn with_handler<H2: RequestHandler>(self, handler: H2) -> DispatcherBuilder<H2> {
        DispatcherBuilder {
            config: self.config,
            sink: self.sink,
            handler,
            source: self.source,
            producer: self.producer,
        }
    }

    /// Produce targets from `source` instead of the uniform default.
    #[must_use]
    pub fn with_targets(mut self, source: impl TargetSource) -> Self {
        self.source = Some(Box::new(source));
        self.producer = true;
        self
    }

    /// Do not start a producer; requests arrive only through
    /// [`Dispatcher::submit`].
    #[must_use]
    pub fn without_producer(mut self) -> Self {
        self.source = None;
        self.producer = false;
        self
    }

    /// Validate the configuration and start all dispatch threads.
    ///
    /// # Errors
    ///
    /// - `DispatchError::InvalidConfig` if the configuration is invalid
    /// - `DispatchError::Spawn` if a thread cannot be started
    pub fn start(self) -> Result<Dispatcher, DispatchError> {
        self.config.validate().map_err(DispatchError::InvalidConfig)?;

        let sink = self.sink.unwrap_or_else(|| Box::new(TracingEventSink));
        let source = if self.producer {
            Some(self.source.unwrap_or_else(|| {
                Box::new(UniformTargets::new(
                    self.config.worker_count,
                    self.config.garbage_spread,
                    self.config.seed,
                ))
            }))
        } else {
            None
        };

        Dispatcher::start(self.config, EventLog::new(sink), self.handler, source)
    }
}
