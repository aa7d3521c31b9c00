//! Builder API for ergonomic breaker configuration

use crate::{
    BreakerError,
    callbacks::Callbacks,
    circuit::{Breaker, CircuitContext, Config},
    clock::{Clock, MonotonicClock},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Builder for creating breakers with fluent API
pub struct BreakerBuilder {
    name: String,
    config: Config,
    clock: Option<Arc<dyn Clock>>,
    callbacks: Callbacks,
}

impl BreakerBuilder {
    /// Create a new builder for a breaker with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: Config::default(),
            clock: None,
            callbacks: Callbacks::new(),
        }
    }

    /// Replace the whole configuration, e.g. one loaded from a config file
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Set the failure rate threshold (0.0-1.0)
    /// Circuit opens when a full window has (failures / total) >= this value
    pub fn failure_threshold(mut self, rate: f64) -> Self {
        self.config.failure_threshold = rate;
        self
    }

    /// Set how many recent outcomes the sliding window keeps
    pub fn window_size(mut self, size: usize) -> Self {
        self.config.window_size = size;
        self
    }

    /// Set the cooldown in seconds before Open moves to HalfOpen
    pub fn timeout_secs(mut self, seconds: f64) -> Self {
        self.config.timeout_secs = seconds;
        self
    }

    /// Set the cooldown as a `Duration`
    pub fn timeout(self, timeout: Duration) -> Self {
        self.timeout_secs(timeout.as_secs_f64())
    }

    /// Set the success threshold (successes needed to close from half-open)
    pub fn success_threshold(mut self, threshold: usize) -> Self {
        self.config.success_threshold = threshold;
        self
    }

    /// Set the jitter factor (0.0 = no jitter, 1.0 = full jitter)
    pub fn jitter_factor(mut self, factor: f64) -> Self {
        self.config.jitter_factor = factor;
        self
    }

    /// Use a custom time source (defaults to [`MonotonicClock`])
    ///
    /// # Examples
    ///
    /// ```rust
    /// use windowed_breaker::{Breaker, ManualClock};
    /// use std::sync::Arc;
    ///
    /// let clock = Arc::new(ManualClock::new());
    /// let breaker = Breaker::builder("search")
    ///     .timeout_secs(5.0)
    ///     .clock(clock.clone())
    ///     .build();
    ///
    /// breaker.force_open();
    /// clock.advance_secs(5.0);
    /// assert!(breaker.is_half_open());
    /// ```
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set callback for when circuit opens
    pub fn on_open<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callbacks.on_open = Some(Arc::new(f));
        self
    }

    /// Set callback for when circuit closes
    pub fn on_close<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callbacks.on_close = Some(Arc::new(f));
        self
    }

    /// Set callback for when circuit enters half-open
    pub fn on_half_open<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callbacks.on_half_open = Some(Arc::new(f));
        self
    }

    /// Build the breaker without validating the configuration
    pub fn build(self) -> Breaker {
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));

        let context = CircuitContext::new(self.name, self.config, clock);

        Breaker::with_context_and_callbacks(context, self.callbacks)
    }

    /// Validate the configuration, then build
    pub fn try_build(self) -> Result<Breaker, BreakerError> {
        if let Err(err) = self.config.validate() {
            debug!(circuit = %self.name, error = %err, "rejected breaker configuration");
            return Err(err);
        }

        Ok(self.build())
    }
}
