use crate::backoff::ExponentialBackoff;
use crate::events::RetryEvent;
use crate::Retry;
use resilient_call_core::{ConfigError, EventListeners, FnListener};
use std::collections::BTreeSet;
use std::time::Duration;

/// Statuses retried by default: rate limiting and transient server errors.
pub const DEFAULT_RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Configuration for the retry engine. Immutable once built.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub(crate) name: String,
    pub(crate) max_attempts: usize,
    pub(crate) backoff: ExponentialBackoff,
    pub(crate) retryable_statuses: BTreeSet<u16>,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
}

impl RetryConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn backoff(&self) -> &ExponentialBackoff {
        &self.backoff
    }

    pub fn retryable_statuses(&self) -> &BTreeSet<u16> {
        &self.retryable_statuses
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            name: "<unnamed>".to_string(),
            max_attempts: 3,
            backoff: ExponentialBackoff::new(
                Duration::from_millis(100),
                Duration::from_secs(30),
                2.0,
                true,
            ),
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.into_iter().collect(),
            event_listeners: EventListeners::new(),
        }
    }
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            config: RetryConfig::default(),
        }
    }

    /// Names the engine for events, logs and metrics labels.
    ///
    /// Default: `<unnamed>`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Total attempts, including the first.
    ///
    /// Default: 3
    pub fn max_attempts(mut self, n: usize) -> Self {
        self.config.max_attempts = n;
        self
    }

    /// Delay after the first failed attempt.
    ///
    /// Default: 100ms
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.config.backoff.initial_delay = delay;
        self
    }

    /// Cap applied to the exponential delay (before jitter).
    ///
    /// Default: 30 seconds
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.config.backoff.max_delay = delay;
        self
    }

    /// Growth factor between consecutive delays.
    ///
    /// Default: 2.0
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.config.backoff.multiplier = multiplier;
        self
    }

    /// Stretch each delay by up to 10%.
    ///
    /// Default: true
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.config.backoff.jitter = enabled;
        self
    }

    /// Replaces the set of statuses considered transient.
    ///
    /// Default: 429, 500, 502, 503, 504
    pub fn retryable_statuses<I>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = u16>,
    {
        self.config.retryable_statuses = statuses.into_iter().collect();
        self
    }

    /// Registers a callback invoked before each retry with `(attempt, delay)`.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.config
            .event_listeners
            .add(FnListener::new(move |event: &RetryEvent| {
                if let RetryEvent::Retry { attempt, delay, .. } = event {
                    f(*attempt, *delay);
                }
            }));
        self
    }

    /// Registers a callback invoked with the attempt count on success.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.config
            .event_listeners
            .add(FnListener::new(move |event: &RetryEvent| {
                if let RetryEvent::Success { attempts, .. } = event {
                    f(*attempts);
                }
            }));
        self
    }

    /// Registers a callback invoked with the attempt count when retries run out.
    pub fn on_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.config
            .event_listeners
            .add(FnListener::new(move |event: &RetryEvent| {
                if let RetryEvent::Exhausted { attempts, .. } = event {
                    f(*attempts);
                }
            }));
        self
    }

    /// Validates the settings and returns the configuration.
    pub fn build_config(self) -> Result<RetryConfig, ConfigError> {
        if self.config.max_attempts == 0 {
            return Err(ConfigError::new("max_attempts", "must be at least 1"));
        }
        let multiplier = self.config.backoff.multiplier;
        if !multiplier.is_finite() || multiplier < 0.0 {
            return Err(ConfigError::new(
                "multiplier",
                "must be a finite, non-negative number",
            ));
        }
        Ok(self.config)
    }

    /// Validates the settings and builds the engine.
    pub fn build(self) -> Result<Retry, ConfigError> {
        self.build_config().map(Retry::new)
    }
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
