use crate::events::RateLimiterEvent;
use crate::RateLimiter;
use resilient_call_core::{ConfigError, EventListeners, FnListener};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Configuration for a [`RateLimiter`].
#[derive(Clone, Debug)]
pub struct RateLimiterConfig {
    pub(crate) name: String,
    pub(crate) capacity: usize,
    pub(crate) refill_interval: Duration,
    pub(crate) event_listeners: EventListeners<RateLimiterEvent>,
}

impl RateLimiterConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> RateLimiterConfigBuilder {
        RateLimiterConfigBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn refill_interval(&self) -> Duration {
        self.refill_interval
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            name: "<unnamed>".to_string(),
            capacity: 100,
            refill_interval: Duration::from_secs(1),
            event_listeners: EventListeners::new(),
        }
    }
}

/// Builder for [`RateLimiterConfig`].
pub struct RateLimiterConfigBuilder {
    config: RateLimiterConfig,
}

impl RateLimiterConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            config: RateLimiterConfig::default(),
        }
    }

    /// Names the limiter for events, logs and metrics labels.
    ///
    /// Default: `<unnamed>`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Permits available per refill interval.
    ///
    /// Default: 100
    pub fn capacity(mut self, permits: usize) -> Self {
        self.config.capacity = permits;
        self
    }

    /// How often the pool is topped back up to capacity.
    ///
    /// Default: 1 second
    pub fn refill_interval(mut self, interval: Duration) -> Self {
        self.config.refill_interval = interval;
        self
    }

    /// Registers a callback invoked with the wait time of each acquired permit.
    pub fn on_permit_acquired<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.config
            .event_listeners
            .add(FnListener::new(move |event: &RateLimiterEvent| {
                if let RateLimiterEvent::PermitAcquired { wait, .. } = event {
                    f(*wait);
                }
            }));
        self
    }

    /// Registers a callback invoked with the number of permits added by a refill.
    pub fn on_replenished<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.config
            .event_listeners
            .add(FnListener::new(move |event: &RateLimiterEvent| {
                if let RateLimiterEvent::Replenished { added, .. } = event {
                    f(*added);
                }
            }));
        self
    }

    /// Validates the settings and returns the configuration.
    pub fn build_config(self) -> Result<RateLimiterConfig, ConfigError> {
        if self.config.capacity == 0 {
            return Err(ConfigError::new("capacity", "must be at least 1"));
        }
        if self.config.capacity > Semaphore::MAX_PERMITS {
            return Err(ConfigError::new("capacity", "exceeds the semaphore permit limit"));
        }
        if self.config.refill_interval.is_zero() {
            return Err(ConfigError::new("refill_interval", "must be non-zero"));
        }
        Ok(self.config)
    }

    /// Validates the settings and builds a limiter.
    ///
    /// The replenisher is only started when called inside a Tokio runtime.
    pub fn build(self) -> Result<RateLimiter, ConfigError> {
        self.build_config().map(RateLimiter::new)
    }
}

impl Default for RateLimiterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
