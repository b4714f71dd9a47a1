use crate::events::CacheEvent;
use crate::ResponseCache;
use resilient_call_core::{ConfigError, EventListeners, FnListener};
use std::time::Duration;

/// Configuration for a [`ResponseCache`].
#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub(crate) name: String,
    pub(crate) default_ttl: Duration,
    pub(crate) sweep_interval: Duration,
    pub(crate) event_listeners: EventListeners<CacheEvent>,
}

impl CacheConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: "<unnamed>".to_string(),
            default_ttl: Duration::from_secs(5 * 60),
            sweep_interval: Duration::from_secs(5 * 60),
            event_listeners: EventListeners::new(),
        }
    }
}

/// Builder for [`CacheConfig`].
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            config: CacheConfig::default(),
        }
    }

    /// Names the cache for events, logs and metrics labels.
    ///
    /// Default: `<unnamed>`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// TTL used by [`ResponseCache::insert`].
    ///
    /// Default: 5 minutes
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.config.default_ttl = ttl;
        self
    }

    /// How often the background sweeper evicts expired entries.
    ///
    /// Default: 5 minutes
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    /// Registers a callback invoked with the key of every hit.
    pub fn on_hit<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.config
            .event_listeners
            .add(FnListener::new(move |event: &CacheEvent| {
                if let CacheEvent::Hit { key, .. } = event {
                    f(key);
                }
            }));
        self
    }

    /// Registers a callback invoked with the key of every miss.
    pub fn on_miss<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.config
            .event_listeners
            .add(FnListener::new(move |event: &CacheEvent| {
                if let CacheEvent::Miss { key, .. } = event {
                    f(key);
                }
            }));
        self
    }

    /// Registers a callback invoked with the eviction count of every sweep.
    pub fn on_sweep<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.config
            .event_listeners
            .add(FnListener::new(move |event: &CacheEvent| {
                if let CacheEvent::Swept { evicted, .. } = event {
                    f(*evicted);
                }
            }));
        self
    }

    /// Validates the settings and returns the configuration.
    pub fn build_config(self) -> Result<CacheConfig, ConfigError> {
        if self.config.sweep_interval.is_zero() {
            return Err(ConfigError::new("sweep_interval", "must be non-zero"));
        }
        Ok(self.config)
    }

    /// Validates the settings and builds a cache.
    ///
    /// The sweeper is only started when called inside a Tokio runtime.
    pub fn build(self) -> Result<ResponseCache, ConfigError> {
        self.build_config().map(ResponseCache::new)
    }
}

impl Default for CacheConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
