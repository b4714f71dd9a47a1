use crate::events::CircuitBreakerEvent;
use crate::{CircuitBreaker, CircuitState};
use resilient_call_core::{ConfigError, EventListener, EventListeners, FnListener};
use std::time::Duration;

/// Configuration for a [`CircuitBreaker`].
///
/// Cloning a config clones its listener registry, so a single config can act
/// as a template for many breakers that only differ by name.
#[derive(Clone, Debug)]
pub struct CircuitBreakerConfig {
    pub(crate) name: String,
    pub(crate) max_failures: usize,
    pub(crate) open_timeout: Duration,
    pub(crate) max_half_open_probes: usize,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
}

impl CircuitBreakerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Returns a copy of this config under a different name.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Registers an additional listener on this config.
    pub fn add_listener<L>(&mut self, listener: L)
    where
        L: EventListener<CircuitBreakerEvent> + 'static,
    {
        self.event_listeners.add(listener);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_failures(&self) -> usize {
        self.max_failures
    }

    pub fn open_timeout(&self) -> Duration {
        self.open_timeout
    }

    pub fn max_half_open_probes(&self) -> usize {
        self.max_half_open_probes
    }

    /// Successes needed in half-open before the breaker closes.
    ///
    /// Integer division: with 3 probes the breaker closes after 1 success.
    pub fn half_open_close_threshold(&self) -> usize {
        self.max_half_open_probes / 2
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            name: "<unnamed>".to_string(),
            max_failures: 5,
            open_timeout: Duration::from_secs(60),
            max_half_open_probes: 3,
            event_listeners: EventListeners::new(),
        }
    }
}

/// Builder for [`CircuitBreakerConfig`].
pub struct CircuitBreakerConfigBuilder {
    config: CircuitBreakerConfig,
}

impl CircuitBreakerConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            config: CircuitBreakerConfig::default(),
        }
    }

    /// Names the breaker for events, logs and metrics labels.
    ///
    /// Default: `<unnamed>`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Consecutive failures in the closed state that open the breaker.
    ///
    /// Default: 5
    pub fn max_failures(mut self, n: usize) -> Self {
        self.config.max_failures = n;
        self
    }

    /// How long the breaker stays open after the most recent failure.
    ///
    /// Default: 60 seconds
    pub fn open_timeout(mut self, timeout: Duration) -> Self {
        self.config.open_timeout = timeout;
        self
    }

    /// Calls admitted while half-open before further calls are rejected.
    ///
    /// Default: 3
    pub fn max_half_open_probes(mut self, n: usize) -> Self {
        self.config.max_half_open_probes = n;
        self
    }

    /// Registers a callback for state transitions.
    ///
    /// Called with `(from, to)` while the breaker's lock is held, so the
    /// callback must not call back into the same breaker.
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.config
            .event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::StateTransition {
                    from_state,
                    to_state,
                    ..
                } = event
                {
                    f(*from_state, *to_state);
                }
            }));
        self
    }

    /// Registers a callback for admitted calls, with the state they were admitted in.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.config
            .event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::CallPermitted { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Registers a callback for rejected calls.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.config
            .event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if matches!(event, CircuitBreakerEvent::CallRejected { .. }) {
                    f();
                }
            }));
        self
    }

    /// Registers a callback for failures applied to the counters.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.config
            .event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::FailureRecorded { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Validates the settings and returns the configuration.
    pub fn build_config(self) -> Result<CircuitBreakerConfig, ConfigError> {
        if self.config.max_failures == 0 {
            return Err(ConfigError::new("max_failures", "must be at least 1"));
        }
        if self.config.max_half_open_probes == 0 {
            return Err(ConfigError::new("max_half_open_probes", "must be at least 1"));
        }
        Ok(self.config)
    }

    /// Validates the settings and builds a breaker.
    pub fn build(self) -> Result<CircuitBreaker, ConfigError> {
        self.build_config().map(CircuitBreaker::new)
    }
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
