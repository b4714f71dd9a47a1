use crate::config::CircuitBreakerSettings;
use parking_lot::RwLock;
use resilient_call_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerEvent};
use resilient_call_core::{ConfigError, FnListener};
use resilient_call_metrics::MetricsCollector;
use std::collections::HashMap;
use std::sync::Arc;

/// One breaker per downstream authority, created on first use and kept for
/// the lifetime of the registry.
pub(crate) struct BreakerRegistry {
    template: CircuitBreakerConfig,
    breakers: RwLock<HashMap<String, CircuitBreaker>>,
    metrics: Arc<dyn MetricsCollector>,
}

impl BreakerRegistry {
    pub(crate) fn new(
        settings: &CircuitBreakerSettings,
        metrics: Arc<dyn MetricsCollector>,
    ) -> Result<Self, ConfigError> {
        let mut template = CircuitBreakerConfig::builder()
            .max_failures(settings.max_failures)
            .open_timeout(settings.open_timeout)
            .max_half_open_probes(settings.max_half_open_probes)
            .build_config()?;

        // The state gauge reads 1 for the current state and 0 for the one just left.
        let sink = Arc::clone(&metrics);
        template.add_listener(FnListener::new(move |event: &CircuitBreakerEvent| {
            if let CircuitBreakerEvent::StateTransition {
                name,
                from_state,
                to_state,
                ..
            } = event
            {
                sink.record_gauge(
                    "circuit_breaker_state",
                    0.0,
                    &[("name", name.as_str()), ("state", from_state.as_str())],
                );
                sink.record_circuit_breaker_state(name, to_state.as_str());
            }
        }));

        Ok(Self {
            template,
            breakers: RwLock::new(HashMap::new()),
            metrics,
        })
    }

    pub(crate) fn get_or_create(&self, authority: &str) -> CircuitBreaker {
        if let Some(breaker) = self.breakers.read().get(authority) {
            return breaker.clone();
        }

        let mut breakers = self.breakers.write();
        breakers
            .entry(authority.to_string())
            .or_insert_with(|| {
                #[cfg(feature = "tracing")]
                tracing::debug!(breaker = %authority, "creating circuit breaker");

                self.metrics
                    .record_circuit_breaker_state(authority, "closed");
                CircuitBreaker::new(self.template.with_name(authority))
            })
            .clone()
    }

    pub(crate) fn get(&self, authority: &str) -> Option<CircuitBreaker> {
        self.breakers.read().get(authority).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.breakers.read().len()
    }
}
