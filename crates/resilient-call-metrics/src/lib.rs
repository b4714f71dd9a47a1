//! Metrics collection for the resilient-call pipeline.
//!
//! The client reports what happens to each request through a
//! [`MetricsCollector`]: HTTP outcomes and latency, cache hits and misses,
//! retry attempts and circuit breaker state changes. The collector is a
//! passive sink, injected into the client rather than looked up globally.
//!
//! Two implementations ship with the crate:
//! - [`InMemoryMetrics`]: aggregates every series in memory and hands out
//!   point-in-time [`MetricsSnapshot`]s
//! - [`NoopMetrics`]: discards everything
//!
//! ```
//! use resilient_call_metrics::{InMemoryMetrics, MetricsCollector};
//!
//! let metrics = InMemoryMetrics::new();
//! metrics.record_cache_hit("responses");
//! metrics.record_cache_miss("responses");
//! metrics.increment_counter("jobs_total", &[("queue", "email"), ("result", "ok")]);
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.counter("cache_hits_total", &[("cache", "responses")]), 1);
//! // Tag order does not matter.
//! assert_eq!(snapshot.counter("jobs_total", &[("result", "ok"), ("queue", "email")]), 1);
//! ```
//!
//! ## Series
//!
//! | Name | Kind | Tags |
//! |---|---|---|
//! | `http_requests_total` | counter | `endpoint`, `method`, `status` |
//! | `http_request_duration_ms` | histogram | `endpoint`, `method` |
//! | `cache_hits_total` | counter | `cache` |
//! | `cache_misses_total` | counter | `cache` |
//! | `retry_attempts_total` | counter | `operation`, `attempt` |
//! | `circuit_breaker_state` | gauge | `name`, `state` |
//!
//! ## Feature Flags
//! - `metrics`: [`InMemoryMetrics`] also forwards every record to the
//!   `metrics` facade.

use std::time::Duration;

pub use key::series_key;
pub use memory::{InMemoryMetrics, MetricsSnapshot};

mod key;
mod memory;

/// Sink for pipeline measurements.
///
/// Implementors provide the three primitives; the convenience methods fix
/// the series names and tags the client uses and can be overridden to
/// route them elsewhere.
pub trait MetricsCollector: Send + Sync {
    /// Adds one to the counter series.
    fn increment_counter(&self, name: &str, tags: &[(&str, &str)]);

    /// Appends a sample to the histogram series.
    fn record_histogram(&self, name: &str, value: f64, tags: &[(&str, &str)]);

    /// Sets the gauge series to `value`.
    fn record_gauge(&self, name: &str, value: f64, tags: &[(&str, &str)]);

    /// Records one completed request. `status` is 0 when no response was
    /// received.
    fn record_http_request(&self, method: &str, endpoint: &str, status: u16, duration: Duration) {
        let status = status.to_string();
        self.increment_counter(
            "http_requests_total",
            &[("method", method), ("endpoint", endpoint), ("status", &status)],
        );
        self.record_histogram(
            "http_request_duration_ms",
            duration.as_micros() as f64 / 1000.0,
            &[("method", method), ("endpoint", endpoint)],
        );
    }

    fn record_cache_hit(&self, cache: &str) {
        self.increment_counter("cache_hits_total", &[("cache", cache)]);
    }

    fn record_cache_miss(&self, cache: &str) {
        self.increment_counter("cache_misses_total", &[("cache", cache)]);
    }

    /// Records a retry, i.e. an attempt numbered 2 or above.
    fn record_retry_attempt(&self, operation: &str, attempt: usize) {
        let attempt = attempt.to_string();
        self.increment_counter(
            "retry_attempts_total",
            &[("operation", operation), ("attempt", &attempt)],
        );
    }

    /// Marks `state` as the current state of breaker `name`.
    fn record_circuit_breaker_state(&self, name: &str, state: &str) {
        self.record_gauge("circuit_breaker_state", 1.0, &[("name", name), ("state", state)]);
    }
}

/// Discards every measurement.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsCollector for NoopMetrics {
    fn increment_counter(&self, _name: &str, _tags: &[(&str, &str)]) {}

    fn record_histogram(&self, _name: &str, _value: f64, _tags: &[(&str, &str)]) {}

    fn record_gauge(&self, _name: &str, _value: f64, _tags: &[(&str, &str)]) {}
}

impl<M: MetricsCollector + ?Sized> MetricsCollector for std::sync::Arc<M> {
    fn increment_counter(&self, name: &str, tags: &[(&str, &str)]) {
        (**self).increment_counter(name, tags)
    }

    fn record_histogram(&self, name: &str, value: f64, tags: &[(&str, &str)]) {
        (**self).record_histogram(name, value, tags)
    }

    fn record_gauge(&self, name: &str, value: f64, tags: &[(&str, &str)]) {
        (**self).record_gauge(name, value, tags)
    }

    fn record_http_request(&self, method: &str, endpoint: &str, status: u16, duration: Duration) {
        (**self).record_http_request(method, endpoint, status, duration)
    }

    fn record_cache_hit(&self, cache: &str) {
        (**self).record_cache_hit(cache)
    }

    fn record_cache_miss(&self, cache: &str) {
        (**self).record_cache_miss(cache)
    }

    fn record_retry_attempt(&self, operation: &str, attempt: usize) {
        (**self).record_retry_attempt(operation, attempt)
    }

    fn record_circuit_breaker_state(&self, name: &str, state: &str) {
        (**self).record_circuit_breaker_state(name, state)
    }
}
