//! Client configuration.
//!
//! [`ClientConfig`] is a plain struct whose [`Default`] carries every
//! documented default. With the `serde` feature it can be read from a
//! configuration file; missing fields keep their defaults and durations are
//! written in human form (`"30s"`, `"5m"`, `"100ms"`).

use resilient_call_retry::DEFAULT_RETRYABLE_STATUSES;
use std::time::Duration;

/// Everything a [`ResilientClient`](crate::ResilientClient) needs to build its pipeline.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClientConfig {
    /// Used in logs and as the name of the limiter, retry engine and cache.
    pub name: String,
    /// Upper bound on a single network attempt. Default: 30s.
    #[cfg_attr(feature = "serde", serde(with = "humantime_serde"))]
    pub request_timeout: Duration,
    pub retry: RetrySettings,
    pub circuit_breaker: CircuitBreakerSettings,
    pub cache: CacheSettings,
    pub rate_limit: RateLimitSettings,
    /// When false and no collector is injected, measurements are discarded.
    pub metrics_enabled: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: "resilient-call".to_string(),
            request_timeout: Duration::from_secs(30),
            retry: RetrySettings::default(),
            circuit_breaker: CircuitBreakerSettings::default(),
            cache: CacheSettings::default(),
            rate_limit: RateLimitSettings::default(),
            metrics_enabled: true,
        }
    }
}

/// Retry policy applied inside each breaker call.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RetrySettings {
    /// Total attempts, the first one included. Default: 3.
    pub max_attempts: usize,
    /// Default: 100ms.
    #[cfg_attr(feature = "serde", serde(with = "humantime_serde"))]
    pub initial_delay: Duration,
    /// Default: 30s.
    #[cfg_attr(feature = "serde", serde(with = "humantime_serde"))]
    pub max_delay: Duration,
    /// Default: 2.0.
    pub multiplier: f64,
    /// Inflate each delay by up to 10%. Default: true.
    pub jitter: bool,
    /// Default: 429, 500, 502, 503, 504.
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.to_vec(),
        }
    }
}

/// Settings shared by every per-target breaker.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CircuitBreakerSettings {
    /// Default: 5.
    pub max_failures: usize,
    /// Default: 60s.
    #[cfg_attr(feature = "serde", serde(with = "humantime_serde"))]
    pub open_timeout: Duration,
    /// Default: 3.
    pub max_half_open_probes: usize,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            max_failures: 5,
            open_timeout: Duration::from_secs(60),
            max_half_open_probes: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CacheSettings {
    /// Cache successful reads. Default: true.
    pub enabled: bool,
    /// Default: 5m.
    #[cfg_attr(feature = "serde", serde(with = "humantime_serde"))]
    pub ttl: Duration,
    /// Default: 5m.
    #[cfg_attr(feature = "serde", serde(with = "humantime_serde"))]
    pub sweep_interval: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RateLimitSettings {
    /// Requests allowed per refill interval. Default: 100.
    pub permits: usize,
    /// Default: 1s.
    #[cfg_attr(feature = "serde", serde(with = "humantime_serde"))]
    pub refill_interval: Duration,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            permits: 100,
            refill_interval: Duration::from_secs(1),
        }
    }
}
