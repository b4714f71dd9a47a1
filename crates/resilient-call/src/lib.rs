//! Resilient outbound calls.
//!
//! A [`ResilientClient`] wraps a transport (any [`tower::Service`] that
//! performs one network attempt) and runs every call through the same
//! lifecycle:
//!
//! 1. validation; malformed requests fail before anything else happens
//! 2. for reads (GET, HEAD), a response cache lookup keyed by `METHOD:target`
//! 3. a rate limiter permit, waiting if the pool is empty
//! 4. the circuit breaker of the target's authority (`scheme://host[:port]`)
//! 5. the retry loop, each attempt bounded by the request timeout
//! 6. for successful reads, a cache write
//!
//! Counts and latencies are reported to a
//! [`MetricsCollector`](resilient_call_metrics::MetricsCollector) along the
//! way. Every failure is a [`CallError`], so callers can branch on
//! [`CallError::kind`] to decide what to do.
//!
//! ```rust
//! use resilient_call::{CallError, ClientConfig, ResilientClient, TransportRequest, TransportResponse};
//! use tower::service_fn;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = service_fn(|req: TransportRequest| async move {
//!     // A real transport would perform the HTTP exchange here.
//!     Ok::<_, std::io::Error>(TransportResponse::new(200, format!("hello from {}", req.target)))
//! });
//!
//! let client = ResilientClient::builder()
//!     .config(ClientConfig::default())
//!     .build(transport)?;
//!
//! match client.get("https://api.example.com/items").await {
//!     Ok(response) => println!("{} bytes", response.body.len()),
//!     Err(CallError::CircuitOpen { name }) => println!("{name} is down, using fallback"),
//!     Err(other) => return Err(other.into()),
//! }
//!
//! client.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! ## Sharing state
//!
//! The cache and the metrics collector are injected, never global. Pass the
//! same instances to several builders to share them:
//!
//! ```rust
//! use resilient_call::{InMemoryMetrics, ResilientClient, ResponseCache};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let cache = ResponseCache::default();
//! let metrics = Arc::new(InMemoryMetrics::new());
//!
//! let builder = || {
//!     ResilientClient::builder()
//!         .with_cache(cache.clone())
//!         .with_metrics(metrics.clone())
//! };
//! # let _ = builder;
//! # }
//! ```
//!
//! ## Feature Flags
//! - `tracing`: logs each completed request at info and each failure at
//!   warn, and enables logging in every pattern crate.
//! - `metrics`: exports pattern metrics and collector series through the
//!   `metrics` facade.
//! - `serde`: [`ClientConfig`] (de)serialization.

pub use client::{ResilientClient, ResilientClientBuilder, TransportErrorClassifier};
pub use config::{
    CacheSettings, CircuitBreakerSettings, ClientConfig, RateLimitSettings, RetrySettings,
};
pub use layer::ResilientClientLayer;
pub use request::{
    CallRequest, CallResponse, Method, ResponseSource, TransportRequest, TransportResponse,
    UnknownMethod,
};
pub use validation::target_authority;

pub use resilient_call_cache::{CacheStats, ResponseCache};
pub use resilient_call_circuitbreaker::{CircuitBreaker, CircuitMetrics, CircuitState};
pub use resilient_call_core::{AttemptFailure, CallError, ConfigError, ErrorKind};
pub use resilient_call_metrics::{InMemoryMetrics, MetricsCollector, MetricsSnapshot, NoopMetrics};
pub use tokio_util::sync::CancellationToken;

mod breakers;
mod client;
mod config;
mod layer;
mod request;
mod validation;
