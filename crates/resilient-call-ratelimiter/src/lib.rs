//! Token-pool rate limiter.
//!
//! The pool starts with `capacity` permits and a background task tops it
//! back up to `capacity` once per `refill_interval`. Each call consumes one
//! permit; [`Permit::release`] hands it back early, never growing the pool
//! past capacity. Waiting for a permit races the caller's
//! [`CancellationToken`], and cancellation wins ties.
//!
//! ```
//! use resilient_call_ratelimiter::RateLimiterConfig;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let limiter = RateLimiterConfig::builder()
//!     .name("outbound")
//!     .capacity(2)
//!     .build()
//!     .unwrap();
//!
//! let cancel = CancellationToken::new();
//! let _a = limiter.acquire(&cancel).await.unwrap();
//! let _b = limiter.acquire(&cancel).await.unwrap();
//! assert!(limiter.try_acquire().is_none());
//! limiter.shutdown();
//! # }
//! ```
//!
//! ## Feature Flags
//! - `metrics`: permit results, wait-time histogram and an availability gauge.
//! - `tracing`: logs cancellations, refills and shutdown.

use crate::limiter::TokenPool;
#[cfg(feature = "metrics")]
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

pub use config::{RateLimiterConfig, RateLimiterConfigBuilder};
pub use error::RateLimiterError;
pub use events::RateLimiterEvent;

mod config;
mod error;
mod events;
mod limiter;

/// A shared rate limiter. Clones draw from the same pool.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    pool: Arc<TokenPool>,
}

impl RateLimiter {
    /// Creates a full pool and, inside a Tokio runtime, starts its replenisher.
    pub fn new(config: RateLimiterConfig) -> Self {
        let pool = Arc::new(TokenPool::new(config));

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(limiter::replenish_loop(
                Arc::downgrade(&pool),
                pool.shutdown.clone(),
            ));
        } else {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                ratelimiter = %pool.config.name,
                "no Tokio runtime; permits will only be replenished manually"
            );
        }

        Self { pool }
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.pool.config
    }

    /// Waits for a permit. Cancellation is checked first and consumes nothing.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<Permit, RateLimiterError> {
        let started = tokio::time::Instant::now();

        let taken = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            taken = self.pool.take() => Some(taken),
        };
        let wait = started.elapsed();

        match taken {
            Some(Ok(())) => {
                self.pool.config.event_listeners.emit(&RateLimiterEvent::PermitAcquired {
                    name: self.pool.config.name.clone(),
                    timestamp: Instant::now(),
                    wait,
                });
                self.record("permitted", Some(wait));
                Ok(self.permit())
            }
            Some(Err(_)) => {
                self.record("closed", None);
                Err(RateLimiterError::Closed)
            }
            None => {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    ratelimiter = %self.pool.config.name,
                    wait_ms = wait.as_millis() as u64,
                    "cancelled while waiting for a permit"
                );

                self.pool.config.event_listeners.emit(&RateLimiterEvent::AcquireCancelled {
                    name: self.pool.config.name.clone(),
                    timestamp: Instant::now(),
                    wait,
                });
                self.record("cancelled", None);
                Err(RateLimiterError::Cancelled)
            }
        }
    }

    /// Takes a permit if one is available right now.
    pub fn try_acquire(&self) -> Option<Permit> {
        self.pool.try_take().ok()?;
        self.record("permitted", Some(Duration::ZERO));
        Some(self.permit())
    }

    /// Tops the pool back up to capacity, returning the number of permits added.
    ///
    /// This is what the background task runs every interval.
    pub fn replenish(&self) -> usize {
        self.pool.refill()
    }

    /// Permits that can be acquired without waiting.
    pub fn available_permits(&self) -> usize {
        self.pool.available()
    }

    pub fn capacity(&self) -> usize {
        self.pool.config.capacity
    }

    /// Stops the replenisher and fails all waiters with [`RateLimiterError::Closed`].
    ///
    /// Safe to call more than once.
    pub fn shutdown(&self) {
        self.pool.close();
    }

    pub fn is_shutdown(&self) -> bool {
        self.pool.shutdown.is_cancelled()
    }

    fn permit(&self) -> Permit {
        Permit {
            pool: Arc::clone(&self.pool),
        }
    }

    #[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
    fn record(&self, result: &'static str, wait: Option<Duration>) {
        #[cfg(feature = "metrics")]
        {
            counter!(
                "ratelimiter_calls_total",
                "ratelimiter" => self.pool.config.name.clone(),
                "result" => result
            )
            .increment(1);
            if let Some(wait) = wait {
                histogram!(
                    "ratelimiter_wait_duration_seconds",
                    "ratelimiter" => self.pool.config.name.clone()
                )
                .record(wait.as_secs_f64());
            }
        }
    }
}

/// A consumed token.
///
/// Dropping a permit keeps it consumed; the pool only regains it on the
/// next refill. Call [`Permit::release`] to return it immediately.
#[derive(Debug)]
#[must_use = "a permit is consumed as soon as it is acquired"]
pub struct Permit {
    pool: Arc<TokenPool>,
}

impl Permit {
    /// Returns the permit to the pool. Returns false if the pool was
    /// already full or shut down.
    pub fn release(self) -> bool {
        self.pool.give_back()
    }
}
