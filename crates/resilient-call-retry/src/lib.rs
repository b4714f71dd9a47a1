//! Retry engine with exponential backoff, one-sided jitter and
//! cancellation-aware waits.
//!
//! [`Retry::run`] drives an attempt function that classifies its own result
//! as [`Attempt::Success`], [`Attempt::Retryable`] or [`Attempt::Fatal`].
//! Retryable failures are retried up to `max_attempts` times in total, with
//! a backoff wait between attempts. The wait races a
//! [`CancellationToken`], so a cancelled caller never sleeps out a backoff.
//!
//! ```
//! use resilient_call_retry::{Attempt, RetryConfig, RetryError};
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let retry = RetryConfig::builder()
//!     .max_attempts(3)
//!     .initial_delay(Duration::from_millis(10))
//!     .build()
//!     .unwrap();
//!
//! let result: Result<u16, RetryError<u16>> = retry
//!     .run(&CancellationToken::new(), |attempt| async move {
//!         if attempt < 3 {
//!             Attempt::Retryable(503)
//!         } else {
//!             Attempt::Success(200)
//!         }
//!     })
//!     .await;
//! assert_eq!(result.unwrap(), 200);
//! # }
//! ```
//!
//! ## Feature Flags
//! - `metrics`: per-engine result counter and attempts histogram.
//! - `tracing`: logs each retry and terminal outcome.

#[cfg(feature = "metrics")]
use metrics::{counter, histogram};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

pub use backoff::{ExponentialBackoff, JITTER_FACTOR};
pub use config::{RetryConfig, RetryConfigBuilder, DEFAULT_RETRYABLE_STATUSES};
pub use error::RetryError;
pub use events::RetryEvent;

mod backoff;
mod config;
mod error;
mod events;

/// Result of a single attempt, as classified by the attempt function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T, F> {
    Success(T),
    /// Worth trying again after a backoff.
    Retryable(F),
    /// Not worth trying again; stops the loop immediately.
    Fatal(F),
}

/// The retry engine. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Retry {
    config: Arc<RetryConfig>,
}

impl Retry {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// True if `status` is in the configured retryable set.
    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.config.retryable_statuses.contains(&status)
    }

    /// The delay that would follow failed attempt `attempt`, without jitter.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        self.config.backoff.base_delay(attempt)
    }

    /// Runs `attempt_fn` with attempt numbers starting at 1 until it
    /// succeeds, fails fatally, runs out of attempts or `cancel` fires.
    pub async fn run<T, F, A, Fut>(
        &self,
        cancel: &CancellationToken,
        mut attempt_fn: A,
    ) -> Result<T, RetryError<F>>
    where
        A: FnMut(usize) -> Fut,
        Fut: Future<Output = Attempt<T, F>>,
    {
        let config = &self.config;
        let mut attempt = 1;

        loop {
            if cancel.is_cancelled() {
                return Err(self.cancelled(attempt - 1));
            }

            match attempt_fn(attempt).await {
                Attempt::Success(value) => {
                    config.event_listeners.emit(&RetryEvent::Success {
                        name: config.name.clone(),
                        timestamp: Instant::now(),
                        attempts: attempt,
                    });

                    #[cfg(feature = "metrics")]
                    self.record("success", attempt);

                    return Ok(value);
                }
                Attempt::Fatal(failure) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(retry = %config.name, attempt, "attempt failed with a non-retryable failure");

                    config.event_listeners.emit(&RetryEvent::Fatal {
                        name: config.name.clone(),
                        timestamp: Instant::now(),
                        attempts: attempt,
                    });

                    #[cfg(feature = "metrics")]
                    self.record("fatal", attempt);

                    return Err(RetryError::Fatal(failure));
                }
                Attempt::Retryable(failure) => {
                    if attempt >= config.max_attempts {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(retry = %config.name, attempts = attempt, "retries exhausted");

                        config.event_listeners.emit(&RetryEvent::Exhausted {
                            name: config.name.clone(),
                            timestamp: Instant::now(),
                            attempts: attempt,
                        });

                        #[cfg(feature = "metrics")]
                        self.record("exhausted", attempt);

                        return Err(RetryError::Exhausted {
                            attempts: attempt,
                            last: failure,
                        });
                    }

                    let delay = config.backoff.next_delay(attempt);

                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        retry = %config.name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "attempt failed, backing off"
                    );

                    config.event_listeners.emit(&RetryEvent::Retry {
                        name: config.name.clone(),
                        timestamp: Instant::now(),
                        attempt: attempt + 1,
                        delay,
                    });

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(self.cancelled(attempt)),
                        _ = tokio::time::sleep(delay) => {}
                    }

                    attempt += 1;
                }
            }
        }
    }

    fn cancelled<F>(&self, attempts: usize) -> RetryError<F> {
        #[cfg(feature = "tracing")]
        tracing::debug!(retry = %self.config.name, attempts, "retry cancelled");

        self.config.event_listeners.emit(&RetryEvent::Cancelled {
            name: self.config.name.clone(),
            timestamp: Instant::now(),
            attempts,
        });

        #[cfg(feature = "metrics")]
        self.record("cancelled", attempts);

        RetryError::Cancelled
    }

    #[cfg(feature = "metrics")]
    fn record(&self, result: &'static str, attempts: usize) {
        counter!("retry_calls_total", "retry" => self.config.name.clone(), "result" => result)
            .increment(1);
        histogram!("retry_attempts", "retry" => self.config.name.clone()).record(attempts as f64);
    }
}

impl Default for Retry {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}
