//! Consecutive-failure circuit breaker with a half-open probe budget.
//!
//! The breaker wraps any async operation. In the closed state every call
//! runs; after `max_failures` consecutive failures the breaker opens and
//! rejects calls outright until `open_timeout` has passed since the last
//! failure. The next call then moves it to half-open, where at most
//! `max_half_open_probes` calls are admitted. A single failing probe reopens
//! the breaker; `max_half_open_probes / 2` successful probes close it.
//!
//! ```
//! use resilient_call_circuitbreaker::{CircuitBreakerConfig, CircuitState};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let breaker = CircuitBreakerConfig::builder()
//!     .name("inventory")
//!     .max_failures(2)
//!     .open_timeout(Duration::from_secs(10))
//!     .build()
//!     .unwrap();
//!
//! for _ in 0..2 {
//!     let _ = breaker.execute(|| async { Err::<(), _>("down") }).await;
//! }
//! assert_eq!(breaker.state_sync(), CircuitState::Open);
//!
//! let err = breaker.execute(|| async { Ok::<_, &str>(()) }).await.unwrap_err();
//! assert!(err.is_open());
//! # }
//! ```
//!
//! The breaker's lock is only held while admitting a call and while
//! applying its result, never while the operation runs. Results from calls
//! admitted before a state change are discarded, and a call whose future is
//! dropped releases its half-open slot.
//!
//! ## Feature Flags
//! - `metrics`: call, rejection and transition counters plus a state gauge.
//! - `tracing`: logs rejections and state transitions.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

pub use circuit::{CircuitMetrics, CircuitState, Outcome};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use error::CircuitBreakerError;
pub use events::{CircuitBreakerEvent, RejectionReason};

use circuit::{Circuit, Ticket};

mod circuit;
mod config;
mod error;
mod events;

/// A circuit breaker guarding one downstream.
///
/// Cheap to clone; clones share state.
pub struct CircuitBreaker {
    circuit: Arc<Mutex<Circuit>>,
    state_atomic: Arc<AtomicU8>,
    config: Arc<CircuitBreakerConfig>,
}

impl CircuitBreaker {
    /// Creates a closed breaker from a validated configuration.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        let state_atomic = Arc::new(AtomicU8::new(CircuitState::Closed as u8));
        Self {
            circuit: Arc::new(Mutex::new(Circuit::new(Arc::clone(&state_atomic)))),
            state_atomic,
            config: Arc::new(config),
        }
    }

    /// Returns a breaker with the default configuration under `name`.
    pub fn with_defaults(name: impl Into<String>) -> Self {
        Self::new(CircuitBreakerConfig::default().with_name(name))
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Runs `operation` if the breaker admits it. `Err` counts as a failure.
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_classified(operation, |result| match result {
            Ok(_) => Outcome::Success,
            Err(_) => Outcome::Failure,
        })
        .await
    }

    /// Runs `operation` if admitted and applies `classify`'s verdict on the result.
    pub async fn execute_classified<T, E, F, Fut, C>(
        &self,
        operation: F,
        classify: C,
    ) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: FnOnce(&Result<T, E>) -> Outcome,
    {
        let admission = self.admit()?;
        let result = operation().await;
        admission.complete(classify(&result));
        result.map_err(CircuitBreakerError::Inner)
    }

    fn admit<E>(&self) -> Result<Admission<'_>, CircuitBreakerError<E>> {
        let acquired = self.circuit.lock().try_acquire(&self.config);
        match acquired {
            Ok(ticket) => Ok(Admission {
                breaker: self,
                ticket: Some(ticket),
            }),
            Err(reason) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(breaker = %self.config.name, ?reason, "circuit breaker rejected call");

                Err(match reason {
                    RejectionReason::Open => CircuitBreakerError::Open {
                        name: self.config.name.clone(),
                    },
                    RejectionReason::ProbesExhausted => CircuitBreakerError::TooManyProbes {
                        name: self.config.name.clone(),
                        max_probes: self.config.max_half_open_probes,
                    },
                })
            }
        }
    }

    /// Forces the breaker open, as if a failure had just happened.
    pub fn force_open(&self) {
        self.circuit.lock().force_open(&self.config);
    }

    /// Forces the breaker closed.
    pub fn force_closed(&self) {
        self.circuit.lock().force_closed(&self.config);
    }

    /// Closes the breaker and clears every counter.
    pub fn reset(&self) {
        self.circuit.lock().reset(&self.config);
    }

    /// Current state, read under the lock.
    pub fn state(&self) -> CircuitState {
        self.circuit.lock().state()
    }

    /// Current state without taking the lock.
    pub fn state_sync(&self) -> CircuitState {
        CircuitState::from_u8(self.state_atomic.load(Ordering::Acquire))
    }

    pub fn is_open(&self) -> bool {
        self.state_sync() == CircuitState::Open
    }

    /// Returns a snapshot of the breaker's counters.
    pub fn metrics(&self) -> CircuitMetrics {
        self.circuit.lock().metrics()
    }

    /// 503 while open, 200 otherwise.
    pub fn http_status(&self) -> u16 {
        match self.state_sync() {
            CircuitState::Closed | CircuitState::HalfOpen => 200,
            CircuitState::Open => 503,
        }
    }

    /// "healthy", "degraded" (half-open) or "unhealthy" (open).
    pub fn health_status(&self) -> &'static str {
        match self.state_sync() {
            CircuitState::Closed => "healthy",
            CircuitState::HalfOpen => "degraded",
            CircuitState::Open => "unhealthy",
        }
    }
}

impl Clone for CircuitBreaker {
    fn clone(&self) -> Self {
        Self {
            circuit: Arc::clone(&self.circuit),
            state_atomic: Arc::clone(&self.state_atomic),
            config: Arc::clone(&self.config),
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.config.name)
            .field("state", &self.state_sync())
            .finish()
    }
}

/// An admitted call. Dropping it unfinished releases its slot.
struct Admission<'a> {
    breaker: &'a CircuitBreaker,
    ticket: Option<Ticket>,
}

impl Admission<'_> {
    fn complete(mut self, outcome: Outcome) {
        if let Some(ticket) = self.ticket.take() {
            self.finish(ticket, outcome);
        }
    }

    fn finish(&self, ticket: Ticket, outcome: Outcome) {
        self.breaker
            .circuit
            .lock()
            .complete(ticket, outcome, &self.breaker.config);
    }
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            self.finish(ticket, Outcome::Ignored);
        }
    }
}
