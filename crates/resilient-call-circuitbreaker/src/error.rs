use resilient_call_core::CallError;
use thiserror::Error;

/// Errors returned by [`CircuitBreaker::execute`](crate::CircuitBreaker::execute).
#[derive(Debug, Error)]
pub enum CircuitBreakerError<E> {
    /// The breaker is open; the operation was not run.
    #[error("circuit breaker '{name}' is open")]
    Open { name: String },

    /// The breaker is half-open and all probe slots are in use.
    #[error("circuit breaker '{name}' is half-open with all {max_probes} probes in use")]
    TooManyProbes { name: String, max_probes: usize },

    /// The operation ran and returned an error.
    #[error("{0}")]
    Inner(E),
}

impl<E> CircuitBreakerError<E> {
    /// True if the breaker turned the call away without running it.
    pub fn is_rejected(&self) -> bool {
        !matches!(self, CircuitBreakerError::Inner(_))
    }

    pub fn is_open(&self) -> bool {
        matches!(self, CircuitBreakerError::Open { .. })
    }

    pub fn is_too_many_probes(&self) -> bool {
        matches!(self, CircuitBreakerError::TooManyProbes { .. })
    }

    /// Returns the operation's error, if it ran.
    pub fn into_inner(self) -> Option<E> {
        match self {
            CircuitBreakerError::Inner(e) => Some(e),
            _ => None,
        }
    }
}

impl<E> From<CircuitBreakerError<CallError<E>>> for CallError<E> {
    fn from(err: CircuitBreakerError<CallError<E>>) -> Self {
        match err {
            CircuitBreakerError::Open { name } => CallError::CircuitOpen { name },
            CircuitBreakerError::TooManyProbes { name, max_probes } => {
                CallError::TooManyProbes { name, max_probes }
            }
            CircuitBreakerError::Inner(inner) => inner,
        }
    }
}
