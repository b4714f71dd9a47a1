use resilient_call_core::{AttemptFailure, CallError};
use thiserror::Error;

/// Terminal outcome of [`Retry::run`](crate::Retry::run) when no attempt succeeded.
#[derive(Debug, Error)]
pub enum RetryError<F> {
    /// All attempts failed with retryable failures.
    #[error("retries exhausted after {attempts} attempts")]
    Exhausted { attempts: usize, last: F },

    /// An attempt failed with a non-retryable failure.
    #[error("non-retryable failure")]
    Fatal(F),

    /// The cancellation token fired.
    #[error("cancelled")]
    Cancelled,
}

impl<F> RetryError<F> {
    /// The last observed failure, unless cancelled.
    pub fn into_failure(self) -> Option<F> {
        match self {
            RetryError::Exhausted { last, .. } | RetryError::Fatal(last) => Some(last),
            RetryError::Cancelled => None,
        }
    }
}

impl<E> From<RetryError<AttemptFailure<E>>> for CallError<E> {
    fn from(err: RetryError<AttemptFailure<E>>) -> Self {
        match err {
            RetryError::Exhausted { attempts, last } => CallError::RetriesExhausted { attempts, last },
            RetryError::Fatal(failure) => CallError::Transport(failure),
            RetryError::Cancelled => CallError::Cancelled,
        }
    }
}
