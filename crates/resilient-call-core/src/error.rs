//! The error taxonomy surfaced by the pipeline.
//!
//! Callers of the resilient client only ever see a [`CallError`]. Every
//! variant corresponds to one place in the request lifecycle where the call
//! can stop:
//!
//! | Variant | Raised by | Network touched? |
//! |---|---|---|
//! | [`CallError::Validation`] | client, before anything else | no |
//! | [`CallError::CircuitOpen`] | circuit breaker | no |
//! | [`CallError::TooManyProbes`] | circuit breaker (half-open) | no |
//! | [`CallError::RetriesExhausted`] | retry engine | yes, `attempts` times |
//! | [`CallError::Cancelled`] | any suspension point | maybe |
//! | [`CallError::Transport`] | retry engine, on a fatal attempt | yes, once more |
//!
//! Branch on [`CallError::kind`] to decide whether to surface, log or fall
//! back:
//!
//! ```
//! use resilient_call_core::{CallError, ErrorKind};
//!
//! fn should_fall_back(err: &CallError<std::io::Error>) -> bool {
//!     matches!(
//!         err.kind(),
//!         ErrorKind::CircuitOpen | ErrorKind::TooManyProbes | ErrorKind::RetriesExhausted
//!     )
//! }
//!
//! let err: CallError<std::io::Error> = CallError::CircuitOpen { name: "api".into() };
//! assert!(should_fall_back(&err));
//! ```

use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

/// Why a single network attempt did not succeed.
#[derive(Debug, Clone, Error)]
pub enum AttemptFailure<E> {
    /// The transport itself failed (connection refused, reset, DNS, ...).
    #[error("transport error: {0}")]
    Transport(E),

    /// The downstream answered with a non-success status.
    #[error("downstream responded with status {status}")]
    Status {
        /// HTTP-like status code.
        status: u16,
        /// Raw response body, kept for diagnostics.
        body: Bytes,
    },

    /// The attempt did not complete within the request timeout.
    #[error("attempt timed out after {after:?}")]
    Timeout {
        /// The configured per-attempt timeout.
        after: Duration,
    },
}

impl<E> AttemptFailure<E> {
    /// Status code of the failed attempt, if the downstream answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            AttemptFailure::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Maps the transport error type.
    pub fn map_transport<F, T>(self, f: F) -> AttemptFailure<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            AttemptFailure::Transport(e) => AttemptFailure::Transport(f(e)),
            AttemptFailure::Status { status, body } => AttemptFailure::Status { status, body },
            AttemptFailure::Timeout { after } => AttemptFailure::Timeout { after },
        }
    }
}

/// Discriminant of [`CallError`], convenient for metrics labels and matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    CircuitOpen,
    TooManyProbes,
    RetriesExhausted,
    Cancelled,
    Transport,
}

impl ErrorKind {
    /// Stable snake_case name, used as a metric tag value.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::CircuitOpen => "circuit_open",
            ErrorKind::TooManyProbes => "too_many_probes",
            ErrorKind::RetriesExhausted => "retries_exhausted",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Transport => "transport",
        }
    }
}

/// Error returned by the resilient client.
///
/// `E` is the error type of the wrapped transport.
#[derive(Debug, Error)]
pub enum CallError<E> {
    /// The request was malformed and rejected before any network activity.
    #[error("invalid request: {reason}")]
    Validation {
        /// Human-readable reason.
        reason: String,
    },

    /// The circuit breaker for the target is open.
    #[error("circuit breaker '{name}' is open")]
    CircuitOpen {
        /// Breaker name (the downstream target it guards).
        name: String,
    },

    /// The circuit breaker is half-open and its probe budget is spent.
    #[error("circuit breaker '{name}' is half-open with all {max_probes} probes in use")]
    TooManyProbes {
        /// Breaker name.
        name: String,
        /// Configured half-open probe budget.
        max_probes: usize,
    },

    /// Every attempt failed with a retryable failure.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: usize,
        /// The failure observed on the final attempt.
        last: AttemptFailure<E>,
    },

    /// The caller's cancellation or deadline fired while the call was suspended.
    #[error("call cancelled")]
    Cancelled,

    /// A non-retryable attempt failure.
    #[error("{0}")]
    Transport(AttemptFailure<E>),
}

impl<E> CallError<E> {
    /// Shorthand for a [`CallError::Validation`].
    pub fn validation(reason: impl Into<String>) -> Self {
        CallError::Validation {
            reason: reason.into(),
        }
    }

    /// Which part of the taxonomy this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CallError::Validation { .. } => ErrorKind::Validation,
            CallError::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            CallError::TooManyProbes { .. } => ErrorKind::TooManyProbes,
            CallError::RetriesExhausted { .. } => ErrorKind::RetriesExhausted,
            CallError::Cancelled => ErrorKind::Cancelled,
            CallError::Transport(_) => ErrorKind::Transport,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, CallError::Validation { .. })
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(self, CallError::CircuitOpen { .. })
    }

    pub fn is_too_many_probes(&self) -> bool {
        matches!(self, CallError::TooManyProbes { .. })
    }

    pub fn is_retries_exhausted(&self) -> bool {
        matches!(self, CallError::RetriesExhausted { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CallError::Cancelled)
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, CallError::Transport(_))
    }

    /// True when the breaker rejected the call without attempting it.
    pub fn is_rejected(&self) -> bool {
        self.is_circuit_open() || self.is_too_many_probes()
    }

    /// The last attempt failure, for errors that carry one.
    pub fn attempt_failure(&self) -> Option<&AttemptFailure<E>> {
        match self {
            CallError::RetriesExhausted { last, .. } => Some(last),
            CallError::Transport(failure) => Some(failure),
            _ => None,
        }
    }

    /// Status code of the last attempt, if the downstream answered.
    pub fn status(&self) -> Option<u16> {
        self.attempt_failure().and_then(AttemptFailure::status)
    }

    /// Maps the transport error type, keeping the variant.
    pub fn map_transport<F, T>(self, f: F) -> CallError<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            CallError::Validation { reason } => CallError::Validation { reason },
            CallError::CircuitOpen { name } => CallError::CircuitOpen { name },
            CallError::TooManyProbes { name, max_probes } => {
                CallError::TooManyProbes { name, max_probes }
            }
            CallError::RetriesExhausted { attempts, last } => CallError::RetriesExhausted {
                attempts,
                last: last.map_transport(f),
            },
            CallError::Cancelled => CallError::Cancelled,
            CallError::Transport(failure) => CallError::Transport(failure.map_transport(f)),
        }
    }
}

/// A configuration value was rejected by a builder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value for `{field}`: {reason}")]
pub struct ConfigError {
    /// Name of the offending builder setting.
    pub field: &'static str,
    /// What the value must satisfy.
    pub reason: &'static str,
}

impl ConfigError {
    pub fn new(field: &'static str, reason: &'static str) -> Self {
        Self { field, reason }
    }
}
