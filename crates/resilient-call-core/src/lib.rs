//! Shared infrastructure for the resilient-call pipeline.
//!
//! Every pattern crate (circuit breaker, retry, rate limiter, cache) builds on
//! two pieces defined here:
//! - [`events`]: a listener registry that patterns publish their events to
//! - [`error`]: the [`CallError`] taxonomy returned to callers of the pipeline
//!
//! The pattern crates never depend on each other; only the client crate
//! composes them.

pub mod error;
pub mod events;

pub use error::{AttemptFailure, CallError, ConfigError, ErrorKind};
pub use events::{EventListener, EventListeners, FnListener, PipelineEvent};
