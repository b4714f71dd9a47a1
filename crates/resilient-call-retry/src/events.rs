use resilient_call_core::PipelineEvent;
use std::time::{Duration, Instant};

/// Events emitted by the retry engine.
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// An attempt failed and another will follow after `delay`.
    Retry {
        name: String,
        timestamp: Instant,
        /// The attempt about to be made.
        attempt: usize,
        delay: Duration,
    },
    /// An attempt succeeded.
    Success {
        name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// Every attempt failed with a retryable failure.
    Exhausted {
        name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// An attempt failed with a failure that is not worth retrying.
    Fatal {
        name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// Cancellation fired before the next attempt.
    Cancelled {
        name: String,
        timestamp: Instant,
        attempts: usize,
    },
}

impl PipelineEvent for RetryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetryEvent::Retry { .. } => "retry",
            RetryEvent::Success { .. } => "success",
            RetryEvent::Exhausted { .. } => "exhausted",
            RetryEvent::Fatal { .. } => "fatal",
            RetryEvent::Cancelled { .. } => "cancelled",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::Retry { timestamp, .. }
            | RetryEvent::Success { timestamp, .. }
            | RetryEvent::Exhausted { timestamp, .. }
            | RetryEvent::Fatal { timestamp, .. }
            | RetryEvent::Cancelled { timestamp, .. } => *timestamp,
        }
    }

    fn component_name(&self) -> &str {
        match self {
            RetryEvent::Retry { name, .. }
            | RetryEvent::Success { name, .. }
            | RetryEvent::Exhausted { name, .. }
            | RetryEvent::Fatal { name, .. }
            | RetryEvent::Cancelled { name, .. } => name,
        }
    }
}
