use resilient_call_core::PipelineEvent;
use std::time::{Duration, Instant};

/// Events emitted by the rate limiter.
#[derive(Debug, Clone)]
pub enum RateLimiterEvent {
    /// A permit was handed out after waiting `wait`.
    PermitAcquired {
        name: String,
        timestamp: Instant,
        wait: Duration,
    },
    /// A waiter gave up because its cancellation token fired.
    AcquireCancelled {
        name: String,
        timestamp: Instant,
        wait: Duration,
    },
    /// The pool was topped back up.
    Replenished {
        name: String,
        timestamp: Instant,
        added: usize,
    },
}

impl PipelineEvent for RateLimiterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RateLimiterEvent::PermitAcquired { .. } => "permit_acquired",
            RateLimiterEvent::AcquireCancelled { .. } => "acquire_cancelled",
            RateLimiterEvent::Replenished { .. } => "replenished",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RateLimiterEvent::PermitAcquired { timestamp, .. }
            | RateLimiterEvent::AcquireCancelled { timestamp, .. }
            | RateLimiterEvent::Replenished { timestamp, .. } => *timestamp,
        }
    }

    fn component_name(&self) -> &str {
        match self {
            RateLimiterEvent::PermitAcquired { name, .. }
            | RateLimiterEvent::AcquireCancelled { name, .. }
            | RateLimiterEvent::Replenished { name, .. } => name,
        }
    }
}
