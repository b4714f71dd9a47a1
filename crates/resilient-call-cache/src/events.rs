use resilient_call_core::PipelineEvent;
use std::time::Instant;

/// Events emitted by the response cache.
#[derive(Debug, Clone)]
pub enum CacheEvent {
    Hit {
        name: String,
        timestamp: Instant,
        key: String,
    },
    Miss {
        name: String,
        timestamp: Instant,
        key: String,
    },
    Set {
        name: String,
        timestamp: Instant,
        key: String,
    },
    /// A read found the entry past its expiry and removed it.
    Expired {
        name: String,
        timestamp: Instant,
        key: String,
    },
    /// A sweep pass finished.
    Swept {
        name: String,
        timestamp: Instant,
        evicted: usize,
    },
}

impl PipelineEvent for CacheEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CacheEvent::Hit { .. } => "hit",
            CacheEvent::Miss { .. } => "miss",
            CacheEvent::Set { .. } => "set",
            CacheEvent::Expired { .. } => "expired",
            CacheEvent::Swept { .. } => "swept",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CacheEvent::Hit { timestamp, .. }
            | CacheEvent::Miss { timestamp, .. }
            | CacheEvent::Set { timestamp, .. }
            | CacheEvent::Expired { timestamp, .. }
            | CacheEvent::Swept { timestamp, .. } => *timestamp,
        }
    }

    fn component_name(&self) -> &str {
        match self {
            CacheEvent::Hit { name, .. }
            | CacheEvent::Miss { name, .. }
            | CacheEvent::Set { name, .. }
            | CacheEvent::Expired { name, .. }
            | CacheEvent::Swept { name, .. } => name,
        }
    }
}
