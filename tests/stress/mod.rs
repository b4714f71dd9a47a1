//! Stress tests for the pipeline crates
//!
//! ## What We Test
//!
//! - **High volume**: millions of breaker decisions and cache lookups
//! - **High concurrency**: thousands of callers sharing one client
//! - **State consistency**: permit and probe bounds hold under contention
//! - **Resource cleanup**: background tasks stop, no deadlocks

pub mod cache;
pub mod circuitbreaker;
pub mod client;
pub mod ratelimiter;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Tracks peak concurrent operations
pub struct ConcurrencyTracker {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    pub fn enter(&self) {
        let current = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
    }

    pub fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }
}

/// Routes pipeline logs to the test output; visible with `--nocapture`.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Resident set size of this process in MB, where it can be measured.
#[cfg(target_os = "linux")]
pub fn get_memory_usage_mb() -> f64 {
    std::fs::read_to_string("/proc/self/statm")
        .ok()
        .and_then(|statm| {
            statm
                .split_whitespace()
                .nth(1)
                .and_then(|pages| pages.parse::<f64>().ok())
        })
        .map(|pages| pages * 4096.0 / (1024.0 * 1024.0))
        .unwrap_or(0.0)
}

#[cfg(not(target_os = "linux"))]
pub fn get_memory_usage_mb() -> f64 {
    0.0
}

/// Shape of the load a test drives
pub enum LoadPattern {
    Constant(usize),
    Burst { requests: usize, bursts: usize },
}

impl LoadPattern {
    pub fn total_requests(&self) -> usize {
        match self {
            LoadPattern::Constant(n) => *n,
            LoadPattern::Burst { requests, bursts } => requests * bursts,
        }
    }

    /// Request counts per wave.
    pub fn waves(&self) -> Vec<usize> {
        match self {
            LoadPattern::Constant(n) => vec![*n],
            LoadPattern::Burst { requests, bursts } => vec![*requests; *bursts],
        }
    }
}
