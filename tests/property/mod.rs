//! Property-based tests for the pipeline crates.
//!
//! Run with: cargo test --test property_tests

pub mod cache;
pub mod circuit_breaker;
pub mod metrics;
pub mod rate_limiter;
pub mod retry;
