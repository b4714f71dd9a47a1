//! Property tests for the rate limiter.
//!
//! Invariants tested:
//! - Never hands out more permits than its capacity between refills
//! - A refill tops the pool back up to capacity, never beyond

use proptest::prelude::*;
use resilient_call_ratelimiter::RateLimiterConfig;
use std::time::Duration;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    /// Property: at most `capacity` permits are granted before a refill
    #[test]
    fn never_exceeds_capacity(
        capacity in 1usize..=50,
        requests in 1usize..=200,
    ) {
        // Outside a runtime no refill task is started.
        let limiter = RateLimiterConfig::builder()
            .capacity(capacity)
            .refill_interval(Duration::from_secs(60))
            .build()
            .unwrap();

        let granted = (0..requests).filter_map(|_| limiter.try_acquire()).count();

        prop_assert_eq!(granted, requests.min(capacity));
        prop_assert!(limiter.available_permits() <= capacity);
    }

    /// Property: a refill restores exactly what was consumed
    #[test]
    fn refill_restores_capacity(
        capacity in 1usize..=50,
        consumed in 0usize..=50,
    ) {
        let limiter = RateLimiterConfig::builder()
            .capacity(capacity)
            .build()
            .unwrap();

        let taken = (0..consumed).filter_map(|_| limiter.try_acquire()).count();
        let added = limiter.replenish();

        prop_assert_eq!(added, taken);
        prop_assert_eq!(limiter.available_permits(), capacity);
        prop_assert_eq!(limiter.replenish(), 0);
    }
}
