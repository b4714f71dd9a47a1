//! Property tests for the retry backoff schedule.
//!
//! Invariants tested:
//! - Delays never shrink from one attempt to the next
//! - No delay exceeds the cap
//! - Jitter only stretches a delay, by at most ten percent
//! - The number of attempts never exceeds the configured maximum

use proptest::prelude::*;
use resilient_call_retry::{Attempt, ExponentialBackoff, JITTER_FACTOR, RetryConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    /// Property: base delays are monotone in the attempt number and capped
    #[test]
    fn backoff_is_monotone_and_capped(
        initial_ms in 1u64..=1_000,
        max_ms in 1u64..=60_000,
        multiplier in 1.0f64..=4.0,
    ) {
        let backoff = ExponentialBackoff::new(
            Duration::from_millis(initial_ms),
            Duration::from_millis(max_ms),
            multiplier,
            false,
        );

        let mut previous = Duration::ZERO;
        for attempt in 1..=40 {
            let delay = backoff.base_delay(attempt);
            prop_assert!(delay >= previous, "attempt {} went from {:?} to {:?}", attempt, previous, delay);
            prop_assert!(delay <= Duration::from_millis(max_ms));
            prop_assert_eq!(backoff.next_delay(attempt), delay);
            previous = delay;
        }
    }

    /// Property: a jittered delay lies in [base, base * 1.1]
    #[test]
    fn jitter_stays_within_ten_percent_above_base(
        initial_ms in 1u64..=1_000,
        attempt in 1usize..=10,
    ) {
        let backoff = ExponentialBackoff::new(
            Duration::from_millis(initial_ms),
            Duration::from_secs(30),
            2.0,
            true,
        );

        let base = backoff.base_delay(attempt);
        let upper = base.mul_f64(1.0 + JITTER_FACTOR);
        for _ in 0..20 {
            let delay = backoff.next_delay(attempt);
            prop_assert!(delay >= base, "{:?} undercuts {:?}", delay, base);
            prop_assert!(delay <= upper, "{:?} exceeds {:?}", delay, upper);
        }
    }

    /// Property: a call that always fails is attempted exactly max_attempts times
    #[test]
    fn attempts_never_exceed_maximum(max_attempts in 1usize..=6) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let retry = RetryConfig::builder()
                .max_attempts(max_attempts)
                .initial_delay(Duration::from_millis(1))
                .jitter(false)
                .build()
                .unwrap();

            let calls = AtomicUsize::new(0);
            let result = retry
                .run(&CancellationToken::new(), |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Attempt::<(), _>::Retryable(503u16) }
                })
                .await;

            prop_assert!(result.is_err());
            prop_assert_eq!(calls.load(Ordering::SeqCst), max_attempts);
            Ok(())
        })?;
    }
}
