//! Property tests for the circuit breaker.
//!
//! Invariants tested:
//! - The circuit opens after exactly max_failures consecutive failures
//! - A success in between resets the count
//! - An open circuit never runs the operation

use proptest::prelude::*;
use resilient_call_circuitbreaker::{CircuitBreakerConfig, CircuitState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::runtime::Runtime;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    /// Property: the breaker opens on the max_failures-th consecutive failure, not before
    #[test]
    fn opens_after_exactly_max_failures(max_failures in 1usize..=20) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let breaker = CircuitBreakerConfig::builder()
                .max_failures(max_failures)
                .open_timeout(Duration::from_secs(60))
                .build()
                .unwrap();

            for i in 1..=max_failures {
                prop_assert_eq!(breaker.state_sync(), CircuitState::Closed, "open after {} failures", i - 1);
                let result = breaker.execute(|| async { Err::<(), _>("boom") }).await;
                prop_assert!(!result.unwrap_err().is_rejected());
            }
            prop_assert_eq!(breaker.state_sync(), CircuitState::Open);
            Ok(())
        })?;
    }

    /// Property: failure runs shorter than max_failures, separated by successes, never open
    #[test]
    fn interleaved_successes_keep_the_circuit_closed(
        max_failures in 2usize..=10,
        runs in prop::collection::vec(0usize..10, 1..20),
    ) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let breaker = CircuitBreakerConfig::builder()
                .max_failures(max_failures)
                .build()
                .unwrap();

            for run in runs {
                for _ in 0..run.min(max_failures - 1) {
                    let _ = breaker.execute(|| async { Err::<(), _>("boom") }).await;
                }
                let _ = breaker.execute(|| async { Ok::<_, &'static str>(()) }).await;
                prop_assert_eq!(breaker.state_sync(), CircuitState::Closed);
            }
            Ok(())
        })?;
    }

    /// Property: while open, no call reaches the operation
    #[test]
    fn open_circuit_never_runs_the_operation(calls in 1usize..=50) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let breaker = CircuitBreakerConfig::builder()
                .open_timeout(Duration::from_secs(60))
                .build()
                .unwrap();
            breaker.force_open();

            let executed = AtomicUsize::new(0);
            for _ in 0..calls {
                let result = breaker
                    .execute(|| async {
                        executed.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, &'static str>(())
                    })
                    .await;
                prop_assert!(result.unwrap_err().is_open());
            }
            prop_assert_eq!(executed.load(Ordering::SeqCst), 0);
            Ok(())
        })?;
    }
}
