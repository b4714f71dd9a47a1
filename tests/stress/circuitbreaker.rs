//! Circuit breaker stress tests

use resilient_call_circuitbreaker::{CircuitBreakerConfig, CircuitState};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use super::ConcurrencyTracker;

/// Test: 1 million calls through a closed breaker
#[tokio::test]
#[ignore]
async fn stress_one_million_calls() {
    let breaker = CircuitBreakerConfig::builder().name("million").build().unwrap();
    let call_count = AtomicUsize::new(0);

    let start = Instant::now();
    for _ in 0..1_000_000 {
        let _ = breaker
            .execute(|| async {
                call_count.fetch_add(1, Ordering::Relaxed);
                Ok::<_, ()>(())
            })
            .await;
    }
    let elapsed = start.elapsed();

    println!("1M calls completed in {:?}", elapsed);
    println!(
        "Throughput: {:.0} calls/sec",
        1_000_000.0 / elapsed.as_secs_f64()
    );

    assert_eq!(call_count.load(Ordering::Relaxed), 1_000_000);
    assert_eq!(breaker.state_sync(), CircuitState::Closed);
}

/// Test: repeated open, half-open, closed cycles
#[tokio::test]
#[ignore]
async fn stress_rapid_state_transitions() {
    let breaker = CircuitBreakerConfig::builder()
        .name("thrash")
        .max_failures(3)
        .open_timeout(Duration::from_millis(5))
        .max_half_open_probes(1)
        .build()
        .unwrap();

    let mut transitions = 0;
    let mut last_state = breaker.state_sync();

    for i in 0..5_000 {
        let fail = i % 20 < 10;
        let _ = breaker
            .execute(|| async move { if fail { Err(()) } else { Ok(()) } })
            .await;

        if i % 20 == 9 {
            tokio::time::sleep(Duration::from_millis(6)).await;
        }

        let state = breaker.state_sync();
        if state != last_state {
            transitions += 1;
            last_state = state;
        }
    }

    println!("Observed {} state transitions", transitions);
    assert!(transitions > 0);
}

/// Test: half-open admits no more than the probe limit at once
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn stress_half_open_probe_limit() {
    let breaker = CircuitBreakerConfig::builder()
        .name("probes")
        .max_failures(1)
        .open_timeout(Duration::from_millis(10))
        .max_half_open_probes(4)
        .build()
        .unwrap();

    let tracker = ConcurrencyTracker::new();

    for _round in 0..50 {
        breaker.force_open();
        tokio::time::sleep(Duration::from_millis(15)).await;

        let mut handles = Vec::new();
        for _ in 0..200 {
            let breaker = breaker.clone();
            let tracker = Arc::clone(&tracker);
            handles.push(tokio::spawn(async move {
                let _ = breaker
                    .execute(|| async {
                        tracker.enter();
                        tokio::time::sleep(Duration::from_millis(2)).await;
                        tracker.exit();
                        Ok::<_, ()>(())
                    })
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    println!("Peak concurrent probes: {}", tracker.peak());
    assert!(tracker.peak() <= 4);
    assert_eq!(tracker.current(), 0);
}
