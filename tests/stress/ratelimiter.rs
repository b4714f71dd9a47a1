//! Rate limiter stress tests

use resilient_call_ratelimiter::RateLimiterConfig;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Test: thousands of concurrent waiters never exceed the pool per interval
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn stress_concurrent_waiters() {
    let capacity = 100;
    let limiter = RateLimiterConfig::builder()
        .name("contended")
        .capacity(capacity)
        .refill_interval(Duration::from_millis(50))
        .build()
        .unwrap();

    let granted = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let mut handles = Vec::new();
    for _ in 0..2_000 {
        let limiter = limiter.clone();
        let granted = Arc::clone(&granted);
        handles.push(tokio::spawn(async move {
            let _permit = limiter.acquire(&CancellationToken::new()).await.unwrap();
            granted.fetch_add(1, Ordering::SeqCst);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let elapsed = start.elapsed();
    println!("2000 permits granted in {:?}", elapsed);

    assert_eq!(granted.load(Ordering::SeqCst), 2_000);
    // 20 pools' worth needs at least 19 refills.
    assert!(elapsed >= Duration::from_millis(19 * 50));
    assert!(limiter.available_permits() <= capacity);

    limiter.shutdown();
}

/// Test: shutdown releases every blocked waiter
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn stress_shutdown_with_blocked_waiters() {
    let limiter = RateLimiterConfig::builder()
        .name("draining")
        .capacity(1)
        .refill_interval(Duration::from_secs(3600))
        .build()
        .unwrap();
    let _held = limiter.try_acquire().unwrap();

    let mut handles = Vec::new();
    for _ in 0..1_000 {
        let limiter = limiter.clone();
        handles.push(tokio::spawn(async move {
            limiter.acquire(&CancellationToken::new()).await.is_err()
        }));
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    limiter.shutdown();

    for handle in handles {
        assert!(handle.await.unwrap());
    }
}
