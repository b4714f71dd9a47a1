//! Rate limiter metrics regression tests

use super::helpers::*;
use resilient_call_ratelimiter::RateLimiterConfig;
use serial_test::serial;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
#[serial]
async fn ratelimiter_metrics_exist() {
    init_recorder();

    let limiter = RateLimiterConfig::builder()
        .name("test_rl")
        .capacity(2)
        .refill_interval(Duration::from_millis(50))
        .build()
        .unwrap();

    let cancel = CancellationToken::new();
    let _first = limiter.acquire(&cancel).await.unwrap();
    let _second = limiter.acquire(&cancel).await.unwrap();

    assert_counter_exists("ratelimiter_calls_total");
    assert_metric_has_label("ratelimiter_calls_total", "ratelimiter", "test_rl");
    assert_metric_has_label("ratelimiter_calls_total", "result", "permitted");

    assert_histogram_exists("ratelimiter_wait_duration_seconds");
    assert_metric_has_label("ratelimiter_wait_duration_seconds", "ratelimiter", "test_rl");

    // The gauge is set by a refill.
    limiter.replenish();
    assert_gauge_exists("ratelimiter_available_permits");
    assert_metric_has_label("ratelimiter_available_permits", "ratelimiter", "test_rl");

    limiter.shutdown();
}

#[tokio::test]
#[serial]
async fn ratelimiter_cancelled_and_closed_metrics() {
    init_recorder();

    let limiter = RateLimiterConfig::builder()
        .name("cancelled_rl")
        .capacity(1)
        .refill_interval(Duration::from_secs(60))
        .build()
        .unwrap();

    let cancel = CancellationToken::new();
    let _permit = limiter.acquire(&cancel).await.unwrap();

    cancel.cancel();
    assert!(limiter.acquire(&cancel).await.is_err());
    assert_metric_has_label("ratelimiter_calls_total", "result", "cancelled");

    limiter.shutdown();
    assert!(limiter.acquire(&CancellationToken::new()).await.is_err());
    assert_metric_has_label("ratelimiter_calls_total", "result", "closed");
}
