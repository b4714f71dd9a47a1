//! Circuit breaker metrics regression tests

use super::helpers::*;
use resilient_call_circuitbreaker::CircuitBreakerConfig;
use serial_test::serial;
use std::time::Duration;

#[tokio::test]
#[serial]
async fn circuitbreaker_call_metrics_exist() {
    init_recorder();

    let breaker = CircuitBreakerConfig::builder()
        .name("test_cb")
        .max_failures(5)
        .build()
        .unwrap();

    let _ = breaker.execute(|| async { Ok::<_, &'static str>("ok") }).await;
    let _ = breaker.execute(|| async { Err::<(), _>("boom") }).await;

    assert_counter_exists("circuitbreaker_calls_total");
    assert_metric_has_label("circuitbreaker_calls_total", "circuitbreaker", "test_cb");
    assert_metric_has_label("circuitbreaker_calls_total", "outcome", "success");
    assert_metric_has_label("circuitbreaker_calls_total", "outcome", "failure");
}

#[tokio::test]
#[serial]
async fn circuitbreaker_transition_metrics() {
    init_recorder();

    let breaker = CircuitBreakerConfig::builder()
        .name("transition_cb")
        .max_failures(2)
        .open_timeout(Duration::from_secs(60))
        .build()
        .unwrap();

    for _ in 0..2 {
        let _ = breaker.execute(|| async { Err::<(), _>("boom") }).await;
    }
    let rejected = breaker.execute(|| async { Ok::<_, &'static str>(()) }).await;
    assert!(rejected.unwrap_err().is_open());

    assert_counter_exists("circuitbreaker_transitions_total");
    assert_metric_has_label("circuitbreaker_transitions_total", "circuitbreaker", "transition_cb");
    assert_metric_has_label("circuitbreaker_transitions_total", "from", "closed");
    assert_metric_has_label("circuitbreaker_transitions_total", "to", "open");
    assert_metric_has_label("circuitbreaker_calls_total", "outcome", "rejected");

    assert_gauge_exists("circuitbreaker_state");
    assert_metric_has_label("circuitbreaker_state", "circuitbreaker", "transition_cb");
}
