//! Retry metrics regression tests

use super::helpers::*;
use resilient_call_retry::{Attempt, RetryConfig};
use serial_test::serial;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
#[serial]
async fn retry_metrics_exist() {
    init_recorder();

    let retry = RetryConfig::builder()
        .name("test_retry")
        .max_attempts(3)
        .initial_delay(Duration::from_millis(10))
        .jitter(false)
        .build()
        .unwrap();

    let counter = Arc::new(AtomicUsize::new(0));
    let result = retry
        .run(&CancellationToken::new(), |_| {
            let count = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if count < 2 {
                    Attempt::Retryable("failure")
                } else {
                    Attempt::Success("success")
                }
            }
        })
        .await;
    assert_eq!(result.unwrap(), "success");

    assert_counter_exists("retry_calls_total");
    assert_metric_has_label("retry_calls_total", "retry", "test_retry");
    assert_metric_has_label("retry_calls_total", "result", "success");

    assert_histogram_exists("retry_attempts");
    assert_metric_has_label("retry_attempts", "retry", "test_retry");
}

#[tokio::test]
#[serial]
async fn retry_exhausted_metrics() {
    init_recorder();

    let retry = RetryConfig::builder()
        .name("exhausted_retry")
        .max_attempts(2)
        .initial_delay(Duration::from_millis(10))
        .build()
        .unwrap();

    let result = retry
        .run(&CancellationToken::new(), |_| async {
            Attempt::<(), _>::Retryable("failure")
        })
        .await;
    assert!(result.is_err());

    assert_metric_has_label("retry_calls_total", "result", "exhausted");
}

#[tokio::test]
#[serial]
async fn retry_fatal_metrics() {
    init_recorder();

    let retry = RetryConfig::builder().name("fatal_retry").build().unwrap();

    let _ = retry
        .run(&CancellationToken::new(), |_| async {
            Attempt::<(), _>::Fatal("bad request")
        })
        .await;

    assert_metric_has_label("retry_calls_total", "retry", "fatal_retry");
    assert_metric_has_label("retry_calls_total", "result", "fatal");
}
