//! Collector series forwarded through the `metrics` facade

use super::helpers::*;
use resilient_call::{ClientConfig, InMemoryMetrics, ResilientClient, TransportRequest, TransportResponse};
use serial_test::serial;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[tokio::test]
#[serial]
async fn client_series_reach_the_facade() {
    init_recorder();

    let mut config = ClientConfig::default();
    config.name = "regression_client".to_string();
    config.retry.initial_delay = Duration::from_millis(5);
    config.retry.jitter = false;

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let transport = tower::service_fn(move |_req: TransportRequest| {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            let status = if n == 0 { 503 } else { 200 };
            Ok::<_, std::io::Error>(TransportResponse::new(status, "{}"))
        }
    });

    let client = ResilientClient::builder()
        .config(config)
        .with_metrics(Arc::new(InMemoryMetrics::new()))
        .build(transport)
        .unwrap();

    client.get("https://regression.example.com/items").await.unwrap();
    client.get("https://regression.example.com/items").await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    assert_counter_exists("http_requests_total");
    assert_metric_has_label("http_requests_total", "endpoint", "https://regression.example.com");
    assert_metric_has_label("http_requests_total", "method", "GET");
    assert_metric_has_label("http_requests_total", "status", "200");
    assert_histogram_exists("http_request_duration_ms");

    assert_counter_exists("retry_attempts_total");
    assert_metric_has_label("retry_attempts_total", "attempt", "2");
    assert_metric_has_label(
        "retry_attempts_total",
        "operation",
        "GET https://regression.example.com",
    );

    assert_counter_exists("cache_misses_total");
    assert_counter_exists("cache_hits_total");
    assert_metric_has_label("cache_hits_total", "cache", "regression_client");

    assert_gauge_exists("circuit_breaker_state");
    assert_metric_has_label("circuit_breaker_state", "name", "https://regression.example.com");
    assert_metric_has_label("circuit_breaker_state", "state", "closed");

    client.shutdown();
}
