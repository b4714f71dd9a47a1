//! Full pipeline stress tests

use resilient_call::{ClientConfig, InMemoryMetrics, ResilientClient, TransportRequest, TransportResponse};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{ConcurrencyTracker, LoadPattern, init_logging};

/// Test: many callers sharing one client, mixed reads and writes
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn stress_shared_client_under_load() {
    init_logging();
    let tracker = ConcurrencyTracker::new();
    let in_flight = Arc::clone(&tracker);
    let transport = tower::service_fn(move |req: TransportRequest| {
        let in_flight = Arc::clone(&in_flight);
        async move {
            in_flight.enter();
            tokio::time::sleep(Duration::from_millis(1)).await;
            in_flight.exit();
            Ok::<_, std::io::Error>(TransportResponse::new(200, req.target))
        }
    });

    let mut config = ClientConfig::default();
    config.rate_limit.permits = 500;
    config.rate_limit.refill_interval = Duration::from_millis(100);

    let metrics = Arc::new(InMemoryMetrics::new());
    let client = ResilientClient::builder()
        .config(config)
        .with_metrics(metrics.clone())
        .build(transport)
        .unwrap();

    let load = LoadPattern::Burst {
        requests: 1_000,
        bursts: 5,
    };
    let start = Instant::now();

    for (wave, requests) in load.waves().into_iter().enumerate() {
        let mut handles = Vec::new();
        for i in 0..requests {
            let client = client.clone();
            handles.push(tokio::spawn(async move {
                let target = format!("https://api{}.example.com/items/{}", i % 10, i % 50);
                if i % 3 == 0 {
                    client.post(target, "{}").await
                } else {
                    client.get(target).await
                }
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        println!("wave {} done at {:?}", wave, start.elapsed());
    }

    let snapshot = metrics.snapshot();
    let served = snapshot.counter_total("http_requests_total") + snapshot.counter_total("cache_hits_total");
    println!(
        "{} requests, peak transport concurrency {}, cache {:?}",
        load.total_requests(),
        tracker.peak(),
        client.cache_stats()
    );

    assert_eq!(served as usize, load.total_requests());
    assert_eq!(tracker.current(), 0);

    client.shutdown();
}

/// Test: a failing downstream is isolated by its breaker
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn stress_failing_downstream_is_isolated() {
    init_logging();
    let transport = tower::service_fn(|req: TransportRequest| async move {
        let status = if req.target.starts_with("https://down.") { 503 } else { 200 };
        Ok::<_, std::io::Error>(TransportResponse::new(status, ""))
    });

    let mut config = ClientConfig::default();
    config.retry.max_attempts = 1;
    config.cache.enabled = false;
    config.rate_limit.permits = 10_000;

    let client = ResilientClient::builder().config(config).build(transport).unwrap();

    let load = LoadPattern::Constant(4_000);
    let mut handles = Vec::new();
    for i in 0..load.total_requests() {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            let host = if i % 2 == 0 { "down" } else { "up" };
            client.get(format!("https://{host}.example.com/{i}")).await
        }));
    }

    let mut up_ok = 0;
    let mut down_rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => up_ok += 1,
            Err(err) if err.is_circuit_open() || err.is_too_many_probes() => down_rejected += 1,
            Err(_) => {}
        }
    }

    println!("healthy successes: {}, rejected by breaker: {}", up_ok, down_rejected);
    assert_eq!(up_ok, 2_000);
    assert!(down_rejected > 0);

    client.shutdown();
}
