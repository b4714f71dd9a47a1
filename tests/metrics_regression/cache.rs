//! Response cache metrics regression tests

use super::helpers::*;
use resilient_call_cache::CacheConfig;
use serial_test::serial;
use std::time::Duration;

#[tokio::test]
#[serial]
async fn cache_metrics_exist() {
    init_recorder();

    let cache = CacheConfig::builder().name("test_cache").build().unwrap();

    cache.insert("a", "1");
    assert!(cache.get("a").is_some());
    assert!(cache.get("b").is_none());

    assert_counter_exists("cache_requests_total");
    assert_metric_has_label("cache_requests_total", "cache", "test_cache");
    assert_metric_has_label("cache_requests_total", "result", "hit");
    assert_metric_has_label("cache_requests_total", "result", "miss");

    assert_gauge_exists("cache_size");
    assert_metric_has_label("cache_size", "cache", "test_cache");

    cache.shutdown();
}

#[tokio::test]
#[serial]
async fn cache_eviction_metrics() {
    init_recorder();

    let cache = CacheConfig::builder().name("evicting_cache").build().unwrap();

    cache.set("short", "1", Duration::from_millis(1));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(cache.sweep(), 1);

    assert_counter_exists("cache_evictions_total");
    assert_metric_has_label("cache_evictions_total", "cache", "evicting_cache");

    cache.shutdown();
}
