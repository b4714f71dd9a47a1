//! Response cache stress tests

use resilient_call_cache::CacheConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::get_memory_usage_mb;

/// Test: concurrent readers and writers keep the statistics consistent
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn stress_concurrent_reads_and_writes() {
    let cache = CacheConfig::builder().name("contended").build().unwrap();
    let tasks = 16;
    let ops = 50_000;

    let start = Instant::now();
    let mut handles = Vec::new();
    for t in 0..tasks {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..ops {
                let key = format!("key-{}", (i * 7 + t) % 1_000);
                if i % 4 == 0 {
                    cache.set(&key, format!("value-{i}"), Duration::from_secs(60));
                } else {
                    let _ = cache.get(&key);
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    let elapsed = start.elapsed();

    let stats = cache.stats();
    println!("{} operations in {:?}: {:?}", tasks * ops, elapsed, stats);

    assert_eq!(stats.sets, (tasks * ops / 4) as u64);
    assert_eq!(stats.hits + stats.misses, (tasks * ops * 3 / 4) as u64);
    assert!(cache.len() <= 1_000);

    cache.shutdown();
}

/// Test: short-lived entries are reclaimed by the sweeper
#[tokio::test]
#[ignore]
async fn stress_expired_entries_are_reclaimed() {
    let cache = Arc::new(
        CacheConfig::builder()
            .name("sweeping")
            .sweep_interval(Duration::from_millis(50))
            .build()
            .unwrap(),
    );

    let before = get_memory_usage_mb();
    for i in 0..200_000 {
        cache.set(&format!("key-{i}"), vec![0u8; 256], Duration::from_millis(10));
    }
    let peak = get_memory_usage_mb();

    tokio::time::sleep(Duration::from_millis(200)).await;
    let after = get_memory_usage_mb();

    println!(
        "memory before: {:.1} MB, peak: {:.1} MB, after sweep: {:.1} MB",
        before, peak, after
    );
    assert_eq!(cache.len(), 0);

    cache.shutdown();
}
