//! Property tests for the metrics collector.
//!
//! Invariants tested:
//! - A series is identified by its name and tag set, not tag order
//! - Counters equal the number of increments

use proptest::prelude::*;
use resilient_call_metrics::{InMemoryMetrics, MetricsCollector, series_key};
use std::collections::BTreeMap;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    /// Property: permuting tags never changes the series key
    #[test]
    fn series_key_ignores_tag_order(
        tags in prop::collection::btree_map("[a-z]{1,6}", "[a-z0-9]{0,6}", 0..6),
        seed in any::<u64>(),
    ) {
        let pairs: Vec<(&str, &str)> = tags.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        let mut shuffled = pairs.clone();
        let len = shuffled.len();
        if len > 1 {
            shuffled.rotate_left(seed as usize % len);
            shuffled.reverse();
        }

        prop_assert_eq!(series_key("requests_total", &pairs), series_key("requests_total", &shuffled));
    }

    /// Property: each distinct tag set counts independently
    #[test]
    fn counters_match_increments(
        increments in prop::collection::vec(("[a-c]", "[x-z]"), 1..50),
    ) {
        let metrics = InMemoryMetrics::new();
        let mut expected: BTreeMap<(String, String), i64> = BTreeMap::new();

        for (route, status) in &increments {
            metrics.increment_counter("hits_total", &[("route", route.as_str()), ("status", status.as_str())]);
            *expected.entry((route.clone(), status.clone())).or_default() += 1;
        }

        let snapshot = metrics.snapshot();
        for ((route, status), count) in &expected {
            prop_assert_eq!(
                snapshot.counter("hits_total", &[("status", status.as_str()), ("route", route.as_str())]),
                *count
            );
        }
        prop_assert_eq!(snapshot.counter_total("hits_total"), increments.len() as i64);
    }
}
