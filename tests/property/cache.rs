//! Property tests for the response cache.
//!
//! Invariants tested:
//! - A live entry is always returned as written
//! - Hits plus misses equals the number of lookups
//! - The hit ratio stays within [0, 1]

use proptest::prelude::*;
use resilient_call_cache::CacheConfig;
use std::collections::HashMap;
use std::time::Duration;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    /// Property: the cache behaves like a map for entries that cannot expire
    #[test]
    fn live_entries_read_back_as_written(
        writes in prop::collection::vec(("[a-e]", "[a-z]{0,8}"), 0..30),
        reads in prop::collection::vec("[a-g]", 0..30),
    ) {
        let cache = CacheConfig::builder().build().unwrap();
        let mut model = HashMap::new();

        for (key, value) in &writes {
            cache.set(key, value.clone(), Duration::from_secs(3600));
            model.insert(key.clone(), value.clone());
        }

        for key in &reads {
            let got = cache.get(key);
            let expected = model.get(key).map(|v| v.as_bytes().to_vec());
            prop_assert_eq!(got.map(|b| b.to_vec()), expected);
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.hits + stats.misses, reads.len() as u64);
        prop_assert_eq!(stats.sets, writes.len() as u64);
        prop_assert_eq!(cache.len(), model.len());
        prop_assert!((0.0..=1.0).contains(&stats.hit_ratio));
    }
}
