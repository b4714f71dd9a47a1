//! TTL response cache.
//!
//! Values are opaque bytes keyed by a string fingerprint. Expired entries
//! are dropped lazily by the read that finds them, and eagerly by a
//! background sweep so keys written once and never read again do not pile
//! up. One read/write lock guards the entry map and the statistics
//! together; lookups take it in shared mode.
//!
//! ```
//! use bytes::Bytes;
//! use resilient_call_cache::CacheConfig;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let cache = CacheConfig::builder().name("responses").build().unwrap();
//!
//! cache.set("GET:https://api.example.com/items", Bytes::from_static(b"[]"), Duration::from_secs(30));
//! assert!(cache.get("GET:https://api.example.com/items").is_some());
//! assert!(cache.get("GET:https://api.example.com/other").is_none());
//!
//! let stats = cache.stats();
//! assert_eq!(stats.hit_ratio, 0.5);
//! cache.shutdown();
//! # }
//! ```
//!
//! ## Feature Flags
//! - `metrics`: request counter by result, evictions and a size gauge.
//! - `tracing`: logs expiry and sweep passes.

use crate::store::Shared;
use bytes::Bytes;
#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_gauge};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
#[cfg(feature = "metrics")]
use std::sync::Once;
use std::time::Duration;

pub use config::{CacheConfig, CacheConfigBuilder};
pub use error::CacheError;
pub use events::CacheEvent;
pub use store::CacheStats;

mod config;
mod error;
mod events;
mod store;
mod sweep;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// A shared TTL cache. Clones see the same entries.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    shared: Arc<Shared>,
}

impl ResponseCache {
    /// Creates an empty cache and, inside a Tokio runtime, starts its sweeper.
    pub fn new(config: CacheConfig) -> Self {
        #[cfg(feature = "metrics")]
        METRICS_INIT.call_once(|| {
            describe_counter!("cache_requests_total", "Cache lookups by result (hit or miss)");
            describe_counter!("cache_evictions_total", "Expired entries removed from the cache");
            describe_gauge!("cache_size", "Current number of entries in the cache");
        });

        let shared = Arc::new(Shared::new(config));

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(sweep::sweep_loop(
                Arc::downgrade(&shared),
                shared.shutdown.clone(),
            ));
        }

        Self { shared }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.shared.config
    }

    /// Returns the value for `key` if present and not expired.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.shared.get(key)
    }

    /// Stores `value` under `key` for `ttl`, replacing any existing entry.
    pub fn set(&self, key: &str, value: impl Into<Bytes>, ttl: Duration) {
        self.shared.set(key, value.into(), ttl);
    }

    /// Stores `value` under `key` with the configured default TTL.
    pub fn insert(&self, key: &str, value: impl Into<Bytes>) {
        self.shared
            .set(key, value.into(), self.shared.config.default_ttl);
    }

    /// Removes `key`. Returns whether an entry was present.
    pub fn delete(&self, key: &str) -> bool {
        self.shared.delete(key)
    }

    /// Drops every entry and zeroes the statistics.
    pub fn clear(&self) {
        self.shared.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.shared.stats()
    }

    /// Entries in the map, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evicts every expired entry now. This is what the sweeper runs.
    pub fn sweep(&self) -> usize {
        self.shared.sweep()
    }

    /// Looks up `key` and decodes it as JSON.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.get(key) {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Encodes `value` as JSON and stores it for `ttl`.
    pub fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let encoded = serde_json::to_vec(value)?;
        self.set(key, encoded, ttl);
        Ok(())
    }

    /// Returns the cached value for `key`, or runs `load` and caches its
    /// success for `ttl`. Failures are returned and not cached.
    pub async fn get_or_try_insert_with<F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        load: F,
    ) -> Result<Bytes, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Bytes, E>>,
    {
        if let Some(hit) = self.get(key) {
            return Ok(hit);
        }
        let value = load().await?;
        self.set(key, value.clone(), ttl);
        Ok(value)
    }

    /// Stops the sweeper. Entries stay readable. Safe to call more than once.
    pub fn shutdown(&self) {
        self.shared.close();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
