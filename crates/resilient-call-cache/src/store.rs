//! Entry map and statistics behind a single read/write lock.

use crate::config::CacheConfig;
use crate::events::CacheEvent;
use bytes::Bytes;
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    /// `hits / (hits + misses)`, or 0 before the first lookup.
    pub hit_ratio: f64,
    /// Entries currently in the map, including expired ones not yet evicted.
    pub item_count: usize,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Bytes,
    // None when `now + ttl` is not representable.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(value: Bytes, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now().checked_add(ttl),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now > at)
    }
}

/// Counters live next to the map so `clear` can reset both atomically.
/// Readers bump them while holding the shared lock.
#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, CacheEntry>,
    counters: Counters,
}

#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) config: CacheConfig,
    state: RwLock<State>,
    pub(crate) shutdown: CancellationToken,
}

enum Lookup {
    Hit(Bytes),
    Expired,
    Missing,
}

impl Shared {
    pub(crate) fn new(config: CacheConfig) -> Self {
        Self {
            config,
            state: RwLock::new(State::default()),
            shutdown: CancellationToken::new(),
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<Bytes> {
        let lookup = {
            let state = self.state.read();
            match state.entries.get(key) {
                Some(entry) if entry.is_expired(Instant::now()) => Lookup::Expired,
                Some(entry) => {
                    state.counters.hits.fetch_add(1, Ordering::Relaxed);
                    Lookup::Hit(entry.value.clone())
                }
                None => {
                    state.counters.misses.fetch_add(1, Ordering::Relaxed);
                    Lookup::Missing
                }
            }
        };

        match lookup {
            Lookup::Hit(value) => {
                self.emit(|name| CacheEvent::Hit {
                    name,
                    timestamp: std::time::Instant::now(),
                    key: key.to_string(),
                });
                self.record_request("hit");
                Some(value)
            }
            Lookup::Expired => {
                let fresh = {
                    let mut state = self.state.write();
                    let now = Instant::now();
                    match state.entries.get(key) {
                        // Overwritten between the two lock acquisitions.
                        Some(entry) if !entry.is_expired(now) => {
                            state.counters.hits.fetch_add(1, Ordering::Relaxed);
                            Some(entry.value.clone())
                        }
                        _ => {
                            state.entries.remove(key);
                            state.counters.misses.fetch_add(1, Ordering::Relaxed);
                            None
                        }
                    }
                };

                if fresh.is_some() {
                    self.record_request("hit");
                    return fresh;
                }

                #[cfg(feature = "tracing")]
                tracing::trace!(cache = %self.config.name, key, "evicted expired entry on read");

                self.emit(|name| CacheEvent::Expired {
                    name,
                    timestamp: std::time::Instant::now(),
                    key: key.to_string(),
                });
                self.record_eviction(1);
                self.record_miss(key);
                None
            }
            Lookup::Missing => {
                self.record_miss(key);
                None
            }
        }
    }

    pub(crate) fn set(&self, key: &str, value: Bytes, ttl: Duration) {
        let size = {
            let mut state = self.state.write();
            state
                .entries
                .insert(key.to_string(), CacheEntry::new(value, ttl));
            state.counters.sets.fetch_add(1, Ordering::Relaxed);
            state.entries.len()
        };

        self.emit(|name| CacheEvent::Set {
            name,
            timestamp: std::time::Instant::now(),
            key: key.to_string(),
        });
        self.record_size(size);
    }

    pub(crate) fn delete(&self, key: &str) -> bool {
        let mut state = self.state.write();
        let removed = state.entries.remove(key).is_some();
        if removed {
            state.counters.deletes.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    pub(crate) fn clear(&self) {
        *self.state.write() = State::default();
        self.record_size(0);
    }

    pub(crate) fn stats(&self) -> CacheStats {
        let state = self.state.read();
        let hits = state.counters.hits.load(Ordering::Relaxed);
        let misses = state.counters.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;

        CacheStats {
            hits,
            misses,
            sets: state.counters.sets.load(Ordering::Relaxed),
            deletes: state.counters.deletes.load(Ordering::Relaxed),
            hit_ratio: if lookups == 0 {
                0.0
            } else {
                hits as f64 / lookups as f64
            },
            item_count: state.entries.len(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Removes every expired entry and returns how many were evicted.
    pub(crate) fn sweep(&self) -> usize {
        let (evicted, size) = {
            let mut state = self.state.write();
            let now = Instant::now();
            let before = state.entries.len();
            state.entries.retain(|_, entry| !entry.is_expired(now));
            (before - state.entries.len(), state.entries.len())
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(cache = %self.config.name, evicted, remaining = size, "cache sweep finished");

        self.emit(|name| CacheEvent::Swept {
            name,
            timestamp: std::time::Instant::now(),
            evicted,
        });
        self.record_eviction(evicted);
        self.record_size(size);
        evicted
    }

    pub(crate) fn close(&self) {
        self.shutdown.cancel();
    }

    fn record_miss(&self, key: &str) {
        self.emit(|name| CacheEvent::Miss {
            name,
            timestamp: std::time::Instant::now(),
            key: key.to_string(),
        });
        self.record_request("miss");
    }

    fn emit(&self, event: impl FnOnce(String) -> CacheEvent) {
        if !self.config.event_listeners.is_empty() {
            self.config
                .event_listeners
                .emit(&event(self.config.name.clone()));
        }
    }

    #[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
    fn record_request(&self, result: &'static str) {
        #[cfg(feature = "metrics")]
        counter!("cache_requests_total", "cache" => self.config.name.clone(), "result" => result)
            .increment(1);
    }

    #[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
    fn record_eviction(&self, evicted: usize) {
        #[cfg(feature = "metrics")]
        {
            if evicted > 0 {
                counter!("cache_evictions_total", "cache" => self.config.name.clone())
                    .increment(evicted as u64);
            }
        }
    }

    #[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
    fn record_size(&self, size: usize) {
        #[cfg(feature = "metrics")]
        gauge!("cache_size", "cache" => self.config.name.clone()).set(size as f64);
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
