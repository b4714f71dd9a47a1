use crate::key::series_key;
use crate::MetricsCollector;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Point-in-time copy of everything an [`InMemoryMetrics`] has recorded.
///
/// Maps are keyed by the canonical series key (`name,k1=v1,...`) and sorted,
/// so two snapshots of the same data compare and serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub counters: BTreeMap<String, i64>,
    pub gauges: BTreeMap<String, f64>,
    pub histograms: BTreeMap<String, Vec<f64>>,
}

impl MetricsSnapshot {
    /// Counter value for the series, 0 if it was never incremented.
    pub fn counter(&self, name: &str, tags: &[(&str, &str)]) -> i64 {
        self.counters
            .get(&series_key(name, tags))
            .copied()
            .unwrap_or(0)
    }

    pub fn gauge(&self, name: &str, tags: &[(&str, &str)]) -> Option<f64> {
        self.gauges.get(&series_key(name, tags)).copied()
    }

    /// Samples for the series in recording order.
    pub fn histogram(&self, name: &str, tags: &[(&str, &str)]) -> &[f64] {
        self.histograms
            .get(&series_key(name, tags))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Sum of every counter series whose name is `name`, whatever its tags.
    pub fn counter_total(&self, name: &str) -> i64 {
        self.counters
            .iter()
            .filter(|(key, _)| series_name(key) == name)
            .map(|(_, value)| *value)
            .sum()
    }
}

fn series_name(key: &str) -> &str {
    key.split(',').next().unwrap_or(key)
}

#[derive(Debug, Default)]
struct Aggregates {
    counters: HashMap<String, i64>,
    gauges: HashMap<String, f64>,
    histograms: HashMap<String, Vec<f64>>,
}

/// Collector that keeps every series in process memory.
///
/// Nothing is ever evicted. Clone the collector behind an `Arc` to share it
/// between clients; each instance is independent otherwise.
///
/// With the `metrics` feature every record is also forwarded to the
/// `metrics` facade, so an installed recorder sees the same series.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    inner: RwLock<Aggregates>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies the current aggregates out under the read lock.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.read();
        MetricsSnapshot {
            counters: inner
                .counters
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
            gauges: inner.gauges.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            histograms: inner
                .histograms
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Alias of [`snapshot`](Self::snapshot).
    pub fn get_stats(&self) -> MetricsSnapshot {
        self.snapshot()
    }

    pub fn counter(&self, name: &str, tags: &[(&str, &str)]) -> i64 {
        self.inner
            .read()
            .counters
            .get(&series_key(name, tags))
            .copied()
            .unwrap_or(0)
    }

    pub fn gauge(&self, name: &str, tags: &[(&str, &str)]) -> Option<f64> {
        self.inner
            .read()
            .gauges
            .get(&series_key(name, tags))
            .copied()
    }

    pub fn histogram(&self, name: &str, tags: &[(&str, &str)]) -> Vec<f64> {
        self.inner
            .read()
            .histograms
            .get(&series_key(name, tags))
            .cloned()
            .unwrap_or_default()
    }
}

impl MetricsCollector for InMemoryMetrics {
    fn increment_counter(&self, name: &str, tags: &[(&str, &str)]) {
        let key = series_key(name, tags);
        *self.inner.write().counters.entry(key).or_insert(0) += 1;

        #[cfg(feature = "metrics")]
        metrics::counter!(name.to_owned(), facade::labels(tags)).increment(1);
    }

    fn record_histogram(&self, name: &str, value: f64, tags: &[(&str, &str)]) {
        let key = series_key(name, tags);
        self.inner
            .write()
            .histograms
            .entry(key)
            .or_default()
            .push(value);

        #[cfg(feature = "metrics")]
        metrics::histogram!(name.to_owned(), facade::labels(tags)).record(value);
    }

    fn record_gauge(&self, name: &str, value: f64, tags: &[(&str, &str)]) {
        let key = series_key(name, tags);
        self.inner.write().gauges.insert(key, value);

        #[cfg(feature = "metrics")]
        metrics::gauge!(name.to_owned(), facade::labels(tags)).set(value);
    }
}

#[cfg(feature = "metrics")]
mod facade {
    use metrics::Label;

    pub(super) fn labels(tags: &[(&str, &str)]) -> Vec<Label> {
        tags.iter()
            .map(|(k, v)| Label::new(k.to_string(), v.to_string()))
            .collect()
    }
}
