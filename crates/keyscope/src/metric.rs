//! Named accumulators attached to every tree node.
//!
//! New metrics are added as new [`Metric`] variants; the tree only ever sees
//! `(Metric, u64)` pairs and never branches on which metric it is summing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Metric tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Metric {
    /// Sum of per-key memory cost reported by the store.
    BytesSize,
    /// Number of keys.
    KeysCount,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::BytesSize => "BytesSize",
            Metric::KeysCount => "KeysCount",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric values for one scanned key: `BytesSize = cost`, `KeysCount = 1`.
pub fn key_sample(cost: u64) -> [(Metric, u64); 2] {
    [(Metric::BytesSize, cost), (Metric::KeysCount, 1)]
}

/// Accumulated metric totals. Absent metrics read as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metrics {
    values: BTreeMap<Metric, u64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, metric: Metric) -> u64 {
        self.values.get(&metric).copied().unwrap_or(0)
    }

    pub fn add(&mut self, metric: Metric, value: u64) {
        let slot = self.values.entry(metric).or_insert(0);
        *slot = slot.saturating_add(value);
    }

    pub fn add_all(&mut self, values: &[(Metric, u64)]) {
        for &(metric, value) in values {
            self.add(metric, value);
        }
    }

    /// Fold another accumulator into this one.
    pub fn merge(&mut self, other: &Metrics) {
        for (&metric, &value) in &other.values {
            self.add(metric, value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_metric_reads_zero() {
        let metrics = Metrics::new();
        assert_eq!(metrics.get(Metric::BytesSize), 0);
        assert!(metrics.is_empty());
    }

    #[test]
    fn test_add_accumulates_per_metric() {
        let mut metrics = Metrics::new();
        metrics.add_all(&key_sample(10));
        metrics.add_all(&key_sample(32));
        assert_eq!(metrics.get(Metric::BytesSize), 42);
        assert_eq!(metrics.get(Metric::KeysCount), 2);
    }

    #[test]
    fn test_merge() {
        let mut a = Metrics::new();
        a.add(Metric::BytesSize, 5);
        let mut b = Metrics::new();
        b.add(Metric::BytesSize, 7);
        b.add(Metric::KeysCount, 1);
        a.merge(&b);
        assert_eq!(a.get(Metric::BytesSize), 12);
        assert_eq!(a.get(Metric::KeysCount), 1);
    }

    #[test]
    fn test_serializes_as_named_map() {
        let mut metrics = Metrics::new();
        metrics.add_all(&key_sample(64));
        let json = serde_json::to_string(&metrics).unwrap();
        assert_eq!(json, r#"{"BytesSize":64,"KeysCount":1}"#);
    }
}
