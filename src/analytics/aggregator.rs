//! In-memory hit aggregation
//!
//! Counts geo-enriched hits by (date, identifier, country). The table lives
//! for one run and is drained once, at the end, in the order keys were first
//! seen.

use indexmap::IndexMap;
use tracing::debug;

use crate::analytics::models::HitKey;

/// Aggregated hit value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HitCount {
    pub count: u64,
}

/// Insertion-ordered hit table
#[derive(Debug, Default)]
pub struct HitAggregator {
    aggregates: IndexMap<HitKey, HitCount>,
}

impl HitAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the counter for a key, inserting it at zero first if absent
    pub fn record(&mut self, key: HitKey) {
        if !self.aggregates.contains_key(&key) {
            debug!(date = %key.date, uri = %key.uri, country = %key.country, "new hit key");
        }
        self.aggregates.entry(key).or_default().count += 1;
    }

    pub fn get(&self, key: &HitKey) -> Option<HitCount> {
        self.aggregates.get(key).copied()
    }

    /// Iterate in first-seen key order
    pub fn iter(&self) -> impl Iterator<Item = (&HitKey, &HitCount)> {
        self.aggregates.iter()
    }

    /// Drain all aggregated hits in first-seen key order
    pub fn drain(&mut self) -> Vec<(HitKey, HitCount)> {
        self.aggregates.drain(..).collect()
    }

    /// Sum of all counters
    pub fn total(&self) -> u64 {
        self.aggregates.values().map(|value| value.count).sum()
    }

    /// Get the current number of distinct keys
    pub fn len(&self) -> usize {
        self.aggregates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aggregates.is_empty()
    }
}
