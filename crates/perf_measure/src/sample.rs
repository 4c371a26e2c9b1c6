//! Time and memory samples.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::format::format_bytes;

/// Counter holding the bytes currently allocated to the heap.
pub const TOTAL_HEAP_SIZE: &str = "totalJSHeapSize";
/// Counter holding the bytes of the heap in use.
pub const USED_HEAP_SIZE: &str = "usedJSHeapSize";
/// Counter holding the maximum heap size available.
pub const HEAP_SIZE_LIMIT: &str = "jsHeapSizeLimit";

/// Timing of a single task invocation, in milliseconds since the host's time
/// origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSample {
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
}

impl TimeSample {
    /// Build a sample from two clock readings.
    pub fn new(start_time: f64, end_time: f64) -> Self {
        Self {
            start_time,
            end_time,
            duration: end_time - start_time,
        }
    }

    /// The duration as a `Duration`, clamped at zero.
    pub fn elapsed(&self) -> Duration {
        if self.duration.is_finite() && self.duration > 0.0 {
            Duration::from_secs_f64(self.duration / 1000.0)
        } else {
            Duration::ZERO
        }
    }
}

/// Raw memory counters reported by a host, keyed by counter name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryCounters(BTreeMap<String, u64>);

impl MemoryCounters {
    /// Create an empty set of counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the three standard heap counters.
    pub fn heap(total_heap_size: u64, used_heap_size: u64, heap_size_limit: u64) -> Self {
        Self::new()
            .with_counter(TOTAL_HEAP_SIZE, total_heap_size)
            .with_counter(USED_HEAP_SIZE, used_heap_size)
            .with_counter(HEAP_SIZE_LIMIT, heap_size_limit)
    }

    /// Add a counter.
    pub fn with_counter(mut self, name: impl Into<String>, bytes: u64) -> Self {
        self.insert(name, bytes);
        self
    }

    /// Set a counter, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, bytes: u64) {
        self.0.insert(name.into(), bytes);
    }

    /// Get a counter by name.
    pub fn get(&self, name: &str) -> Option<u64> {
        self.0.get(name).copied()
    }

    pub fn total_heap_size(&self) -> Option<u64> {
        self.get(TOTAL_HEAP_SIZE)
    }

    pub fn used_heap_size(&self) -> Option<u64> {
        self.get(USED_HEAP_SIZE)
    }

    pub fn heap_size_limit(&self) -> Option<u64> {
        self.get(HEAP_SIZE_LIMIT)
    }

    /// Number of counters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no counters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate counters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(name, bytes)| (name.as_str(), *bytes))
    }

    /// Render every counter with [`format_bytes`].
    pub fn format(&self, decimals: usize) -> FormattedMemory {
        FormattedMemory(
            self.0
                .iter()
                .map(|(name, bytes)| (name.clone(), format_bytes(*bytes, decimals)))
                .collect(),
        )
    }
}

/// Memory counters rendered as human-readable strings, keyed by counter name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormattedMemory(BTreeMap<String, String>);

impl FormattedMemory {
    /// Get a rendered counter by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn total_heap_size(&self) -> Option<&str> {
        self.get(TOTAL_HEAP_SIZE)
    }

    pub fn used_heap_size(&self) -> Option<&str> {
        self.get(USED_HEAP_SIZE)
    }

    pub fn heap_size_limit(&self) -> Option<&str> {
        self.get(HEAP_SIZE_LIMIT)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }
}
