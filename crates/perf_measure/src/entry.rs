//! Performance timing entries delivered by a host observer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a performance timing entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntryType {
    /// Document navigation timing
    Navigation,
    /// Subresource fetch timing
    Resource,
    /// Rendering milestone
    Paint,
    /// Any entry type this crate does not interpret
    Other(String),
}

impl EntryType {
    /// The entry types observed by [`crate::PerformanceMeasure::evaluate_performance`].
    pub const OBSERVED: [EntryType; 3] = [EntryType::Navigation, EntryType::Resource, EntryType::Paint];

    /// The host's name for this entry type.
    pub fn as_str(&self) -> &str {
        match self {
            EntryType::Navigation => "navigation",
            EntryType::Resource => "resource",
            EntryType::Paint => "paint",
            EntryType::Other(name) => name,
        }
    }
}

impl From<&str> for EntryType {
    fn from(name: &str) -> Self {
        match name {
            "navigation" => EntryType::Navigation,
            "resource" => EntryType::Resource,
            "paint" => EntryType::Paint,
            other => EntryType::Other(other.to_string()),
        }
    }
}

impl From<String> for EntryType {
    fn from(name: String) -> Self {
        EntryType::from(name.as_str())
    }
}

impl From<EntryType> for String {
    fn from(entry_type: EntryType) -> Self {
        entry_type.as_str().to_string()
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A timing record for a fetch or a rendering milestone.
///
/// Timestamps are milliseconds relative to the host's time origin, sizes are
/// bytes. Fields a host does not report read as zero, which is also what
/// browsers report for phases that did not happen (for example
/// `secure_connection_start` on a plain HTTP fetch).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceEntry {
    #[serde(default)]
    pub name: String,
    pub entry_type: EntryType,
    #[serde(default)]
    pub start_time: f64,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub domain_lookup_start: f64,
    #[serde(default)]
    pub domain_lookup_end: f64,
    #[serde(default)]
    pub connect_start: f64,
    #[serde(default)]
    pub connect_end: f64,
    #[serde(default)]
    pub secure_connection_start: f64,
    #[serde(default)]
    pub fetch_start: f64,
    #[serde(default)]
    pub worker_start: f64,
    #[serde(default)]
    pub request_start: f64,
    #[serde(default)]
    pub response_start: f64,
    #[serde(default)]
    pub response_end: f64,
    #[serde(default)]
    pub transfer_size: f64,
    #[serde(default)]
    pub encoded_body_size: f64,
    #[serde(default)]
    pub decoded_body_size: f64,
}

impl PerformanceEntry {
    /// Create an entry with every timestamp and size at zero.
    pub fn new(entry_type: EntryType, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entry_type,
            start_time: 0.0,
            duration: 0.0,
            domain_lookup_start: 0.0,
            domain_lookup_end: 0.0,
            connect_start: 0.0,
            connect_end: 0.0,
            secure_connection_start: 0.0,
            fetch_start: 0.0,
            worker_start: 0.0,
            request_start: 0.0,
            response_start: 0.0,
            response_end: 0.0,
            transfer_size: 0.0,
            encoded_body_size: 0.0,
            decoded_body_size: 0.0,
        }
    }

    /// Create a navigation entry.
    pub fn navigation(name: impl Into<String>) -> Self {
        Self::new(EntryType::Navigation, name)
    }

    /// Create a resource entry.
    pub fn resource(name: impl Into<String>) -> Self {
        Self::new(EntryType::Resource, name)
    }

    /// Create a paint entry.
    pub fn paint(name: impl Into<String>, start_time: f64, duration: f64) -> Self {
        Self {
            start_time,
            duration,
            ..Self::new(EntryType::Paint, name)
        }
    }

    /// Whether this entry marks a rendering milestone.
    pub fn is_paint(&self) -> bool {
        self.entry_type == EntryType::Paint
    }
}
