//! Capture results and the host capabilities they depend on.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PerfError, PerfResult};

/// A piece of host instrumentation a measurement relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    /// Monotonic millisecond clock relative to a time origin
    HighResolutionTime,
    /// Heap size counters
    Memory,
    /// Subscription to navigation/resource/paint timing entries
    EntryObservation,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Capability::HighResolutionTime => "High resolution time",
            Capability::Memory => "Memory instrumentation",
            Capability::EntryObservation => "Performance entry observation",
        };
        f.write_str(label)
    }
}

/// Outcome of asking the host for a sample.
///
/// Either the host produced a value, or it lacks the capability. Callers
/// branch on the tag instead of inspecting the shape of the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "camelCase")]
pub enum Captured<T> {
    /// The host produced a sample
    Sampled(T),
    /// The host does not expose the capability
    Unsupported(Capability),
}

impl<T> Captured<T> {
    /// Whether a sample was produced.
    pub fn is_sampled(&self) -> bool {
        matches!(self, Captured::Sampled(_))
    }

    /// Whether the capability was missing.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Captured::Unsupported(_))
    }

    /// Borrow the sample, if any.
    pub fn sample(&self) -> Option<&T> {
        match self {
            Captured::Sampled(value) => Some(value),
            Captured::Unsupported(_) => None,
        }
    }

    /// Take the sample, if any.
    pub fn into_sample(self) -> Option<T> {
        match self {
            Captured::Sampled(value) => Some(value),
            Captured::Unsupported(_) => None,
        }
    }

    /// The missing capability, if the capture failed.
    pub fn missing(&self) -> Option<Capability> {
        match self {
            Captured::Sampled(_) => None,
            Captured::Unsupported(capability) => Some(*capability),
        }
    }

    /// Transform the sample, keeping an unsupported result as is.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Captured<U> {
        match self {
            Captured::Sampled(value) => Captured::Sampled(f(value)),
            Captured::Unsupported(capability) => Captured::Unsupported(capability),
        }
    }

    /// Convert into a `Result` for use with `?`.
    pub fn into_result(self) -> PerfResult<T> {
        match self {
            Captured::Sampled(value) => Ok(value),
            Captured::Unsupported(capability) => Err(PerfError::Unsupported(capability)),
        }
    }
}
