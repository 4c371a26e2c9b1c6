//! Error types for performance measurement.

use thiserror::Error;

use crate::capture::Capability;

/// Errors that can occur while measuring.
///
/// The measured callable's own error type never appears here: it propagates
/// out of [`crate::PerformanceMeasure::measure_time`] unchanged.
#[derive(Debug, Error)]
pub enum PerfError {
    /// The host does not expose the requested capability
    #[error("{0} is not supported by this host")]
    Unsupported(Capability),

    /// Failed to parse a configuration document
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// A configuration value is out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The host binding reported a failure
    #[error("Host error: {0}")]
    Host(String),
}

/// Result type for performance measurement operations.
pub type PerfResult<T> = Result<T, PerfError>;
