//! Report and host configuration.

use serde::{Deserialize, Serialize};

use crate::error::{PerfError, PerfResult};
use crate::format::MAX_BYTE_DECIMALS;

/// Time zone used when rendering clock times in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClockZone {
    /// Coordinated universal time
    Utc,
    /// The process's local time zone
    #[default]
    Local,
}

/// Rendering options for [`crate::PerformanceReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportConfig {
    /// Decimal places kept when formatting byte counts, at most
    /// [`MAX_BYTE_DECIMALS`]
    pub byte_decimals: usize,
    /// Name used when the measured callable has none
    pub fallback_task_name: String,
    /// Zone for `hh:mm:ss` clock times
    pub clock_zone: ClockZone,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            byte_decimals: 2,
            fallback_task_name: "Task".to_string(),
            clock_zone: ClockZone::Local,
        }
    }
}

impl ReportConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of decimal places for byte counts, capped at
    /// [`MAX_BYTE_DECIMALS`].
    pub fn with_byte_decimals(mut self, decimals: usize) -> Self {
        self.byte_decimals = decimals.min(MAX_BYTE_DECIMALS);
        self
    }

    /// Set the name used for unnamed callables.
    pub fn with_fallback_task_name(mut self, name: impl Into<String>) -> Self {
        self.fallback_task_name = name.into();
        self
    }

    /// Set the zone for clock times.
    pub fn with_clock_zone(mut self, zone: ClockZone) -> Self {
        self.clock_zone = zone;
        self
    }

    /// Parse a configuration from JSON. Missing keys take their defaults.
    pub fn from_json(json: &str) -> PerfResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is in range.
    pub fn validate(&self) -> PerfResult<()> {
        if self.byte_decimals > MAX_BYTE_DECIMALS {
            return Err(PerfError::InvalidConfig(format!(
                "byteDecimals must be at most {MAX_BYTE_DECIMALS}, got {}",
                self.byte_decimals
            )));
        }
        Ok(())
    }
}

/// Which optional capabilities a host should expose.
///
/// Switching a capability off makes the host behave like a runtime that
/// lacks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostConfig {
    /// Expose heap size counters
    pub memory_enabled: bool,
    /// Expose timing entry observation
    pub observation_enabled: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            memory_enabled: true,
            observation_enabled: true,
        }
    }
}

impl HostConfig {
    /// Enable or disable memory counters.
    pub fn with_memory(mut self, enabled: bool) -> Self {
        self.memory_enabled = enabled;
        self
    }

    /// Enable or disable entry observation.
    pub fn with_observation(mut self, enabled: bool) -> Self {
        self.observation_enabled = enabled;
        self
    }

    /// Parse a configuration from JSON. Missing keys take their defaults.
    pub fn from_json(json: &str) -> PerfResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
