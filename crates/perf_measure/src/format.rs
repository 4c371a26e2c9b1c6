//! Human-readable rendering of byte counts, clock times and durations.

use chrono::{Local, TimeZone, Utc};

use crate::config::ClockZone;

/// Placeholder rendered for a value that could not be captured.
pub const UNDEFINED: &str = "undefined";

/// Placeholder rendered for a timestamp outside the representable range.
pub const INVALID_DATE: &str = "Invalid date";

/// Largest number of decimal places [`format_bytes`] renders.
pub const MAX_BYTE_DECIMALS: usize = 100;

/// Beyond this many places an `f64` has no digits left to round.
const SCALED_ROUNDING_LIMIT: i32 = 15;

const UNITS: [&str; 9] = ["Bytes", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Render a byte count with base-1024 units.
///
/// The value is rounded to `decimals` places, halves away from zero, and
/// trailing zeros are dropped, so `12_897_484` bytes at two decimals renders
/// as `"12.3 MB"` and `1280` bytes at one decimal as `"1.3 KB"`. `decimals`
/// is capped at [`MAX_BYTE_DECIMALS`].
pub fn format_bytes(bytes: u64, decimals: usize) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let decimals = decimals.min(MAX_BYTE_DECIMALS);
    let rounded = match i32::try_from(decimals) {
        Ok(places) if places <= SCALED_ROUNDING_LIMIT => {
            let factor = 10f64.powi(places);
            (value * factor).round() / factor
        }
        _ => format!("{value:.decimals$}").parse().unwrap_or(value),
    };
    format!("{} {}", rounded, UNITS[unit])
}

/// Render `origin_ms + timestamp_ms` (milliseconds since the Unix epoch) as a
/// 12-hour `hh:mm:ss` clock time.
pub fn format_clock(origin_ms: f64, timestamp_ms: f64, zone: ClockZone) -> String {
    let instant = origin_ms + timestamp_ms;
    if !instant.is_finite() {
        return INVALID_DATE.to_string();
    }

    let Some(utc) = Utc.timestamp_millis_opt(instant.trunc() as i64).single() else {
        return INVALID_DATE.to_string();
    };

    match zone {
        ClockZone::Utc => utc.format("%I:%M:%S").to_string(),
        ClockZone::Local => utc.with_timezone(&Local).format("%I:%M:%S").to_string(),
    }
}

/// Render a millisecond duration as `mm:ss:SSS`.
///
/// This reads the duration like a clock face: minutes wrap at 60.
pub fn format_duration(duration_ms: f64) -> String {
    if !duration_ms.is_finite() {
        return INVALID_DATE.to_string();
    }

    let total = duration_ms.trunc() as i64;
    let millis = total.rem_euclid(1000);
    let seconds = total.div_euclid(1000).rem_euclid(60);
    let minutes = total.div_euclid(60_000).rem_euclid(60);
    format!("{minutes:02}:{seconds:02}:{millis:03}")
}
