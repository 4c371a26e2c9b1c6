//! Page-load assessment of navigation, resource and paint entries.
//!
//! Every interval is a plain subtraction of two entry timestamps. Nothing is
//! clamped: a host that reports phases out of order yields negative values,
//! and an entry without an encoded body yields an infinite or NaN
//! compression ratio.

use serde::{Deserialize, Serialize};

use crate::entry::PerformanceEntry;

/// Intervals derived from a navigation or resource entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLoadTimings {
    /// DNS lookup time
    pub dns_time: f64,
    /// Total connection time
    pub connection_time: f64,
    /// TLS negotiation time, zero when no secure connection was made
    pub tls_time: f64,
    /// Cache seek plus response time
    pub fetch_time: f64,
    /// Service worker plus response time, zero without a worker
    pub worker_time: f64,
    /// Request plus response time (network only)
    pub total_time: f64,
    /// Response download time
    pub download_time: f64,
    /// Time to first byte
    pub ttfb: f64,
    /// Transfer size minus encoded body size
    pub header_size: f64,
    /// Decoded body size over encoded body size
    pub compression_ratio: f64,
}

impl PageLoadTimings {
    /// Derive the intervals from an entry.
    pub fn from_entry(entry: &PerformanceEntry) -> Self {
        let tls_time = if entry.secure_connection_start > 0.0 {
            entry.connect_end - entry.secure_connection_start
        } else {
            0.0
        };

        let worker_time = if entry.worker_start > 0.0 {
            entry.response_end - entry.worker_start
        } else {
            0.0
        };

        Self {
            dns_time: entry.domain_lookup_end - entry.domain_lookup_start,
            connection_time: entry.connect_end - entry.connect_start,
            tls_time,
            fetch_time: entry.response_end - entry.fetch_start,
            worker_time,
            total_time: entry.response_end - entry.request_start,
            download_time: entry.response_end - entry.response_start,
            ttfb: entry.response_start - entry.request_start,
            header_size: entry.transfer_size - entry.encoded_body_size,
            compression_ratio: entry.decoded_body_size / entry.encoded_body_size,
        }
    }
}

/// What an assessment found for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Assessment {
    /// A rendering milestone; no intervals are derived
    #[serde(rename_all = "camelCase")]
    Paint { start_time: f64, duration: f64 },
    /// A fetch with its derived intervals
    Load(PageLoadTimings),
}

impl Assessment {
    /// The derived intervals, for non-paint entries.
    pub fn timings(&self) -> Option<&PageLoadTimings> {
        match self {
            Assessment::Paint { .. } => None,
            Assessment::Load(timings) => Some(timings),
        }
    }
}

/// Assess an entry without logging.
pub fn assess_entry(entry: &PerformanceEntry) -> Assessment {
    if entry.is_paint() {
        return Assessment::Paint {
            start_time: entry.start_time,
            duration: entry.duration,
        };
    }
    Assessment::Load(PageLoadTimings::from_entry(entry))
}

/// Emit the single log line describing an assessment.
pub(crate) fn log_assessment(task: &str, entry: &PerformanceEntry, assessment: &Assessment) {
    match assessment {
        Assessment::Paint {
            start_time,
            duration,
        } => {
            tracing::info!(
                target: "perf_measure::page_load",
                task = task,
                name = %entry.name,
                start_time = *start_time,
                duration = *duration,
                "Started paint at {} for duration {}",
                start_time,
                duration
            );
        }
        Assessment::Load(t) => {
            tracing::info!(
                target: "perf_measure::page_load",
                task = task,
                name = %entry.name,
                entry_type = %entry.entry_type,
                dns_ms = t.dns_time,
                connection_ms = t.connection_time,
                tls_ms = t.tls_time,
                fetch_ms = t.fetch_time,
                worker_ms = t.worker_time,
                total_ms = t.total_time,
                download_ms = t.download_time,
                ttfb_ms = t.ttfb,
                header_bytes = t.header_size,
                compression_ratio = t.compression_ratio,
                "page load assessed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryType;
    use proptest::prelude::*;

    fn sample_navigation() -> PerformanceEntry {
        PerformanceEntry {
            domain_lookup_start: 10.0,
            domain_lookup_end: 30.0,
            connect_start: 30.0,
            connect_end: 300.0,
            secure_connection_start: 150.0,
            fetch_start: 5.0,
            worker_start: 0.0,
            request_start: 310.0,
            response_start: 400.0,
            response_end: 520.0,
            transfer_size: 1300.0,
            encoded_body_size: 1000.0,
            decoded_body_size: 4000.0,
            ..PerformanceEntry::navigation("https://example.com/")
        }
    }

    #[test]
    fn test_navigation_intervals() {
        let timings = PageLoadTimings::from_entry(&sample_navigation());

        assert_eq!(timings.dns_time, 20.0);
        assert_eq!(timings.connection_time, 270.0);
        assert_eq!(timings.tls_time, 150.0);
        assert_eq!(timings.fetch_time, 515.0);
        assert_eq!(timings.worker_time, 0.0);
        assert_eq!(timings.total_time, 210.0);
        assert_eq!(timings.download_time, 120.0);
        assert_eq!(timings.ttfb, 90.0);
        assert_eq!(timings.header_size, 300.0);
        assert_eq!(timings.compression_ratio, 4.0);
    }

    #[test]
    fn test_tls_time_zero_without_secure_connection() {
        let entry = PerformanceEntry {
            secure_connection_start: 0.0,
            ..sample_navigation()
        };
        assert_eq!(PageLoadTimings::from_entry(&entry).tls_time, 0.0);
    }

    #[test]
    fn test_worker_time_with_service_worker() {
        let entry = PerformanceEntry {
            worker_start: 2.0,
            ..sample_navigation()
        };
        assert_eq!(PageLoadTimings::from_entry(&entry).worker_time, 518.0);
    }

    #[test]
    fn test_compression_ratio_divides_by_zero() {
        // Known sharp edge: an empty encoded body is not guarded.
        let entry = PerformanceEntry {
            encoded_body_size: 0.0,
            decoded_body_size: 4000.0,
            ..sample_navigation()
        };
        assert!(PageLoadTimings::from_entry(&entry).compression_ratio.is_infinite());

        let entry = PerformanceEntry {
            encoded_body_size: 0.0,
            decoded_body_size: 0.0,
            ..sample_navigation()
        };
        assert!(PageLoadTimings::from_entry(&entry).compression_ratio.is_nan());
    }

    #[test]
    fn test_paint_entry_skips_intervals() {
        let entry = PerformanceEntry::paint("first-paint", 431.5, 0.0);
        let assessment = assess_entry(&entry);

        assert_eq!(
            assessment,
            Assessment::Paint {
                start_time: 431.5,
                duration: 0.0
            }
        );
        assert!(assessment.timings().is_none());
    }

    #[test]
    fn test_resource_and_unknown_entries_are_assessed() {
        let entry = PerformanceEntry {
            entry_type: EntryType::Resource,
            ..sample_navigation()
        };
        assert!(assess_entry(&entry).timings().is_some());

        let entry = PerformanceEntry {
            entry_type: EntryType::Other("longtask".to_string()),
            ..sample_navigation()
        };
        assert!(assess_entry(&entry).timings().is_some());
    }

    #[test]
    fn test_assessment_serialization() {
        let json = serde_json::to_value(assess_entry(&sample_navigation())).unwrap();
        assert_eq!(json["kind"], "load");
        assert_eq!(json["tlsTime"], 150.0);

        let json = serde_json::to_value(assess_entry(&PerformanceEntry::paint("p", 1.0, 2.0))).unwrap();
        assert_eq!(json["kind"], "paint");
        assert_eq!(json["startTime"], 1.0);
    }

    proptest! {
        #[test]
        fn prop_tls_time_follows_secure_connection(
            secure in 0.0f64..1000.0,
            connect_end in 0.0f64..2000.0,
        ) {
            let entry = PerformanceEntry {
                secure_connection_start: secure,
                connect_end,
                ..PerformanceEntry::navigation("n")
            };
            let tls = PageLoadTimings::from_entry(&entry).tls_time;
            if secure > 0.0 {
                prop_assert_eq!(tls, connect_end - secure);
            } else {
                prop_assert_eq!(tls, 0.0);
            }
        }

        #[test]
        fn prop_compression_ratio(encoded in 1.0f64..1.0e7, factor in 1.0f64..20.0) {
            let entry = PerformanceEntry {
                encoded_body_size: encoded,
                decoded_body_size: encoded * factor,
                ..PerformanceEntry::resource("r")
            };
            let ratio = PageLoadTimings::from_entry(&entry).compression_ratio;
            prop_assert!((ratio - factor).abs() < 1e-9);
        }
    }
}
