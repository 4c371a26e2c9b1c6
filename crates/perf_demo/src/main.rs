//! Prints a timing and memory report for a sample workload.
//!
//! Set `PERF_MEASURE_CONFIG` to a JSON report configuration to override the
//! defaults, and `RUST_LOG=info` to see page-load assessments.

use std::env;
use std::fs;

use anyhow::{Context, Result};
use perf_measure::{NativeHost, PerformanceEntry, PerformanceMeasure, ReportConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CONFIG_ENV: &str = "PERF_MEASURE_CONFIG";

#[derive(Debug)]
struct Workload {
    words: Vec<String>,
    passes: usize,
}

impl Workload {
    fn sample() -> Self {
        let words = (0..50_000).map(|n| format!("word{}", n % 997)).collect();
        Self { words, passes: 20 }
    }
}

fn checksum(workload: &Workload) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325u64;
    for _ in 0..workload.passes {
        for word in &workload.words {
            for byte in word.bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(0x0100_0000_01b3);
            }
        }
    }
    hash
}

fn load_config() -> Result<ReportConfig> {
    let Ok(path) = env::var(CONFIG_ENV) else {
        return Ok(ReportConfig::default());
    };

    let json = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read report config {path}"))?;
    let config = ReportConfig::from_json(&json)
        .with_context(|| format!("Invalid report config {path}"))?;
    tracing::info!("Loaded report config from {}", path);
    Ok(config)
}

fn sample_entries() -> Vec<PerformanceEntry> {
    vec![
        PerformanceEntry {
            domain_lookup_start: 3.2,
            domain_lookup_end: 18.7,
            connect_start: 18.7,
            connect_end: 64.1,
            secure_connection_start: 31.0,
            fetch_start: 1.5,
            request_start: 64.9,
            response_start: 112.4,
            response_end: 158.0,
            transfer_size: 14_820.0,
            encoded_body_size: 14_300.0,
            decoded_body_size: 61_544.0,
            ..PerformanceEntry::navigation("https://localhost/index.html")
        },
        PerformanceEntry {
            fetch_start: 170.2,
            request_start: 171.0,
            response_start: 190.6,
            response_end: 204.9,
            transfer_size: 8_612.0,
            encoded_body_size: 8_312.0,
            decoded_body_size: 27_004.0,
            ..PerformanceEntry::resource("https://localhost/app.js")
        },
        PerformanceEntry::paint("first-paint", 231.8, 0.0),
        PerformanceEntry::paint("first-contentful-paint", 231.8, 0.0),
    ]
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = load_config()?;
    let host = NativeHost::new();
    let mut measure =
        PerformanceMeasure::with_host(checksum, Workload::sample(), host.clone()).with_config(config);

    if measure.evaluate_performance() {
        let assessed = host.publish(&sample_entries());
        tracing::info!("Assessed {} sample entries", assessed);
    }

    let report = measure.get_report()?;
    println!("{report}");
    println!("{}", serde_json::to_string_pretty(&report)?);

    measure.stop_observing();
    Ok(())
}
