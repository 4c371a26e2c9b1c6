//! Task Performance Measurement
//!
//! This crate wraps a callable and its parameters and reports on it using
//! whatever performance instrumentation the host offers:
//! - Wall-clock timing of a single synchronous invocation
//! - Human-readable heap counters
//! - A two-sentence timing and memory report
//! - Page-load interval assessment of navigation, resource and paint entries
//!
//! Host capabilities are injected through [`HostCapabilities`]. Native
//! targets default to [`NativeHost`]; browser targets default to `WebHost`.
//! A capability the host lacks yields [`Captured::Unsupported`] and a
//! warning in the log rather than an error.
//!
//! # Example
//!
//! ```rust
//! use perf_measure::{PerformanceMeasure, ScriptedHost};
//!
//! fn tokenize(source: &String) -> usize {
//!     source.split_whitespace().count()
//! }
//!
//! let mut measure = PerformanceMeasure::with_host(
//!     tokenize,
//!     "let x = 1;".to_string(),
//!     ScriptedHost::new(),
//! );
//!
//! let sample = measure.measure_time().unwrap();
//! assert!(sample.is_sampled());
//!
//! let report = measure.get_report().unwrap();
//! println!("{report}");
//! ```

mod assess;
mod capture;
mod config;
mod entry;
mod error;
mod format;
pub mod host;
mod measure;
mod sample;
mod task;

#[cfg(test)]
mod test_support;

pub use assess::*;
pub use capture::*;
pub use config::*;
pub use entry::*;
pub use error::*;
pub use format::*;
pub use host::{DefaultHost, EntryBus, EntryCallback, HostCapabilities, ScriptedHost, Subscription};
#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
pub use host::NativeHost;
#[cfg(all(target_family = "wasm", target_os = "unknown"))]
pub use host::WebHost;
pub use measure::*;
pub use sample::*;
pub use task::*;
