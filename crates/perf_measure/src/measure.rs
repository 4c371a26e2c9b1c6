//! The measurement façade over a host's performance capabilities.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::assess::{assess_entry, log_assessment, Assessment};
use crate::capture::{Capability, Captured};
use crate::config::ReportConfig;
use crate::entry::{EntryType, PerformanceEntry};
use crate::format::{format_clock, format_duration, UNDEFINED};
use crate::host::{DefaultHost, EntryCallback, HostCapabilities, Subscription};
use crate::sample::{FormattedMemory, TimeSample, HEAP_SIZE_LIMIT, TOTAL_HEAP_SIZE, USED_HEAP_SIZE};
use crate::task::{callable_name, TaskOutput};

/// Two-sentence summary of a task's timing and memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub time_status: String,
    pub memory_status: String,
}

impl fmt::Display for PerformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.time_status)?;
        write!(f, "{}", self.memory_status)
    }
}

/// Times a callable, reads memory counters, and observes page-load entries.
///
/// The callable runs synchronously on the calling thread, exactly once per
/// [`measure_time`](Self::measure_time). Nothing isolates it: an `Err` it
/// returns propagates out of `measure_time` and [`get_report`](Self::get_report),
/// and a panic unwinds through them. Wrap the callable yourself if you need
/// isolation. For callables that only start asynchronous work, the measured
/// duration covers the synchronous part alone.
///
/// # Example
///
/// ```rust
/// use perf_measure::{MemoryCounters, PerformanceMeasure, ScriptedHost};
///
/// fn reindex(batch: &Vec<u32>) -> usize {
///     batch.len()
/// }
///
/// let host = ScriptedHost::new().with_memory(MemoryCounters::heap(2048, 1024, 4096));
/// let mut measure = PerformanceMeasure::with_host(reindex, vec![1, 2, 3], host);
///
/// let report = measure.get_report().unwrap();
/// assert!(report.time_status.starts_with("reindex began on"));
/// ```
pub struct PerformanceMeasure<F, P, H = DefaultHost> {
    target: F,
    params: P,
    task: String,
    host: H,
    config: ReportConfig,
    subscription: Option<Subscription>,
}

impl<F, P> PerformanceMeasure<F, P, DefaultHost> {
    /// Prepare a measurement of `target(&params)` on the platform host.
    pub fn new(target: F, params: P) -> Self {
        Self::with_host(target, params, DefaultHost::default())
    }
}

impl<F, P, H> PerformanceMeasure<F, P, H>
where
    H: HostCapabilities,
{
    /// Prepare a measurement of `target(&params)` on the given host.
    ///
    /// The display name comes from the callable's own name; closures have
    /// none.
    pub fn with_host(target: F, params: P, host: H) -> Self {
        Self {
            target,
            params,
            task: callable_name::<F>(),
            host,
            config: ReportConfig::default(),
            subscription: None,
        }
    }

    /// Override the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.task = name.into();
        self
    }

    /// Replace the report configuration.
    pub fn with_config(mut self, config: ReportConfig) -> Self {
        self.config = config;
        self
    }

    /// The callable's name, possibly empty.
    pub fn task(&self) -> &str {
        &self.task
    }

    /// The name used in reports and logs.
    pub fn display_name(&self) -> &str {
        if self.task.is_empty() {
            &self.config.fallback_task_name
        } else {
            &self.task
        }
    }

    /// The parameters passed to each invocation.
    pub fn params(&self) -> &P {
        &self.params
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Whether an entry subscription is active.
    pub fn is_observing(&self) -> bool {
        self.subscription.is_some()
    }

    /// Invoke the callable once and time it.
    ///
    /// Without a host clock the callable is not invoked; a warning is logged
    /// and the result is [`Captured::Unsupported`].
    pub fn measure_time<R>(&mut self) -> Result<Captured<TimeSample>, R::Error>
    where
        F: FnMut(&P) -> R,
        R: TaskOutput,
    {
        let Some(start_time) = self.host.now() else {
            tracing::warn!(
                target: "perf_measure::time",
                task = self.display_name(),
                "Performance is not supported"
            );
            return Ok(Captured::Unsupported(Capability::HighResolutionTime));
        };

        (self.target)(&self.params).into_outcome()?;

        let end_time = self.host.now().unwrap_or(start_time);
        let sample = TimeSample::new(start_time, end_time);

        tracing::debug!(
            target: "perf_measure::time",
            task = self.display_name(),
            start_time = sample.start_time,
            elapsed_ms = sample.duration,
            "task timed"
        );

        Ok(Captured::Sampled(sample))
    }

    /// Read the host's memory counters, rendered human-readable.
    ///
    /// Without memory instrumentation a warning is logged and the result is
    /// [`Captured::Unsupported`].
    pub fn measure_memory(&self) -> Captured<FormattedMemory> {
        match self.host.memory_snapshot() {
            Some(counters) => {
                tracing::trace!(
                    target: "perf_measure::memory",
                    task = self.display_name(),
                    counters = counters.len(),
                    "memory sampled"
                );
                Captured::Sampled(counters.format(self.config.byte_decimals))
            }
            None => {
                tracing::warn!(
                    target: "perf_measure::memory",
                    task = self.display_name(),
                    "No memory evaluation support"
                );
                Captured::Unsupported(Capability::Memory)
            }
        }
    }

    /// Sample memory, time one invocation, and describe both.
    ///
    /// Values that could not be captured render as `undefined`.
    pub fn get_report<R>(&mut self) -> Result<PerformanceReport, R::Error>
    where
        F: FnMut(&P) -> R,
        R: TaskOutput,
    {
        let memory = self.measure_memory();
        let time = self.measure_time()?;

        let task = self.display_name();
        let origin = self.host.time_origin();
        let zone = self.config.clock_zone;

        let (began, took, ended) = match time.sample() {
            Some(sample) => (
                format_clock(origin, sample.start_time, zone),
                format_duration(sample.duration),
                format_clock(origin, sample.end_time, zone),
            ),
            None => (
                UNDEFINED.to_string(),
                UNDEFINED.to_string(),
                UNDEFINED.to_string(),
            ),
        };

        let counter = |name: &str| {
            memory
                .sample()
                .and_then(|m| m.get(name))
                .unwrap_or(UNDEFINED)
                .to_string()
        };

        Ok(PerformanceReport {
            time_status: format!(
                "{task} began on {began} and took {took} seconds ending at {ended}"
            ),
            memory_status: format!(
                "{task} has allocated {} memory out of total available {}, used memory out of allocation was {}",
                counter(TOTAL_HEAP_SIZE),
                counter(HEAP_SIZE_LIMIT),
                counter(USED_HEAP_SIZE),
            ),
        })
    }

    /// Assess one timing entry and log the result.
    ///
    /// Paint entries log their start time and duration only; every other
    /// entry logs its derived page-load intervals.
    pub fn assess_page_load(&self, entry: &PerformanceEntry) -> Assessment {
        let assessment = assess_entry(entry);
        log_assessment(self.display_name(), entry, &assessment);
        assessment
    }

    /// Start assessing every navigation, resource and paint entry the host
    /// delivers, in delivery order.
    ///
    /// Returns whether a subscription is active. Without entry observation
    /// this does nothing and returns `false`. A second call replaces the
    /// earlier subscription.
    pub fn evaluate_performance(&mut self) -> bool {
        let task = self.display_name().to_string();
        let callback: EntryCallback = Box::new(move |entries: &[PerformanceEntry]| {
            for entry in entries {
                let assessment = assess_entry(entry);
                log_assessment(&task, entry, &assessment);
            }
        });

        let Some(subscription) = self
            .host
            .subscribe_to_entries(&EntryType::OBSERVED, callback)
        else {
            return false;
        };

        tracing::debug!(
            target: "perf_measure::observer",
            task = self.display_name(),
            entry_types = ?subscription.entry_types(),
            "observing performance entries"
        );
        self.subscription = Some(subscription);
        true
    }

    /// Release the entry subscription, if any. Returns whether one was
    /// active.
    pub fn stop_observing(&mut self) -> bool {
        match self.subscription.take() {
            Some(subscription) => {
                subscription.unsubscribe();
                tracing::debug!(
                    target: "perf_measure::observer",
                    task = self.display_name(),
                    "stopped observing performance entries"
                );
                true
            }
            None => false,
        }
    }
}

impl<F, P: fmt::Debug, H: fmt::Debug> fmt::Debug for PerformanceMeasure<F, P, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerformanceMeasure")
            .field("task", &self.task)
            .field("params", &self.params)
            .field("host", &self.host)
            .field("config", &self.config)
            .field("subscription", &self.subscription)
            .finish()
    }
}
