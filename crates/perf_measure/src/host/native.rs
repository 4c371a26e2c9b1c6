//! Host backed by the operating system.

use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use sysinfo::{ProcessesToUpdate, System};

use super::{EntryBus, EntryCallback, HostCapabilities, Subscription};
use crate::config::HostConfig;
use crate::entry::{EntryType, PerformanceEntry};
use crate::sample::MemoryCounters;

/// Host for native processes.
///
/// The clock reads milliseconds since the host was created. Memory counters
/// describe the current process: `totalJSHeapSize` is its virtual memory,
/// `usedJSHeapSize` its resident memory and `jsHeapSizeLimit` the total
/// system memory. Entries are whatever the application publishes through
/// [`NativeHost::publish`].
///
/// Clones share the clock origin and the entry bus.
#[derive(Clone)]
pub struct NativeHost {
    origin: Instant,
    time_origin: f64,
    config: HostConfig,
    bus: EntryBus,
    system: Arc<Mutex<System>>,
}

impl Default for NativeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeHost {
    /// Create a host with every capability enabled.
    pub fn new() -> Self {
        Self::with_config(HostConfig::default())
    }

    /// Create a host exposing only the capabilities enabled in `config`.
    pub fn with_config(config: HostConfig) -> Self {
        let time_origin = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64() * 1000.0)
            .unwrap_or(0.0);

        Self {
            origin: Instant::now(),
            time_origin,
            config,
            bus: EntryBus::new(),
            system: Arc::new(Mutex::new(System::new())),
        }
    }

    /// The capabilities this host exposes.
    pub fn config(&self) -> HostConfig {
        self.config
    }

    /// The bus entries are published on.
    pub fn entries(&self) -> &EntryBus {
        &self.bus
    }

    /// Publish a batch of entries to subscribers.
    pub fn publish(&self, entries: &[PerformanceEntry]) -> usize {
        self.bus.publish(entries)
    }

    fn process_memory(&self) -> Option<MemoryCounters> {
        let pid = sysinfo::get_current_pid().ok()?;
        let mut system = self.system.lock().ok()?;

        system.refresh_memory();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

        let process = system.process(pid)?;
        Some(MemoryCounters::heap(
            process.virtual_memory(),
            process.memory(),
            system.total_memory(),
        ))
    }
}

impl HostCapabilities for NativeHost {
    fn now(&self) -> Option<f64> {
        Some(self.origin.elapsed().as_secs_f64() * 1000.0)
    }

    fn time_origin(&self) -> f64 {
        self.time_origin
    }

    fn memory_snapshot(&self) -> Option<MemoryCounters> {
        if !self.config.memory_enabled {
            return None;
        }

        let counters = self.process_memory();
        if counters.is_none() {
            tracing::debug!(target: "perf_measure::memory", "process memory unavailable");
        }
        counters
    }

    fn subscribe_to_entries(
        &self,
        entry_types: &[EntryType],
        callback: EntryCallback,
    ) -> Option<Subscription> {
        if !self.config.observation_enabled {
            return None;
        }
        Some(self.bus.subscribe(entry_types, callback))
    }
}

impl std::fmt::Debug for NativeHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeHost")
            .field("time_origin", &self.time_origin)
            .field("config", &self.config)
            .field("bus", &self.bus)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_clock_is_monotonic() {
        let host = NativeHost::new();
        let first = host.now().unwrap();
        sleep(Duration::from_millis(5));
        let second = host.now().unwrap();
        assert!(second >= first + 4.0, "expected at least 4ms, got {}", second - first);
    }

    #[test]
    fn test_time_origin_is_wall_clock() {
        let host = NativeHost::new();
        // 2020-01-01T00:00:00Z
        assert!(host.time_origin() > 1_577_836_800_000.0);
    }

    #[test]
    fn test_memory_counters_describe_process() {
        let host = NativeHost::new();
        let Some(counters) = host.memory_snapshot() else {
            // Sandboxes without /proc access report nothing.
            return;
        };
        assert_eq!(counters.len(), 3);
        assert!(counters.used_heap_size().unwrap() > 0);
        assert!(counters.heap_size_limit().unwrap() > 0);
    }

    #[test]
    fn test_disabled_capabilities() {
        let host = NativeHost::with_config(HostConfig::default().with_memory(false).with_observation(false));
        assert!(host.memory_snapshot().is_none());
        assert!(host
            .subscribe_to_entries(&EntryType::OBSERVED, Box::new(|_: &[PerformanceEntry]| {}))
            .is_none());
        assert!(host.now().is_some());
    }

    #[test]
    fn test_publish_reaches_subscriber() {
        let host = NativeHost::new();
        let seen = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&seen);
        let subscription = host
            .subscribe_to_entries(
                &[EntryType::Resource],
                Box::new(move |entries: &[PerformanceEntry]| *sink.lock().unwrap() += entries.len()),
            )
            .unwrap();

        let clone = host.clone();
        assert_eq!(clone.publish(&[PerformanceEntry::resource("a.js")]), 1);
        assert_eq!(*seen.lock().unwrap(), 1);

        drop(subscription);
        assert_eq!(host.entries().subscriber_count(), 0);
    }
}
