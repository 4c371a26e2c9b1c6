//! Deterministic host for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::{EntryBus, EntryCallback, HostCapabilities, Subscription};
use crate::entry::{EntryType, PerformanceEntry};
use crate::sample::MemoryCounters;

#[derive(Debug)]
struct ScriptState {
    clock_enabled: bool,
    readings: VecDeque<f64>,
    current: f64,
    tick_ms: f64,
    clock_reads: usize,
    time_origin: f64,
    memory: Option<MemoryCounters>,
    memory_reads: usize,
    observation_enabled: bool,
}

impl Default for ScriptState {
    fn default() -> Self {
        Self {
            clock_enabled: true,
            readings: VecDeque::new(),
            current: 0.0,
            tick_ms: 1.0,
            clock_reads: 0,
            time_origin: 0.0,
            memory: None,
            memory_reads: 0,
            observation_enabled: true,
        }
    }
}

/// A host whose every answer is scripted.
///
/// The clock first returns queued readings in order, then keeps advancing by
/// a fixed tick from the last one. Memory counters are absent unless set.
/// Entries reach subscribers only when [`ScriptedHost::deliver`] is called.
///
/// Clones share state, so a test can keep one clone to drive delivery while a
/// measurement owns another.
#[derive(Debug, Clone, Default)]
pub struct ScriptedHost {
    state: Arc<Mutex<ScriptState>>,
    bus: EntryBus,
}

impl ScriptedHost {
    /// A host with a clock ticking 1ms per read, no memory counters, and
    /// entry observation.
    pub fn new() -> Self {
        Self::default()
    }

    /// A host with no capabilities at all.
    pub fn unsupported() -> Self {
        Self::new().without_clock().without_observation()
    }

    fn update(self, f: impl FnOnce(&mut ScriptState)) -> Self {
        if let Ok(mut state) = self.state.lock() {
            f(&mut state);
        }
        self
    }

    /// Queue exact clock readings.
    pub fn with_readings(self, readings: impl IntoIterator<Item = f64>) -> Self {
        self.update(|s| s.readings.extend(readings))
    }

    /// Set how far the clock advances per read once queued readings run out.
    pub fn with_tick(self, tick_ms: f64) -> Self {
        self.update(|s| s.tick_ms = tick_ms)
    }

    /// Remove the clock.
    pub fn without_clock(self) -> Self {
        self.update(|s| s.clock_enabled = false)
    }

    /// Set the epoch milliseconds at which the clock reads zero.
    pub fn with_time_origin(self, origin_ms: f64) -> Self {
        self.update(|s| s.time_origin = origin_ms)
    }

    /// Report the given memory counters.
    pub fn with_memory(self, counters: MemoryCounters) -> Self {
        self.update(|s| s.memory = Some(counters))
    }

    /// Remove entry observation.
    pub fn without_observation(self) -> Self {
        self.update(|s| s.observation_enabled = false)
    }

    /// Deliver a batch of entries to subscribers.
    pub fn deliver(&self, entries: &[PerformanceEntry]) -> usize {
        self.bus.publish(entries)
    }

    /// Number of live entry subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.bus.subscriber_count()
    }

    /// How many times the clock has been read.
    pub fn clock_reads(&self) -> usize {
        self.state.lock().map(|s| s.clock_reads).unwrap_or(0)
    }

    /// How many times memory counters have been requested.
    pub fn memory_reads(&self) -> usize {
        self.state.lock().map(|s| s.memory_reads).unwrap_or(0)
    }
}

impl HostCapabilities for ScriptedHost {
    fn now(&self) -> Option<f64> {
        let mut state = self.state.lock().ok()?;
        if !state.clock_enabled {
            return None;
        }

        state.clock_reads += 1;
        let reading = match state.readings.pop_front() {
            Some(reading) => reading,
            None if state.clock_reads == 1 => state.current,
            None => state.current + state.tick_ms,
        };
        state.current = reading;
        Some(reading)
    }

    fn time_origin(&self) -> f64 {
        self.state.lock().map(|s| s.time_origin).unwrap_or(0.0)
    }

    fn memory_snapshot(&self) -> Option<MemoryCounters> {
        let mut state = self.state.lock().ok()?;
        state.memory_reads += 1;
        state.memory.clone()
    }

    fn subscribe_to_entries(
        &self,
        entry_types: &[EntryType],
        callback: EntryCallback,
    ) -> Option<Subscription> {
        let enabled = self
            .state
            .lock()
            .map(|s| s.observation_enabled)
            .unwrap_or(false);
        enabled.then(|| self.bus.subscribe(entry_types, callback))
    }
}
