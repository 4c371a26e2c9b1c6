//! In-process delivery of performance entries to subscribers.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use super::{EntryCallback, Subscription};
use crate::entry::{EntryType, PerformanceEntry};

struct Subscriber {
    id: u64,
    entry_types: Vec<EntryType>,
    callback: Arc<Mutex<EntryCallback>>,
}

#[derive(Default)]
struct BusState {
    next_id: u64,
    subscribers: Vec<Subscriber>,
    pending: VecDeque<Vec<PerformanceEntry>>,
    delivering: bool,
}

type Delivery = (Arc<Mutex<EntryCallback>>, Vec<PerformanceEntry>);

fn lock_state(state: &Mutex<BusState>) -> MutexGuard<'_, BusState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the delivering flag when a drain ends, including by unwinding out
/// of a panicking callback.
struct DrainGuard<'a> {
    state: &'a Mutex<BusState>,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        lock_state(self.state).delivering = false;
    }
}

/// Fan-out of published entries to type-filtered subscribers.
///
/// Each subscriber receives, in publish order, the entries of a batch whose
/// type it subscribed to. Callbacks run on the publishing thread, outside the
/// subscriber list lock, so a callback may subscribe, unsubscribe or publish.
///
/// Only one call delivers at a time. A batch published while another call is
/// delivering, whether from inside a callback or from another thread, is
/// queued and delivered by that call once its current batch is done.
#[derive(Clone, Default)]
pub struct EntryBus {
    state: Arc<Mutex<BusState>>,
}

impl EntryBus {
    /// Create a bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for the given entry types.
    pub fn subscribe(&self, entry_types: &[EntryType], callback: EntryCallback) -> Subscription {
        let id = {
            let mut state = lock_state(&self.state);
            let id = state.next_id;
            state.next_id += 1;
            state.subscribers.push(Subscriber {
                id,
                entry_types: entry_types.to_vec(),
                callback: Arc::new(Mutex::new(callback)),
            });
            id
        };

        tracing::trace!(
            target: "perf_measure::observer",
            subscriber = id,
            entry_types = ?entry_types,
            "entry subscriber added"
        );

        let state: Weak<Mutex<BusState>> = Arc::downgrade(&self.state);
        Subscription::new(entry_types.to_vec(), move || {
            let Some(state) = state.upgrade() else {
                return;
            };
            lock_state(&state).subscribers.retain(|s| s.id != id);
            tracing::trace!(
                target: "perf_measure::observer",
                subscriber = id,
                "entry subscriber removed"
            );
        })
    }

    /// Deliver a batch of entries.
    ///
    /// Returns the number of entries this call delivered, summed over
    /// subscribers. That includes batches queued behind it while it was
    /// delivering. A call that only queues its batch returns 0.
    pub fn publish(&self, entries: &[PerformanceEntry]) -> usize {
        {
            let mut state = lock_state(&self.state);
            state.pending.push_back(entries.to_vec());
            if state.delivering {
                tracing::trace!(
                    target: "perf_measure::observer",
                    entries = entries.len(),
                    "entry batch queued behind active delivery"
                );
                return 0;
            }
            state.delivering = true;
        }

        let _guard = DrainGuard { state: &self.state };
        let mut delivered = 0;
        while let Some(deliveries) = self.next_deliveries() {
            for (callback, batch) in deliveries {
                let mut callback = callback.lock().unwrap_or_else(|poisoned| {
                    tracing::warn!(
                        target: "perf_measure::observer",
                        "entry callback panicked earlier; delivering anyway"
                    );
                    callback.clear_poison();
                    poisoned.into_inner()
                });
                (*callback)(&batch);
                delivered += batch.len();
            }
        }
        delivered
    }

    /// Pop the next queued batch and split it per subscriber.
    fn next_deliveries(&self) -> Option<Vec<Delivery>> {
        let mut state = lock_state(&self.state);
        let entries = state.pending.pop_front()?;
        let deliveries = state
            .subscribers
            .iter()
            .filter_map(|subscriber| {
                let batch: Vec<PerformanceEntry> = entries
                    .iter()
                    .filter(|e| subscriber.entry_types.contains(&e.entry_type))
                    .cloned()
                    .collect();
                (!batch.is_empty()).then(|| (Arc::clone(&subscriber.callback), batch))
            })
            .collect();
        Some(deliveries)
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        lock_state(&self.state).subscribers.len()
    }
}

impl std::fmt::Debug for EntryBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::capture_events;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, EntryCallback) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: EntryCallback = Box::new(move |entries: &[PerformanceEntry]| {
            let mut sink = sink.lock().unwrap();
            sink.extend(entries.iter().map(|e| e.name.clone()));
        });
        (seen, callback)
    }

    #[test]
    fn test_publish_filters_by_type_and_keeps_order() {
        let bus = EntryBus::new();
        let (seen, callback) = recorder();
        let _subscription = bus.subscribe(&[EntryType::Resource, EntryType::Paint], callback);

        let delivered = bus.publish(&[
            PerformanceEntry::resource("a.js"),
            PerformanceEntry::navigation("index"),
            PerformanceEntry::paint("first-paint", 10.0, 0.0),
            PerformanceEntry::resource("b.css"),
        ]);

        assert_eq!(delivered, 3);
        assert_eq!(*seen.lock().unwrap(), ["a.js", "first-paint", "b.css"]);
    }

    #[test]
    fn test_dropping_subscription_stops_delivery() {
        let bus = EntryBus::new();
        let (seen, callback) = recorder();
        let subscription = bus.subscribe(&EntryType::OBSERVED, callback);
        assert_eq!(bus.subscriber_count(), 1);

        drop(subscription);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.publish(&[PerformanceEntry::resource("late.js")]), 0);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_multiple_subscribers_each_receive() {
        let bus = EntryBus::new();
        let (first, first_cb) = recorder();
        let (second, second_cb) = recorder();
        let _a = bus.subscribe(&[EntryType::Navigation], first_cb);
        let _b = bus.subscribe(&EntryType::OBSERVED, second_cb);

        let delivered = bus.publish(&[
            PerformanceEntry::navigation("index"),
            PerformanceEntry::resource("x.png"),
        ]);

        assert_eq!(delivered, 3);
        assert_eq!(*first.lock().unwrap(), ["index"]);
        assert_eq!(*second.lock().unwrap(), ["index", "x.png"]);
    }

    #[test]
    fn test_publish_from_callback_is_queued() {
        let bus = EntryBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let inner = bus.clone();
        let nested_result = Arc::new(Mutex::new(None));
        let nested_sink = Arc::clone(&nested_result);

        let subscription = bus.subscribe(
            &[EntryType::Resource],
            Box::new(move |entries: &[PerformanceEntry]| {
                sink.lock().unwrap().extend(entries.iter().map(|e| e.name.clone()));
                if entries.iter().any(|e| e.name == "outer") {
                    let queued = inner.publish(&[PerformanceEntry::resource("nested")]);
                    *nested_sink.lock().unwrap() = Some(queued);
                }
            }),
        );

        let delivered = bus.publish(&[PerformanceEntry::resource("outer")]);

        assert_eq!(delivered, 2);
        assert_eq!(*nested_result.lock().unwrap(), Some(0));
        assert_eq!(*seen.lock().unwrap(), ["outer", "nested"]);

        // The callback holds a clone of the bus; releasing breaks the cycle.
        drop(subscription);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_subscriber_keeps_receiving_after_callback_panic() {
        let bus = EntryBus::new();
        let calls = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&calls);
        let _subscription = bus.subscribe(
            &[EntryType::Paint],
            Box::new(move |entries: &[PerformanceEntry]| {
                *counter.lock().unwrap() += 1;
                if entries[0].name == "boom" {
                    panic!("callback failed");
                }
            }),
        );

        let first = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            bus.publish(&[PerformanceEntry::paint("boom", 1.0, 0.0)])
        }));
        assert!(first.is_err());

        let delivered = bus.publish(&[PerformanceEntry::paint("first-paint", 2.0, 0.0)]);
        assert_eq!(delivered, 1);
        assert_eq!(*calls.lock().unwrap(), 2);
        assert_eq!(bus.subscriber_count(), 1);

        let (_, events) = capture_events(|| {
            bus.publish(&[PerformanceEntry::paint("first-contentful-paint", 3.0, 0.0)])
        });
        assert_eq!(events.count_at(tracing::Level::WARN), 0);
        assert_eq!(*calls.lock().unwrap(), 3);
    }

    #[test]
    fn test_poisoned_state_still_registers() {
        let bus = EntryBus::new();
        let state = Arc::clone(&bus.state);
        let _ = std::thread::spawn(move || {
            let _guard = state.lock().unwrap();
            panic!("poison the subscriber list");
        })
        .join();
        assert!(bus.state.is_poisoned());

        let (seen, callback) = recorder();
        let subscription = bus.subscribe(&[EntryType::Resource], callback);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(bus.publish(&[PerformanceEntry::resource("a.js")]), 1);
        assert_eq!(*seen.lock().unwrap(), ["a.js"]);

        drop(subscription);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_subscription_outliving_bus() {
        let bus = EntryBus::new();
        let (_seen, callback) = recorder();
        let subscription = bus.subscribe(&[EntryType::Paint], callback);
        drop(bus);
        drop(subscription);
    }
}
