//! Host capability providers.
//!
//! [`crate::PerformanceMeasure`] never looks up ambient runtime objects. It
//! asks a [`HostCapabilities`] implementation for a clock reading, a memory
//! snapshot, or an entry subscription, and each of those may be missing.
//!
//! - [`NativeHost`] backs the clock with `std::time::Instant`, reads process
//!   memory through `sysinfo`, and delivers entries published on its
//!   [`EntryBus`].
//! - `WebHost` (browser targets only) wraps `window.performance` and
//!   `PerformanceObserver`.
//! - [`ScriptedHost`] is a deterministic stand-in for tests.

mod bus;
#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
mod native;
mod scripted;
#[cfg(all(target_family = "wasm", target_os = "unknown"))]
mod web;

pub use bus::EntryBus;
#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
pub use native::NativeHost;
pub use scripted::ScriptedHost;
#[cfg(all(target_family = "wasm", target_os = "unknown"))]
pub use web::WebHost;

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::entry::{EntryType, PerformanceEntry};
use crate::sample::MemoryCounters;

/// The host used when none is injected.
#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
pub type DefaultHost = NativeHost;

/// The host used when none is injected.
#[cfg(all(target_family = "wasm", target_os = "unknown"))]
pub type DefaultHost = WebHost;

/// Callback receiving each batch of newly available entries.
pub type EntryCallback = Box<dyn FnMut(&[PerformanceEntry]) + Send + 'static>;

/// Performance instrumentation offered by a runtime.
pub trait HostCapabilities {
    /// Milliseconds since the time origin, or `None` without a
    /// high-resolution clock.
    fn now(&self) -> Option<f64>;

    /// Milliseconds since the Unix epoch at which the clock reads zero.
    fn time_origin(&self) -> f64 {
        0.0
    }

    /// Current heap counters, or `None` without memory instrumentation.
    fn memory_snapshot(&self) -> Option<MemoryCounters>;

    /// Deliver future entries of the given types to `callback`.
    ///
    /// Returns `None` when the host cannot observe entries. Delivery stops
    /// when the returned [`Subscription`] is dropped.
    fn subscribe_to_entries(
        &self,
        entry_types: &[EntryType],
        callback: EntryCallback,
    ) -> Option<Subscription>;
}

impl<H: HostCapabilities + ?Sized> HostCapabilities for &H {
    fn now(&self) -> Option<f64> {
        (**self).now()
    }

    fn time_origin(&self) -> f64 {
        (**self).time_origin()
    }

    fn memory_snapshot(&self) -> Option<MemoryCounters> {
        (**self).memory_snapshot()
    }

    fn subscribe_to_entries(
        &self,
        entry_types: &[EntryType],
        callback: EntryCallback,
    ) -> Option<Subscription> {
        (**self).subscribe_to_entries(entry_types, callback)
    }
}

impl<H: HostCapabilities + ?Sized> HostCapabilities for Arc<H> {
    fn now(&self) -> Option<f64> {
        (**self).now()
    }

    fn time_origin(&self) -> f64 {
        (**self).time_origin()
    }

    fn memory_snapshot(&self) -> Option<MemoryCounters> {
        (**self).memory_snapshot()
    }

    fn subscribe_to_entries(
        &self,
        entry_types: &[EntryType],
        callback: EntryCallback,
    ) -> Option<Subscription> {
        (**self).subscribe_to_entries(entry_types, callback)
    }
}

impl<H: HostCapabilities + ?Sized> HostCapabilities for Rc<H> {
    fn now(&self) -> Option<f64> {
        (**self).now()
    }

    fn time_origin(&self) -> f64 {
        (**self).time_origin()
    }

    fn memory_snapshot(&self) -> Option<MemoryCounters> {
        (**self).memory_snapshot()
    }

    fn subscribe_to_entries(
        &self,
        entry_types: &[EntryType],
        callback: EntryCallback,
    ) -> Option<Subscription> {
        (**self).subscribe_to_entries(entry_types, callback)
    }
}

/// An active entry subscription.
///
/// Dropping the handle releases it; [`Subscription::unsubscribe`] does the
/// same explicitly.
pub struct Subscription {
    entry_types: Vec<EntryType>,
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Wrap a release action for the given entry types.
    pub fn new(entry_types: Vec<EntryType>, release: impl FnOnce() + 'static) -> Self {
        Self {
            entry_types,
            release: Some(Box::new(release)),
        }
    }

    /// Entry types this subscription receives.
    pub fn entry_types(&self) -> &[EntryType] {
        &self.entry_types
    }

    /// Release the subscription now.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("entry_types", &self.entry_types)
            .field("active", &self.release.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_subscription_releases_on_drop() {
        let released = Rc::new(Cell::new(0));
        let counter = Rc::clone(&released);

        let subscription = Subscription::new(vec![EntryType::Paint], move || {
            counter.set(counter.get() + 1);
        });
        assert_eq!(subscription.entry_types(), &[EntryType::Paint]);
        assert_eq!(released.get(), 0);

        drop(subscription);
        assert_eq!(released.get(), 1);
    }

    #[test]
    fn test_subscription_unsubscribe_releases_once() {
        let released = Rc::new(Cell::new(0));
        let counter = Rc::clone(&released);

        let subscription = Subscription::new(Vec::new(), move || {
            counter.set(counter.get() + 1);
        });
        subscription.unsubscribe();
        assert_eq!(released.get(), 1);
    }

    #[test]
    fn test_shared_host_delegates() {
        let host = Arc::new(ScriptedHost::new().with_time_origin(5.0));
        assert_eq!(host.time_origin(), 5.0);
        assert!(host.now().is_some());
        assert!(host.memory_snapshot().is_none());

        let by_ref = &*host;
        assert_eq!(HostCapabilities::time_origin(&by_ref), 5.0);
    }
}
