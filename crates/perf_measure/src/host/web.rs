//! Host backed by the browser's Web Performance APIs.

use js_sys::{Array, Function, Object, Reflect};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Performance, PerformanceObserver, PerformanceObserverEntryList};

use super::{EntryCallback, HostCapabilities, Subscription};
use crate::config::HostConfig;
use crate::entry::{EntryType, PerformanceEntry};
use crate::error::{PerfError, PerfResult};
use crate::sample::{MemoryCounters, HEAP_SIZE_LIMIT, TOTAL_HEAP_SIZE, USED_HEAP_SIZE};

fn performance() -> Option<Performance> {
    web_sys::window().and_then(|w| w.performance())
}

fn js_number(target: &JsValue, key: &str) -> f64 {
    Reflect::get(target, &JsValue::from_str(key))
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0)
}

fn js_string(target: &JsValue, key: &str) -> String {
    Reflect::get(target, &JsValue::from_str(key))
        .ok()
        .and_then(|v| v.as_string())
        .unwrap_or_default()
}

fn entry_from_js(value: &JsValue) -> PerformanceEntry {
    PerformanceEntry {
        name: js_string(value, "name"),
        entry_type: EntryType::from(js_string(value, "entryType")),
        start_time: js_number(value, "startTime"),
        duration: js_number(value, "duration"),
        domain_lookup_start: js_number(value, "domainLookupStart"),
        domain_lookup_end: js_number(value, "domainLookupEnd"),
        connect_start: js_number(value, "connectStart"),
        connect_end: js_number(value, "connectEnd"),
        secure_connection_start: js_number(value, "secureConnectionStart"),
        fetch_start: js_number(value, "fetchStart"),
        worker_start: js_number(value, "workerStart"),
        request_start: js_number(value, "requestStart"),
        response_start: js_number(value, "responseStart"),
        response_end: js_number(value, "responseEnd"),
        transfer_size: js_number(value, "transferSize"),
        encoded_body_size: js_number(value, "encodedBodySize"),
        decoded_body_size: js_number(value, "decodedBodySize"),
    }
}

fn js_error(value: JsValue) -> PerfError {
    PerfError::Host(value.as_string().unwrap_or_else(|| format!("{value:?}")))
}

/// Host for code running in a browser window.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebHost {
    config: HostConfig,
}

impl WebHost {
    /// Create a host exposing whatever the browser supports.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a host exposing only the capabilities enabled in `config`.
    pub fn with_config(config: HostConfig) -> Self {
        Self { config }
    }

    fn observe(
        &self,
        entry_types: &[EntryType],
        mut callback: EntryCallback,
    ) -> PerfResult<Option<Subscription>> {
        let Some(window) = web_sys::window() else {
            return Ok(None);
        };
        if !Reflect::has(&window, &JsValue::from_str("PerformanceObserver")).map_err(js_error)? {
            return Ok(None);
        }

        let closure = Closure::<dyn FnMut(PerformanceObserverEntryList)>::new(
            move |list: PerformanceObserverEntryList| {
                let entries: Vec<PerformanceEntry> =
                    list.get_entries().iter().map(|v| entry_from_js(&v)).collect();
                callback(&entries);
            },
        );

        let observer =
            PerformanceObserver::new(closure.as_ref().unchecked_ref()).map_err(js_error)?;

        let types = Array::new();
        for entry_type in entry_types {
            types.push(&JsValue::from_str(entry_type.as_str()));
        }
        let options = Object::new();
        Reflect::set(&options, &JsValue::from_str("entryTypes"), &types).map_err(js_error)?;

        let observe: Function = Reflect::get(&observer, &JsValue::from_str("observe"))
            .map_err(js_error)?
            .dyn_into()
            .map_err(js_error)?;
        observe.call1(&observer, &options).map_err(js_error)?;

        Ok(Some(Subscription::new(entry_types.to_vec(), move || {
            observer.disconnect();
            drop(closure);
        })))
    }
}

impl HostCapabilities for WebHost {
    fn now(&self) -> Option<f64> {
        performance().map(|p| p.now())
    }

    fn time_origin(&self) -> f64 {
        performance().map(|p| p.time_origin()).unwrap_or(0.0)
    }

    fn memory_snapshot(&self) -> Option<MemoryCounters> {
        if !self.config.memory_enabled {
            return None;
        }

        // `performance.memory` is non-standard and absent outside Chromium.
        let performance = performance()?;
        let memory = Reflect::get(&performance, &JsValue::from_str("memory")).ok()?;
        if memory.is_undefined() || memory.is_null() {
            return None;
        }

        let mut counters = MemoryCounters::new();
        for key in [TOTAL_HEAP_SIZE, USED_HEAP_SIZE, HEAP_SIZE_LIMIT] {
            if let Some(bytes) = Reflect::get(&memory, &JsValue::from_str(key))
                .ok()
                .and_then(|v| v.as_f64())
            {
                counters.insert(key, bytes as u64);
            }
        }
        Some(counters)
    }

    fn subscribe_to_entries(
        &self,
        entry_types: &[EntryType],
        callback: EntryCallback,
    ) -> Option<Subscription> {
        if !self.config.observation_enabled {
            return None;
        }

        match self.observe(entry_types, callback) {
            Ok(subscription) => subscription,
            Err(err) => {
                tracing::warn!(target: "perf_measure::observer", "failed to observe entries: {}", err);
                None
            }
        }
    }
}
