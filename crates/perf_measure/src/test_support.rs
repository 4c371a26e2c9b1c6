//! Log capture for unit tests.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::Registry;

#[derive(Debug, Clone)]
pub(crate) struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: BTreeMap<String, String>,
}

impl FieldVisitor {
    fn record(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record(field, format!("{value:?}"));
    }
}

#[derive(Clone, Default)]
struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let metadata = event.metadata();
        if let Ok(mut events) = self.events.lock() {
            events.push(CapturedEvent {
                level: *metadata.level(),
                target: metadata.target().to_string(),
                message: visitor.message,
                fields: visitor.fields,
            });
        }
    }
}

/// Events recorded while a closure ran.
#[derive(Debug, Default)]
pub(crate) struct EventLog {
    events: Vec<CapturedEvent>,
}

impl EventLog {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn count_at(&self, level: Level) -> usize {
        self.events.iter().filter(|e| e.level == level).count()
    }

    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.events
            .iter()
            .filter(|e| e.level == level)
            .map(|e| e.message.clone())
            .collect()
    }

    pub fn with_target(&self, target: &str) -> Vec<&CapturedEvent> {
        self.events.iter().filter(|e| e.target == target).collect()
    }
}

/// Run `f` with a subscriber that records every event on this thread.
pub(crate) fn capture_events<T>(f: impl FnOnce() -> T) -> (T, EventLog) {
    let layer = CaptureLayer::default();
    let events = Arc::clone(&layer.events);
    let subscriber = Registry::default().with(layer);

    let result = tracing::subscriber::with_default(subscriber, f);
    let events = events.lock().map(|e| e.clone()).unwrap_or_default();
    (result, EventLog { events })
}
