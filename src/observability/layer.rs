//! A `tracing` layer that persists application events through the appender.
//!
//! # Responsibilities
//! - Convert each `tracing::Event` into a [`LogEvent`]
//! - Map the `message` field to the message, `error`/`exception` fields to
//!   exception details, everything else to properties
//! - Skip events from this crate and from the MongoDB driver
//!
//! # Design Decisions
//! - Events are handed to [`LogSink::append_one`] and never block the caller
//! - Span fields are not captured; only the event's own fields are stored

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use crate::appender::LogSink;
use crate::document::{ExceptionInfo, FieldValue, Location, LogEvent};

/// Targets whose events are never persisted.
///
/// This crate logs its own write failures and the driver logs its I/O; storing
/// either would feed back into the appender.
pub const SKIPPED_TARGETS: &[&str] = &["mongo_appender", "mongodb"];

const MESSAGE_FIELD: &str = "message";
const ERROR_FIELDS: &[&str] = &["error", "exception", "err"];

/// Forwards `tracing` events to a [`LogSink`].
#[derive(Clone)]
pub struct MongoLayer {
    sink: Arc<dyn LogSink>,
    skipped_targets: Vec<String>,
}

impl MongoLayer {
    pub fn new(sink: impl LogSink + 'static) -> Self {
        Self::from_arc(Arc::new(sink))
    }

    pub fn from_arc(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            skipped_targets: SKIPPED_TARGETS.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Also skip events whose target starts with `prefix`.
    pub fn skip_target(mut self, prefix: impl Into<String>) -> Self {
        self.skipped_targets.push(prefix.into());
        self
    }

    fn is_skipped(&self, target: &str) -> bool {
        self.skipped_targets.iter().any(|prefix| {
            target == prefix
                || target
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with("::"))
        })
    }

    /// Convert a `tracing` event into a [`LogEvent`].
    pub fn to_log_event(event: &Event<'_>) -> LogEvent {
        let metadata = event.metadata();
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let mut log_event = LogEvent::new(
            *metadata.level(),
            metadata.target(),
            visitor.message.unwrap_or_default(),
        );
        log_event.properties = visitor.properties;
        log_event.exception = visitor.exception;
        if metadata.file().is_some() || metadata.line().is_some() {
            log_event.location = Some(Location {
                file: metadata.file().map(String::from),
                line: metadata.line(),
                module_path: metadata.module_path().map(String::from),
            });
        }
        log_event
    }
}

impl fmt::Debug for MongoLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoLayer")
            .field("skipped_targets", &self.skipped_targets)
            .finish()
    }
}

impl<S: Subscriber> Layer<S> for MongoLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if self.is_skipped(event.metadata().target()) {
            return;
        }
        self.sink.append_one(Self::to_log_event(event));
    }
}

#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    exception: Option<ExceptionInfo>,
    properties: BTreeMap<String, FieldValue>,
}

impl EventVisitor {
    fn record_value(&mut self, field: &Field, value: FieldValue) {
        let name = field.name();
        if name == MESSAGE_FIELD {
            self.message = Some(value.render());
        } else if ERROR_FIELDS.contains(&name) && self.exception.is_none() {
            self.exception = Some(ExceptionInfo::new(value.render()));
        } else if !name.starts_with("log.") {
            self.properties.insert(name.to_string(), value);
        }
    }
}

impl Visit for EventVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record_value(field, FieldValue::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_value(field, FieldValue::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_value(field, FieldValue::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_value(field, FieldValue::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_value(field, FieldValue::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        if ERROR_FIELDS.contains(&field.name()) {
            self.exception = Some(ExceptionInfo::from_error(value));
        } else {
            self.record_value(field, FieldValue::from(value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_value(field, FieldValue::from(format!("{value:?}")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<LogEvent>>,
    }

    impl LogSink for Arc<Recorder> {
        fn append_one(&self, event: LogEvent) {
            self.events.lock().unwrap().push(event);
        }

        fn append_batch(&self, events: Vec<LogEvent>) {
            self.events.lock().unwrap().extend(events);
        }

        fn close(&self) {}
    }

    fn capture(f: impl FnOnce()) -> Vec<LogEvent> {
        let recorder = Arc::new(Recorder::default());
        let subscriber = tracing_subscriber::registry().with(MongoLayer::new(recorder.clone()));
        tracing::subscriber::with_default(subscriber, f);
        let events = recorder.events.lock().unwrap().clone();
        events
    }

    #[derive(Debug)]
    struct Declined;

    impl fmt::Display for Declined {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "card declined")
        }
    }

    impl std::error::Error for Declined {}

    #[test]
    fn test_event_fields_mapped() {
        let events = capture(|| {
            tracing::warn!(target: "shop::orders", order_id = 42, retry = true, "charge {} failed", "c-1");
        });
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.level, Level::WARN);
        assert_eq!(event.logger_name, "shop::orders");
        assert_eq!(event.message, "charge c-1 failed");
        assert_eq!(event.properties.get("order_id"), Some(&FieldValue::Int(42)));
        assert_eq!(event.properties.get("retry"), Some(&FieldValue::Bool(true)));
        assert!(event.location.as_ref().unwrap().line.is_some());
    }

    #[test]
    fn test_error_field_becomes_exception() {
        let events = capture(|| {
            let err: &(dyn std::error::Error + 'static) = &Declined;
            tracing::error!(target: "shop", error = err, "payment failed");
        });
        let exception = events[0].exception.as_ref().unwrap();
        assert_eq!(exception.message, "card declined");
        assert!(events[0].properties.is_empty());
    }

    #[test]
    fn test_display_error_field_becomes_exception() {
        let events = capture(|| {
            tracing::error!(target: "shop", error = %"timeout", "payment failed");
        });
        assert_eq!(events[0].exception.as_ref().unwrap().message, "timeout");
    }

    #[test]
    fn test_own_and_driver_targets_skipped() {
        let events = capture(|| {
            tracing::error!(target: "mongo_appender::appender", "write failed");
            tracing::debug!(target: "mongodb::connection", "pool ready");
            tracing::info!(target: "mongodbish", "kept");
        });
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].logger_name, "mongodbish");
    }

    #[test]
    fn test_custom_skip_target() {
        let recorder = Arc::new(Recorder::default());
        let layer = MongoLayer::new(recorder.clone()).skip_target("hyper");
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "hyper::client", "connecting");
            tracing::info!(target: "app", "started");
        });
        assert_eq!(recorder.events.lock().unwrap().len(), 1);
    }
}
