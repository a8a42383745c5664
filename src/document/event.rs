//! The log event model consumed by layouts and the document builder.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use tracing::Level;

use crate::document::value::FieldValue;

/// Source location of the statement that produced an event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub file: Option<String>,
    pub line: Option<u32>,
    pub module_path: Option<String>,
}

impl Location {
    pub fn to_value(&self) -> FieldValue {
        let mut entries = BTreeMap::new();
        entries.insert("fileName".to_string(), FieldValue::from(self.file.clone()));
        entries.insert(
            "lineNumber".to_string(),
            FieldValue::from(self.line.map(i64::from)),
        );
        entries.insert(
            "className".to_string(),
            FieldValue::from(self.module_path.clone()),
        );
        FieldValue::Map(entries)
    }
}

/// Error details attached to an event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExceptionInfo {
    pub message: String,
    pub source: Option<String>,
    pub stack_trace: Option<String>,
    pub inner: Option<Box<ExceptionInfo>>,
}

impl ExceptionInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    /// Capture an error and its chain of sources.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        Self {
            message: err.to_string(),
            source: None,
            stack_trace: None,
            inner: err.source().map(|inner| Box::new(Self::from_error(inner))),
        }
    }

    pub fn to_value(&self) -> FieldValue {
        let mut entries = BTreeMap::new();
        entries.insert("message".to_string(), FieldValue::from(self.message.as_str()));
        entries.insert("source".to_string(), FieldValue::from(self.source.clone()));
        entries.insert(
            "stackTrace".to_string(),
            FieldValue::from(self.stack_trace.clone()),
        );
        if let Some(inner) = &self.inner {
            entries.insert("innerException".to_string(), inner.to_value());
        }
        FieldValue::Map(entries)
    }
}

/// One log event.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    /// Logger or target name.
    pub logger_name: String,
    pub message: String,
    pub thread: String,
    pub location: Option<Location>,
    pub exception: Option<ExceptionInfo>,
    pub properties: BTreeMap<String, FieldValue>,
    pub user_name: Option<String>,
}

impl LogEvent {
    /// An event stamped with the current time and thread.
    pub fn new(level: Level, logger_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            logger_name: logger_name.into(),
            message: message.into(),
            thread: current_thread_label(),
            location: None,
            exception: None,
            properties: BTreeMap::new(),
            user_name: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_thread(mut self, thread: impl Into<String>) -> Self {
        self.thread = thread.into();
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_user_name(mut self, user_name: impl Into<String>) -> Self {
        self.user_name = Some(user_name.into());
        self
    }

    /// Properties as a single value.
    pub fn properties_value(&self) -> FieldValue {
        FieldValue::Map(self.properties.clone())
    }
}

/// Name of the current thread, or its id when unnamed.
pub fn current_thread_label() -> String {
    let thread = std::thread::current();
    match thread.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", thread.id()),
    }
}

/// Host and process facts recorded with every fixed-shape document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessContext {
    pub machine_name: String,
    /// Process name.
    pub domain: String,
    pub user_name: Option<String>,
}

impl ProcessContext {
    /// Detect the host name, process name and user of this process.
    pub fn detect() -> Self {
        let machine_name = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .filter(|h| !h.is_empty())
            .or_else(|| std::env::var("HOSTNAME").ok().filter(|h| !h.is_empty()))
            .unwrap_or_else(|| {
                tracing::debug!("Could not determine hostname, using 'unknown'");
                "unknown".to_string()
            });

        let domain = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "unknown".to_string());

        let user_name = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .ok()
            .filter(|u| !u.is_empty());

        Self {
            machine_name,
            domain,
            user_name,
        }
    }

    /// Context detected once for the whole process.
    pub fn current() -> &'static ProcessContext {
        static CURRENT: OnceLock<ProcessContext> = OnceLock::new();
        CURRENT.get_or_init(Self::detect)
    }
}
