//! The logging-framework-facing surface of the appender.

use crate::document::LogEvent;

/// Accepts events from a logging framework.
///
/// Every method returns immediately. Persistence happens in the background
/// and failures go to the appender's error handler, never to the caller.
pub trait LogSink: Send + Sync {
    /// Persist one event as a single-document write.
    fn append_one(&self, event: LogEvent);

    /// Persist `events` as one write, preserving their order. An empty batch
    /// does nothing.
    fn append_batch(&self, events: Vec<LogEvent>);

    /// Stop accepting events and release the connection. Events appended
    /// afterwards are dropped.
    fn close(&self);
}
