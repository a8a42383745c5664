//! Metrics recorded by the appender.
//!
//! # Metrics
//! - `mongo_appender_documents_written_total` (counter): documents accepted by the backend
//! - `mongo_appender_write_errors_total` (counter): failed or dropped writes, by `kind`
//! - `mongo_appender_events_dropped_total` (counter): events discarded without a write attempt
//! - `mongo_appender_collections_created_total` (counter): collections provisioned
//! - `mongo_appender_pending_writes` (gauge): dispatched writes not yet finished
//!
//! No exporter is installed here; the host application chooses the recorder.

use metrics::{counter, gauge};

pub fn record_documents_written(count: usize) {
    counter!("mongo_appender_documents_written_total").increment(count as u64);
}

pub fn record_write_error(kind: &'static str) {
    counter!("mongo_appender_write_errors_total", "kind" => kind).increment(1);
}

pub fn record_collection_created() {
    counter!("mongo_appender_collections_created_total").increment(1);
}

pub fn record_pending_writes(pending: usize) {
    gauge!("mongo_appender_pending_writes").set(pending as f64);
}

pub fn record_events_dropped(count: usize) {
    counter!("mongo_appender_events_dropped_total").increment(count as u64);
}
