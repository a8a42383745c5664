//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Application tracing events
//!     → layer.rs (MongoLayer → LogSink::append_one)
//!
//! Appender internals produce:
//!     → logging.rs (console output for the crate's own diagnostics)
//!     → metrics.rs (counters and gauges)
//! ```
//!
//! # Design Decisions
//! - The crate's own events never reach MongoDB
//! - Metrics are cheap (atomic increments); the host installs the recorder

pub mod layer;
pub mod logging;
pub mod metrics;

pub use layer::MongoLayer;
