//! Persist structured log events into MongoDB collections.
//!
//! ```no_run
//! use mongo_appender::{config, observability};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = config::load_config("mongo-appender.toml".as_ref())?;
//! let appender = mongo_appender::appender::open(&settings).await?;
//! observability::logging::init_from_config(&settings.observability, &appender)?;
//!
//! tracing::info!(order_id = 42, "order placed");
//! appender.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod appender;
pub mod config;
pub mod document;
pub mod error;
pub mod net;
pub mod observability;
pub mod provisioning;
pub mod store;

pub use appender::{AppenderBuilder, ErrorHandler, LogSink, MongoAppender};
pub use config::{AppenderConfig, AppenderSettings};
pub use document::{FieldSpec, FieldValue, LogEvent, StandardLayout};
pub use error::{AppenderError, AppenderResult};
pub use observability::MongoLayer;
pub use store::{DocumentStore, MemoryStore, MongoStore};
