//! Appender module for persisting log events.
//!
//! # Data Flow
//! ```text
//! LogEvent -> LogSink::append_* -> CollectionRouter::collection_name (at append)
//!          -> Dispatcher (spawn, bounded)
//!          -> CollectionRouter::ensure_exists
//!          -> DocumentBuilder::build -> DocumentStore::insert_one / insert_many
//!          -> TTL index (when expiry is configured)
//! ```
//!
//! # Design Decisions
//! - Appends never block and never surface errors to the caller
//! - One insert per append call
//! - At most `max_pending_writes` writes in flight; excess is dropped and reported

pub mod core;
mod dispatch;
pub mod handler;
pub mod sink;

use std::sync::Arc;

pub use self::core::{ttl_index, AppenderBuilder, Clock, MongoAppender, TTL_INDEX_NAME};
pub use handler::{ErrorHandler, TracingErrorHandler};
pub use sink::LogSink;

use crate::config::schema::AppenderSettings;
use crate::error::AppenderResult;
use crate::net::{connect, CertificateStore, EnvConnectionStrings, PemDirectoryStore};
use crate::store::MongoStore;

/// Connect to MongoDB as `settings` describe and build an appender.
///
/// Connection aliases are looked up in `settings.connection_strings` first
/// and then in the environment. Must be called inside a Tokio runtime.
pub async fn open(settings: &AppenderSettings) -> AppenderResult<MongoAppender> {
    let config = &settings.appender;
    let certificates = config
        .certificate_store_path
        .as_ref()
        .map(PemDirectoryStore::new);
    let sources = (&settings.connection_strings, EnvConnectionStrings);

    let database = connect(
        config,
        &sources,
        certificates.as_ref().map(|c| c as &dyn CertificateStore),
    )
    .await?;

    let store = Arc::new(MongoStore::new(database));
    MongoAppender::builder_from_config(config, store).build()
}
