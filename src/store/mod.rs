//! Document storage abstraction.
//!
//! # Responsibilities
//! - Define the handful of backend operations the appender needs
//! - Keep driver types out of the routing and shaping logic
//!
//! # Data Flow
//! ```text
//! MongoAppender ──▶ CollectionRouter ──▶ DocumentStore::list_collection_names
//!                                    └──▶ DocumentStore::create_collection
//!               ──▶ DocumentStore::insert_one / insert_many
//!               ──▶ DocumentStore::create_index
//! ```

pub mod memory;
pub mod mongo;

use std::time::Duration;

use async_trait::async_trait;
use mongodb::bson::Document;
use thiserror::Error;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Errors reported by a [`DocumentStore`].
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Another writer created the collection between our check and create.
    #[error("collection {0} already exists")]
    CollectionExists(String),

    /// Any other backend failure.
    #[error("{0}")]
    Backend(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Capped-collection settings applied when a collection is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CappedSpec {
    /// Maximum collection size in bytes.
    pub size_bytes: u64,
    /// Maximum number of documents, if limited.
    pub max_documents: Option<u64>,
}

/// A single-field index definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub field: String,
    pub ascending: bool,
    /// TTL applied by the backend, if any.
    pub expire_after: Option<Duration>,
}

/// Operations the appender performs against the document backend.
///
/// Implementations must be safe to share between threads without external locking.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Existing collection names exactly matching `name`.
    async fn list_collection_names(&self, name: &str) -> StoreResult<Vec<String>>;

    /// Create a collection, optionally capped.
    async fn create_collection(&self, name: &str, capped: Option<CappedSpec>) -> StoreResult<()>;

    /// Insert a single document.
    async fn insert_one(&self, collection: &str, document: Document) -> StoreResult<()>;

    /// Insert a batch of documents in order.
    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> StoreResult<()>;

    /// Create an index. Re-creating an identical index is a no-op.
    async fn create_index(&self, collection: &str, index: IndexSpec) -> StoreResult<()>;
}
