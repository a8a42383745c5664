//! MongoDB-backed document store.

use async_trait::async_trait;
use mongodb::bson::{doc, Document};
use mongodb::error::{Error as MongoError, ErrorKind};
use mongodb::options::{CreateCollectionOptions, IndexOptions};
use mongodb::{Database, IndexModel};

use crate::store::{CappedSpec, DocumentStore, IndexSpec, StoreError, StoreResult};

/// Server error code for "collection already exists".
const NAMESPACE_EXISTS: i32 = 48;

/// [`DocumentStore`] over a driver database handle.
///
/// The driver client is internally pooled and shareable, so clones are cheap.
#[derive(Clone, Debug)]
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// The underlying database handle.
    pub fn database(&self) -> &Database {
        &self.database
    }
}

fn is_namespace_exists(err: &MongoError) -> bool {
    matches!(err.kind.as_ref(), ErrorKind::Command(cmd) if cmd.code == NAMESPACE_EXISTS)
}

fn backend(err: MongoError) -> StoreError {
    StoreError::Backend(err.to_string())
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn list_collection_names(&self, name: &str) -> StoreResult<Vec<String>> {
        self.database
            .list_collection_names()
            .filter(doc! { "name": name })
            .await
            .map_err(backend)
    }

    async fn create_collection(&self, name: &str, capped: Option<CappedSpec>) -> StoreResult<()> {
        let mut options = CreateCollectionOptions::default();
        if let Some(spec) = capped {
            options.capped = Some(true);
            options.size = Some(spec.size_bytes);
            options.max = spec.max_documents;
        }

        match self.database.create_collection(name).with_options(options).await {
            Ok(()) => Ok(()),
            Err(e) if is_namespace_exists(&e) => Err(StoreError::CollectionExists(name.to_string())),
            Err(e) => Err(backend(e)),
        }
    }

    async fn insert_one(&self, collection: &str, document: Document) -> StoreResult<()> {
        self.database
            .collection::<Document>(collection)
            .insert_one(document)
            .await
            .map(|_| ())
            .map_err(backend)
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> StoreResult<()> {
        self.database
            .collection::<Document>(collection)
            .insert_many(documents)
            .await
            .map(|_| ())
            .map_err(backend)
    }

    async fn create_index(&self, collection: &str, index: IndexSpec) -> StoreResult<()> {
        let direction = if index.ascending { 1 } else { -1 };
        let mut options = IndexOptions::default();
        options.name = Some(index.name);
        options.expire_after = index.expire_after;

        let mut keys = Document::new();
        keys.insert(index.field, direction);

        let model = IndexModel::builder()
            .keys(keys)
            .options(options)
            .build();

        self.database
            .collection::<Document>(collection)
            .create_index(model)
            .await
            .map(|_| ())
            .map_err(backend)
    }
}
