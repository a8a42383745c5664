//! In-process document store.
//!
//! Records every operation so callers can inspect what the appender did, and
//! can be told to fail specific operations.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use mongodb::bson::Document;

use crate::store::{CappedSpec, DocumentStore, IndexSpec, StoreError, StoreResult};

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListCollections,
    CreateCollection,
    Insert,
    CreateIndex,
}

/// A collection held by a [`MemoryStore`].
#[derive(Debug, Clone, Default)]
pub struct StoredCollection {
    pub capped: Option<CappedSpec>,
    pub documents: Vec<Document>,
    pub indexes: Vec<IndexSpec>,
}

#[derive(Debug, Default)]
struct State {
    collections: BTreeMap<String, StoredCollection>,
    create_calls: Vec<(String, Option<CappedSpec>)>,
    index_calls: Vec<(String, IndexSpec)>,
    list_calls: usize,
    insert_one_calls: usize,
    insert_many_calls: usize,
    failures: HashMap<Operation, String>,
}

/// [`DocumentStore`] kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    /// When set, listing never reports existing collections.
    hide_listings: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self, op: Operation) -> StoreResult<()> {
        match self.state().failures.get(&op) {
            Some(message) => Err(StoreError::Backend(message.clone())),
            None => Ok(()),
        }
    }

    /// Make every future `op` fail with `message`.
    pub fn fail(&self, op: Operation, message: impl Into<String>) {
        self.state().failures.insert(op, message.into());
    }

    /// Stop failing `op`.
    pub fn recover(&self, op: Operation) {
        self.state().failures.remove(&op);
    }

    /// Create a collection as if another process had done it.
    pub fn insert_collection(&self, name: &str) {
        self.state().collections.entry(name.to_string()).or_default();
    }

    /// Report no existing collections from listings, so creation races with
    /// collections that already exist.
    pub fn hide_listings(&self, hide: bool) {
        self.hide_listings.store(hide, Ordering::Relaxed);
    }

    pub fn collection_names(&self) -> Vec<String> {
        self.state().collections.keys().cloned().collect()
    }

    pub fn collection(&self, name: &str) -> Option<StoredCollection> {
        self.state().collections.get(name).cloned()
    }

    /// Documents stored in `name`, in insertion order.
    pub fn documents(&self, name: &str) -> Vec<Document> {
        self.collection(name).map(|c| c.documents).unwrap_or_default()
    }

    /// Every create-collection call that reached the store.
    pub fn create_calls(&self) -> Vec<(String, Option<CappedSpec>)> {
        self.state().create_calls.clone()
    }

    /// Every create-index call that reached the store.
    pub fn index_calls(&self) -> Vec<(String, IndexSpec)> {
        self.state().index_calls.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.state().list_calls
    }

    /// Single-document inserts that reached the store.
    pub fn insert_one_calls(&self) -> usize {
        self.state().insert_one_calls
    }

    /// Batch inserts that reached the store.
    pub fn insert_many_calls(&self) -> usize {
        self.state().insert_many_calls
    }

    fn store_documents(&self, collection: &str, documents: impl IntoIterator<Item = Document>) {
        self.state()
            .collections
            .entry(collection.to_string())
            .or_default()
            .documents
            .extend(documents);
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_collection_names(&self, name: &str) -> StoreResult<Vec<String>> {
        self.state().list_calls += 1;
        self.check(Operation::ListCollections)?;
        if self.hide_listings.load(Ordering::Relaxed) {
            return Ok(Vec::new());
        }
        Ok(self
            .state()
            .collections
            .keys()
            .filter(|existing| existing.as_str() == name)
            .cloned()
            .collect())
    }

    async fn create_collection(&self, name: &str, capped: Option<CappedSpec>) -> StoreResult<()> {
        self.check(Operation::CreateCollection)?;
        let mut state = self.state();
        state.create_calls.push((name.to_string(), capped));
        if state.collections.contains_key(name) {
            return Err(StoreError::CollectionExists(name.to_string()));
        }
        state.collections.insert(
            name.to_string(),
            StoredCollection {
                capped,
                ..Default::default()
            },
        );
        Ok(())
    }

    async fn insert_one(&self, collection: &str, document: Document) -> StoreResult<()> {
        self.state().insert_one_calls += 1;
        self.check(Operation::Insert)?;
        self.store_documents(collection, [document]);
        Ok(())
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> StoreResult<()> {
        self.state().insert_many_calls += 1;
        self.check(Operation::Insert)?;
        self.store_documents(collection, documents);
        Ok(())
    }

    async fn create_index(&self, collection: &str, index: IndexSpec) -> StoreResult<()> {
        self.check(Operation::CreateIndex)?;
        let mut state = self.state();
        state.index_calls.push((collection.to_string(), index.clone()));
        let stored = state.collections.entry(collection.to_string()).or_default();
        if !stored.indexes.contains(&index) {
            stored.indexes.push(index);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_create_then_list() {
        let store = MemoryStore::new();
        assert!(store.list_collection_names("logs").await.unwrap().is_empty());

        store.create_collection("logs", None).await.unwrap();
        assert_eq!(store.list_collection_names("logs").await.unwrap(), vec!["logs"]);
        assert!(store.list_collection_names("logs2").await.unwrap().is_empty());
        assert_eq!(store.list_calls(), 3);
    }

    #[tokio::test]
    async fn test_create_existing_reports_conflict() {
        let store = MemoryStore::new();
        store.insert_collection("logs");
        let err = store.create_collection("logs", None).await.unwrap_err();
        assert!(matches!(err, StoreError::CollectionExists(name) if name == "logs"));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = MemoryStore::new();
        store.fail(Operation::Insert, "disk full");
        let err = store.insert_many("logs", vec![doc! { "a": 1 }]).await.unwrap_err();
        assert_eq!(err.to_string(), "disk full");
        assert!(store.documents("logs").is_empty());

        store.recover(Operation::Insert);
        store.insert_many("logs", vec![doc! { "a": 1 }]).await.unwrap();
        store.insert_one("logs", doc! { "a": 2 }).await.unwrap();
        assert_eq!(store.documents("logs").len(), 2);
        assert_eq!(store.insert_many_calls(), 2);
        assert_eq!(store.insert_one_calls(), 1);
    }

    #[tokio::test]
    async fn test_identical_index_is_kept_once() {
        let store = MemoryStore::new();
        let index = IndexSpec {
            name: "ttl".into(),
            field: "timestamp".into(),
            ascending: true,
            expire_after: Some(Duration::from_secs(60)),
        };
        store.create_index("logs", index.clone()).await.unwrap();
        store.create_index("logs", index).await.unwrap();

        assert_eq!(store.index_calls().len(), 2);
        assert_eq!(store.collection("logs").unwrap().indexes.len(), 1);
    }
}
