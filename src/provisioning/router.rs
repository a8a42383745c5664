//! Collection routing and lazy provisioning.
//!
//! # Responsibilities
//! - Resolve the target collection for the current time
//! - Create missing collections, capped when configured
//! - Remember names already provisioned by this process

use std::fmt::Display;

use chrono::{DateTime, TimeZone};
use dashmap::DashSet;

use crate::observability::metrics;
use crate::provisioning::{naming, units};
use crate::store::{CappedSpec, DocumentStore, StoreError, StoreResult};

/// Capped-collection limits resolved from their configured strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CappedOptions {
    pub max_size: i64,
    pub max_documents: i64,
}

impl CappedOptions {
    pub fn from_settings(max_size: Option<&str>, max_documents: Option<&str>) -> Self {
        Self {
            max_size: units::resolve(max_size),
            max_documents: units::resolve(max_documents),
        }
    }

    /// Creation options, or `None` when no capping applies.
    ///
    /// A document limit only applies together with a positive size limit.
    pub fn spec(&self) -> Option<CappedSpec> {
        if self.max_size <= 0 {
            return None;
        }
        Some(CappedSpec {
            size_bytes: self.max_size as u64,
            max_documents: (self.max_documents > 0).then_some(self.max_documents as u64),
        })
    }
}

/// Resolves collection names and makes sure the collections exist.
#[derive(Debug, Default)]
pub struct CollectionRouter {
    template: Option<String>,
    capped: Option<CappedSpec>,
    provisioned: DashSet<String>,
}

impl CollectionRouter {
    pub fn new(template: Option<String>, capped: CappedOptions) -> Self {
        Self {
            template,
            capped: capped.spec(),
            provisioned: DashSet::new(),
        }
    }

    /// Capped settings applied to newly created collections.
    pub fn capped(&self) -> Option<CappedSpec> {
        self.capped
    }

    /// Collection name for `now`.
    pub fn collection_name<Tz>(&self, now: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        naming::collection_name_or_default(self.template.as_deref(), now)
    }

    /// Whether `name` was already provisioned by this router.
    pub fn is_provisioned(&self, name: &str) -> bool {
        self.provisioned.contains(name)
    }

    /// Create `name` unless it exists.
    ///
    /// Check-then-create is not atomic: a concurrent creator winning the race
    /// shows up as [`StoreError::CollectionExists`] and counts as success.
    pub async fn ensure_exists(&self, store: &dyn DocumentStore, name: &str) -> StoreResult<()> {
        if self.is_provisioned(name) {
            return Ok(());
        }

        let existing = store.list_collection_names(name).await?;
        if existing.iter().any(|n| n == name) {
            self.provisioned.insert(name.to_string());
            return Ok(());
        }

        match store.create_collection(name, self.capped).await {
            Ok(()) => {
                tracing::info!(
                    collection = %name,
                    capped = self.capped.is_some(),
                    max_size = ?self.capped.map(|c| c.size_bytes),
                    max_documents = ?self.capped.and_then(|c| c.max_documents),
                    "Created log collection"
                );
                metrics::record_collection_created();
            }
            Err(StoreError::CollectionExists(_)) => {
                tracing::debug!(collection = %name, "Collection created concurrently");
            }
            Err(e) => return Err(e),
        }

        self.provisioned.insert(name.to_string());
        Ok(())
    }
}
