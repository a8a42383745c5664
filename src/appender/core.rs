//! The appender: routing, shaping and inserting log events.
//!
//! # Responsibilities
//! - Resolve the collection for each write (rolling names, lazy creation)
//! - Shape events into documents in input order
//! - Submit one insert per call
//! - Ensure the TTL index after every write when expiry is configured
//!
//! # Failure Handling
//! Write-path failures never reach the caller of [`LogSink`] methods; they go
//! to the configured [`ErrorHandler`]. Only setup can fail loudly.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::runtime::Handle;

use crate::appender::dispatch::Dispatcher;
use crate::appender::handler::{ErrorHandler, TracingErrorHandler};
use crate::appender::sink::LogSink;
use crate::config::schema::AppenderConfig;
use crate::document::{DocumentBuilder, FieldSpec, LogEvent, ProcessContext, TIMESTAMP_FIELD};
use crate::error::{AppenderError, AppenderResult};
use crate::observability::metrics;
use crate::provisioning::{CappedOptions, CollectionRouter};
use crate::store::{DocumentStore, IndexSpec, StoreResult};

/// Name of the TTL index created on the timestamp field.
pub const TTL_INDEX_NAME: &str = "expireAfterSecondsIndex";

/// Default bound on dispatched writes that have not finished.
pub const DEFAULT_MAX_PENDING_WRITES: usize = 10_000;

/// Source of the current time used to pick rolling collection names.
pub type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

/// The TTL index definition for `expire_after_seconds`.
pub fn ttl_index(expire_after_seconds: u64) -> IndexSpec {
    IndexSpec {
        name: TTL_INDEX_NAME.to_string(),
        field: TIMESTAMP_FIELD.to_string(),
        ascending: true,
        expire_after: Some(Duration::from_secs(expire_after_seconds)),
    }
}

/// Events submitted by one write call.
#[derive(Clone, Copy)]
enum Batch<'a> {
    /// A single-document insert.
    One(&'a LogEvent),
    /// One insert for the whole slice, in order.
    Many(&'a [LogEvent]),
}

struct Inner {
    store: RwLock<Option<Arc<dyn DocumentStore>>>,
    router: CollectionRouter,
    builder: DocumentBuilder,
    expire_after_seconds: i64,
    clock: Clock,
    dispatcher: Dispatcher,
}

impl Inner {
    fn store(&self) -> AppenderResult<Arc<dyn DocumentStore>> {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(AppenderError::Closed)
    }

    fn collection_name(&self) -> String {
        self.router.collection_name(&(self.clock)())
    }

    fn report(&self, operation: &'static str, error: &AppenderError) {
        metrics::record_write_error(error.kind());
        self.dispatcher.error_handler().handle(operation, error);
    }

    async fn write(
        &self,
        store: &dyn DocumentStore,
        collection: &str,
        batch: Batch<'_>,
    ) -> AppenderResult<()> {
        if matches!(batch, Batch::Many(events) if events.is_empty()) {
            return Ok(());
        }

        // Inserting into a missing collection still works, just uncapped.
        if let Err(e) = self.router.ensure_exists(store, collection).await {
            self.report("ensure_collection", &AppenderError::from(e));
        }

        let (inserted, count) = match batch {
            Batch::One(event) => (store.insert_one(collection, self.builder.build(event)).await, 1),
            Batch::Many(events) => {
                let documents = events.iter().map(|e| self.builder.build(e)).collect();
                (store.insert_many(collection, documents).await, events.len())
            }
        };
        if inserted.is_ok() {
            metrics::record_documents_written(count);
            tracing::trace!(collection, count, "Inserted log documents");
        }

        let indexed = self.ensure_ttl_index(store, collection).await;

        match (inserted, indexed) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(insert), Err(index)) => {
                self.report("ensure_ttl_index", &AppenderError::from(index));
                Err(insert.into())
            }
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e.into()),
        }
    }

    async fn ensure_ttl_index(&self, store: &dyn DocumentStore, collection: &str) -> StoreResult<()> {
        if self.expire_after_seconds <= 0 {
            return Ok(());
        }
        store
            .create_index(collection, ttl_index(self.expire_after_seconds as u64))
            .await
    }
}

/// Writes log events into MongoDB collections.
///
/// Cheap to clone; clones share the store, the provisioned-collection memory
/// and the pending-write bound.
#[derive(Clone)]
pub struct MongoAppender {
    inner: Arc<Inner>,
}

impl MongoAppender {
    pub fn builder(store: Arc<dyn DocumentStore>) -> AppenderBuilder {
        AppenderBuilder::new(store)
    }

    /// Builder preloaded with everything in `config` except the connection.
    pub fn builder_from_config(
        config: &AppenderConfig,
        store: Arc<dyn DocumentStore>,
    ) -> AppenderBuilder {
        let fields = config
            .fields
            .iter()
            .map(|f| FieldSpec::new(f.name.clone(), f.layout.clone()))
            .collect();

        AppenderBuilder::new(store)
            .collection_name(config.collection_name.clone())
            .capped(CappedOptions::from_settings(
                config.new_collection_max_size.as_deref(),
                config.new_collection_max_docs.as_deref(),
            ))
            .expire_after_seconds(config.expire_after_seconds)
            .fields(fields)
            .max_pending_writes(config.max_pending_writes)
            .write_timeout(config.write_timeout_secs.map(Duration::from_secs))
    }

    /// Shape and insert one event as a single document, waiting for the backend.
    pub async fn write_one(&self, event: &LogEvent) -> AppenderResult<()> {
        let store = self.inner.store()?;
        let collection = self.inner.collection_name();
        self.inner
            .write(store.as_ref(), &collection, Batch::One(event))
            .await
    }

    /// Shape and insert `events` as one batch, waiting for the backend.
    pub async fn write_batch(&self, events: &[LogEvent]) -> AppenderResult<()> {
        let store = self.inner.store()?;
        let collection = self.inner.collection_name();
        self.inner
            .write(store.as_ref(), &collection, Batch::Many(events))
            .await
    }

    /// Ensure the TTL index on `collection`. No-op when expiry is disabled.
    pub async fn ensure_ttl_index(&self, collection: &str) -> AppenderResult<()> {
        let store = self.inner.store()?;
        self.inner
            .ensure_ttl_index(store.as_ref(), collection)
            .await
            .map_err(AppenderError::from)
    }

    /// Collection a write issued now goes to.
    pub fn current_collection(&self) -> String {
        self.inner.collection_name()
    }

    pub fn router(&self) -> &CollectionRouter {
        &self.inner.router
    }

    /// Dispatched writes that have not finished.
    pub fn pending_writes(&self) -> usize {
        self.inner.dispatcher.pending()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.dispatcher.is_closed()
    }

    /// Wait for every dispatched write to finish.
    pub async fn flush(&self) {
        self.inner.dispatcher.flush().await;
    }

    /// Stop accepting events, then wait for dispatched writes.
    pub async fn shutdown(&self) {
        self.close();
        self.flush().await;
    }

    /// Spawn the write for `events`.
    ///
    /// The collection is picked here, on the calling thread, so the rolling
    /// name reflects when the event was appended rather than when it is written.
    fn dispatch(&self, operation: &'static str, events: Vec<LogEvent>, single: bool) {
        let count = events.len();
        let store = match self.inner.store() {
            Ok(store) => store,
            Err(_) => {
                metrics::record_events_dropped(count);
                tracing::debug!(count, "Appender closed, dropping log events");
                return;
            }
        };

        let collection = self.inner.collection_name();
        let inner = Arc::clone(&self.inner);
        let write = async move {
            let batch = match events.as_slice() {
                [event] if single => Batch::One(event),
                all => Batch::Many(all),
            };
            inner.write(store.as_ref(), &collection, batch).await
        };

        match self.inner.dispatcher.dispatch(operation, write) {
            Ok(()) => {}
            Err(AppenderError::Closed) => {
                metrics::record_events_dropped(count);
                tracing::debug!(count, "Appender closed, dropping log events");
            }
            Err(e) => {
                metrics::record_events_dropped(count);
                self.inner.report(operation, &e);
            }
        }
    }
}

impl LogSink for MongoAppender {
    fn append_one(&self, event: LogEvent) {
        self.dispatch("append_one", vec![event], true);
    }

    fn append_batch(&self, events: Vec<LogEvent>) {
        if events.is_empty() {
            return;
        }
        self.dispatch("append_batch", events, false);
    }

    fn close(&self) {
        self.inner.dispatcher.close();
        let released = self
            .inner
            .store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if released.is_some() {
            tracing::debug!(pending = self.pending_writes(), "Appender closed");
        }
    }
}

impl std::fmt::Debug for MongoAppender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoAppender")
            .field("router", &self.inner.router)
            .field("fields", &self.inner.builder.fields().len())
            .field("expire_after_seconds", &self.inner.expire_after_seconds)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Configures a [`MongoAppender`].
pub struct AppenderBuilder {
    store: Arc<dyn DocumentStore>,
    collection_name: Option<String>,
    capped: CappedOptions,
    expire_after_seconds: i64,
    fields: Vec<FieldSpec>,
    error_handler: Arc<dyn ErrorHandler>,
    max_pending_writes: usize,
    write_timeout: Option<Duration>,
    runtime: Option<Handle>,
    context: Option<ProcessContext>,
    clock: Option<Clock>,
}

impl AppenderBuilder {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            collection_name: None,
            capped: CappedOptions::default(),
            expire_after_seconds: 0,
            fields: Vec::new(),
            error_handler: Arc::new(TracingErrorHandler),
            max_pending_writes: DEFAULT_MAX_PENDING_WRITES,
            write_timeout: None,
            runtime: None,
            context: None,
            clock: None,
        }
    }

    /// Collection name template; `None` means `"logs"`.
    pub fn collection_name(mut self, template: Option<String>) -> Self {
        self.collection_name = template;
        self
    }

    pub fn capped(mut self, capped: CappedOptions) -> Self {
        self.capped = capped;
        self
    }

    /// TTL in seconds; zero or less disables the TTL index.
    pub fn expire_after_seconds(mut self, seconds: i64) -> Self {
        self.expire_after_seconds = seconds;
        self
    }

    /// Ordered field list; empty selects the fixed document shape.
    pub fn fields(mut self, fields: Vec<FieldSpec>) -> Self {
        self.fields = fields;
        self
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.error_handler = handler;
        self
    }

    pub fn max_pending_writes(mut self, max: usize) -> Self {
        self.max_pending_writes = max;
        self
    }

    pub fn write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Runtime that dispatched writes are spawned on.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Host and process facts for the fixed shape and the `hostname`,
    /// `process` and `user` layouts.
    pub fn process_context(mut self, context: ProcessContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Time source for rolling collection names. Defaults to local wall time.
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the appender.
    ///
    /// Without an explicit runtime this must be called from inside a Tokio runtime.
    pub fn build(self) -> AppenderResult<MongoAppender> {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|_| {
                AppenderError::Configuration(
                    "no Tokio runtime available for dispatching writes".to_string(),
                )
            })?,
        };

        if self.max_pending_writes == 0 {
            return Err(AppenderError::Configuration(
                "max_pending_writes must be greater than zero".to_string(),
            ));
        }

        let mut builder = DocumentBuilder::new(self.fields);
        if let Some(context) = self.context {
            builder = builder.with_context(context);
        }

        let router = CollectionRouter::new(self.collection_name, self.capped);
        let clock = match self.clock {
            Some(clock) => clock,
            None => Arc::new(Local::now) as Clock,
        };

        tracing::debug!(
            capped = router.capped().is_some(),
            expire_after_seconds = self.expire_after_seconds,
            fields = builder.fields().len(),
            max_pending_writes = self.max_pending_writes,
            "Appender configured"
        );

        Ok(MongoAppender {
            inner: Arc::new(Inner {
                store: RwLock::new(Some(self.store)),
                router,
                builder,
                expire_after_seconds: self.expire_after_seconds,
                clock,
                dispatcher: Dispatcher::new(
                    runtime,
                    self.max_pending_writes,
                    self.write_timeout,
                    self.error_handler,
                ),
            }),
        })
    }
}
