//! Fire-and-forget dispatch of writes onto the Tokio runtime.
//!
//! # Responsibilities
//! - Spawn writes without blocking the logging thread
//! - Bound the number of writes in flight (drop and report beyond it)
//! - Apply the optional write timeout
//! - Let callers wait for in-flight writes to drain

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};

use crate::appender::handler::ErrorHandler;
use crate::error::{AppenderError, AppenderResult};
use crate::observability::metrics;

/// Spawns writes and tracks them until they finish.
pub(crate) struct Dispatcher {
    runtime: Handle,
    permits: Arc<Semaphore>,
    max_pending: usize,
    idle: Arc<Notify>,
    closed: AtomicBool,
    timeout: Option<Duration>,
    error_handler: Arc<dyn ErrorHandler>,
}

impl Dispatcher {
    pub(crate) fn new(
        runtime: Handle,
        max_pending: usize,
        timeout: Option<Duration>,
        error_handler: Arc<dyn ErrorHandler>,
    ) -> Self {
        Self {
            runtime,
            permits: Arc::new(Semaphore::new(max_pending)),
            max_pending,
            idle: Arc::new(Notify::new()),
            closed: AtomicBool::new(false),
            timeout,
            error_handler,
        }
    }

    /// Number of dispatched writes that have not finished.
    pub(crate) fn pending(&self) -> usize {
        self.max_pending - self.permits.available_permits()
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn error_handler(&self) -> &Arc<dyn ErrorHandler> {
        &self.error_handler
    }

    /// Spawn `write` without waiting for it.
    ///
    /// Fails immediately when closed or when `max_pending` writes are
    /// already in flight. A failure of the spawned write goes to the error
    /// handler.
    pub(crate) fn dispatch<F>(&self, operation: &'static str, write: F) -> AppenderResult<()>
    where
        F: Future<Output = AppenderResult<()>> + Send + 'static,
    {
        if self.is_closed() {
            return Err(AppenderError::Closed);
        }

        let permit = self
            .permits
            .clone()
            .try_acquire_owned()
            .map_err(|_| AppenderError::Backpressure(self.max_pending))?;

        let guard = PendingWriteGuard {
            permit: Some(permit),
            permits: Arc::clone(&self.permits),
            max_pending: self.max_pending,
            idle: Arc::clone(&self.idle),
        };
        metrics::record_pending_writes(self.pending());

        let timeout = self.timeout;
        let handler = Arc::clone(&self.error_handler);

        self.runtime.spawn(async move {
            let _guard = guard;
            let result = match timeout {
                Some(limit) => tokio::time::timeout(limit, write)
                    .await
                    .unwrap_or_else(|_| Err(AppenderError::Timeout(limit))),
                None => write.await,
            };
            if let Err(e) = result {
                metrics::record_write_error(e.kind());
                handler.handle(operation, &e);
            }
        });

        Ok(())
    }

    /// Wait until every dispatched write has finished.
    pub(crate) async fn flush(&self) {
        loop {
            let notified = self.idle.notified();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Holds a pending-write slot for the lifetime of one spawned write.
///
/// Dropping it frees the slot and wakes anyone waiting in `flush`, even if
/// the write task panicked.
struct PendingWriteGuard {
    permit: Option<OwnedSemaphorePermit>,
    permits: Arc<Semaphore>,
    max_pending: usize,
    idle: Arc<Notify>,
}

impl Drop for PendingWriteGuard {
    fn drop(&mut self) {
        drop(self.permit.take());
        metrics::record_pending_writes(self.max_pending - self.permits.available_permits());
        self.idle.notify_waiters();
    }
}
