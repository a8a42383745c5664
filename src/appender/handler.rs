//! Where write-path failures are reported.

use crate::error::AppenderError;

/// Receives failures the appender swallows.
///
/// Called from whichever task observed the failure, so implementations must
/// be cheap and must not log through the appender itself.
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, operation: &'static str, error: &AppenderError);
}

impl<F> ErrorHandler for F
where
    F: Fn(&'static str, &AppenderError) + Send + Sync,
{
    fn handle(&self, operation: &'static str, error: &AppenderError) {
        self(operation, error)
    }
}

/// Reports failures as `tracing` errors under this crate's target.
///
/// [`MongoLayer`](crate::observability::layer::MongoLayer) skips that target,
/// so these reports reach other subscribers but never loop back into MongoDB.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorHandler;

impl ErrorHandler for TracingErrorHandler {
    fn handle(&self, operation: &'static str, error: &AppenderError) {
        tracing::error!(
            operation,
            kind = error.kind(),
            error = %error,
            "Failed to write log events"
        );
    }
}
