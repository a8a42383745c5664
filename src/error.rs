//! Error types shared across the appender.
//!
//! Configuration problems are loud and surface from setup functions. Everything
//! on the write path ends up in an [`AppenderError`] that is handed to the
//! configured error handler and never returned to application code.

use std::time::Duration;

use thiserror::Error;

use crate::store::StoreError;

/// Errors produced by the appender.
#[derive(Debug, Error)]
pub enum AppenderError {
    /// No usable connection target, or a connection string the driver rejects.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The backend rejected an insert, collection creation or index creation.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// A dispatched write did not finish in time.
    #[error("Write timed out after {0:?}")]
    Timeout(Duration),

    /// The pending-write limit was reached and the write was dropped.
    #[error("Write dropped: {0} writes already pending")]
    Backpressure(usize),

    /// The appender was closed before the write was dispatched.
    #[error("Appender is closed")]
    Closed,
}

impl AppenderError {
    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            AppenderError::Configuration(_) => "configuration",
            AppenderError::Storage(_) => "storage",
            AppenderError::Timeout(_) => "timeout",
            AppenderError::Backpressure(_) => "backpressure",
            AppenderError::Closed => "closed",
        }
    }
}

/// Result type for appender operations.
pub type AppenderResult<T> = Result<T, AppenderError>;

/// A collection name the backend cannot accept.
///
/// Never fatal: the router logs it and falls back to the default name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("collection name is empty")]
    Empty,

    #[error("collection name {0:?} contains a forbidden character")]
    ForbiddenCharacter(String),

    #[error("collection name {0:?} is in the reserved system namespace")]
    Reserved(String),
}

/// A formatted value with no native document mapping.
///
/// Always resolved by structural serialization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("composite value of kind {0} has no native mapping")]
    Composite(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppenderError::Configuration("Must provide a valid connection string".into());
        assert_eq!(
            err.to_string(),
            "Configuration error: Must provide a valid connection string"
        );

        let err = AppenderError::Timeout(Duration::from_secs(5));
        assert_eq!(err.to_string(), "Write timed out after 5s");

        let err = AppenderError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "Write timed out after 250ms");
    }

    #[test]
    fn test_storage_error_conversion() {
        let err: AppenderError = StoreError::Backend("insert failed".into()).into();
        assert_eq!(err.kind(), "storage");
        assert!(err.to_string().contains("insert failed"));
    }

    #[test]
    fn test_routing_error_display() {
        let err = RoutingError::Reserved("system.logs".into());
        assert!(err.to_string().contains("system.logs"));
    }
}
