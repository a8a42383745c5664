//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Require a connection target
//! - Reject unusable field definitions and limits
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Malformed size strings are not errors; they disable capping
//! - Whether a connection alias resolves is checked at connect time, not here

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::AppenderSettings;

/// A semantic problem in a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Neither `connection_string` nor `connection_string_name` is set.
    #[error("either connection_string or connection_string_name must be set")]
    MissingConnectionTarget,
    /// A field definition has a blank name.
    #[error("field #{} has an empty name", .index + 1)]
    EmptyFieldName { index: usize },
    #[error("max_pending_writes must be greater than zero")]
    ZeroPendingWrites,
    #[error("write_timeout_secs must be greater than zero when set")]
    ZeroWriteTimeout,
    /// The log level is not one `tracing` understands.
    #[error("invalid log level '{0}'")]
    InvalidLogLevel(String),
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// Check `settings`, returning every problem found.
pub fn validate_config(settings: &AppenderSettings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let appender = &settings.appender;

    if is_blank(appender.connection_string.as_deref())
        && is_blank(appender.connection_string_name.as_deref())
    {
        errors.push(ValidationError::MissingConnectionTarget);
    }

    let mut seen = HashSet::new();
    for (index, field) in appender.fields.iter().enumerate() {
        if field.name.trim().is_empty() {
            errors.push(ValidationError::EmptyFieldName { index });
        } else if !seen.insert(field.name.as_str()) {
            tracing::warn!(field = %field.name, "Field defined more than once, the last definition wins");
        }
    }

    if appender.max_pending_writes == 0 {
        errors.push(ValidationError::ZeroPendingWrites);
    }

    if appender.write_timeout_secs == Some(0) {
        errors.push(ValidationError::ZeroWriteTimeout);
    }

    let level = &settings.observability.log_level;
    if level.parse::<tracing::Level>().is_err() {
        errors.push(ValidationError::InvalidLogLevel(level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
