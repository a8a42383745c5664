//! Collection name templates.
//!
//! A template ending in `yyyyMM` rolls over monthly, one ending in `yyyyMMdd`
//! rolls over daily. Anything else is used verbatim.

use std::fmt::Display;

use chrono::{DateTime, TimeZone};

use crate::error::RoutingError;

/// Collection used when no template is configured or the template is unusable.
pub const DEFAULT_COLLECTION: &str = "logs";

const MONTH_TOKEN: &str = "yyyyMM";
const DAY_TOKEN: &str = "yyyyMMdd";

/// Resolve the collection name for `now`.
pub fn resolve_collection_name<Tz>(template: Option<&str>, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let template = template.unwrap_or(DEFAULT_COLLECTION);

    if let Some(prefix) = template.strip_suffix(MONTH_TOKEN) {
        format!("{}{}", rolling_prefix(prefix), now.format("%Y%m"))
    } else if let Some(prefix) = template.strip_suffix(DAY_TOKEN) {
        format!("{}{}", rolling_prefix(prefix), now.format("%Y%m%d"))
    } else {
        template.to_string()
    }
}

fn rolling_prefix(prefix: &str) -> String {
    let stripped = prefix.replace('%', "");
    if stripped.trim().is_empty() {
        DEFAULT_COLLECTION.to_string()
    } else {
        stripped
    }
}

/// Check that the backend can hold a collection called `name`.
pub fn validate_collection_name(name: &str) -> Result<(), RoutingError> {
    if name.is_empty() {
        return Err(RoutingError::Empty);
    }
    if name.contains('$') || name.contains('\0') {
        return Err(RoutingError::ForbiddenCharacter(name.to_string()));
    }
    if name.starts_with("system.") {
        return Err(RoutingError::Reserved(name.to_string()));
    }
    Ok(())
}

/// Resolve and validate, degrading to [`DEFAULT_COLLECTION`] on a bad name.
pub fn collection_name_or_default<Tz>(template: Option<&str>, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let name = resolve_collection_name(template, now);
    match validate_collection_name(&name) {
        Ok(()) => name,
        Err(e) => {
            tracing::warn!(
                template = ?template,
                error = %e,
                fallback = DEFAULT_COLLECTION,
                "Unusable collection name, using default"
            );
            DEFAULT_COLLECTION.to_string()
        }
    }
}
