//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files. Option
//! names also accept their camelCase spelling (`connectionString`,
//! `expireAfterSeconds`, ...).

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};

use crate::appender::core::DEFAULT_MAX_PENDING_WRITES;
use crate::document::StandardLayout;

/// Root configuration file.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppenderSettings {
    /// Named connection strings, looked up by `connection_string_name`.
    #[serde(alias = "connectionStrings")]
    pub connection_strings: HashMap<String, String>,

    pub appender: AppenderConfig,

    pub observability: ObservabilityConfig,
}

/// Appender options, read once at setup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppenderConfig {
    /// Inline connection string (`mongodb://...`).
    #[serde(alias = "connectionString")]
    pub connection_string: Option<String>,

    /// Alias resolved before `connection_string`.
    #[serde(alias = "connectionStringName")]
    pub connection_string_name: Option<String>,

    /// Collection name template; a `yyyyMM` or `yyyyMMdd` suffix rolls over.
    #[serde(alias = "collectionName")]
    pub collection_name: Option<String>,

    #[serde(alias = "certificateFriendlyName")]
    pub certificate_friendly_name: Option<String>,

    /// Directory searched for `<friendly_name>.pem`.
    #[serde(alias = "certificateStorePath")]
    pub certificate_store_path: Option<PathBuf>,

    /// TTL for stored events; zero or less disables the TTL index.
    #[serde(alias = "expireAfterSeconds")]
    pub expire_after_seconds: i64,

    /// Capped collection document limit ("1000", "10k", "5MB").
    #[serde(alias = "newCollectionMaxDocs", deserialize_with = "size_setting")]
    pub new_collection_max_docs: Option<String>,

    /// Capped collection size limit; zero or less disables capping.
    #[serde(alias = "newCollectionMaxSize", deserialize_with = "size_setting")]
    pub new_collection_max_size: Option<String>,

    /// Writes allowed in flight before new ones are dropped.
    #[serde(alias = "maxPendingWrites")]
    pub max_pending_writes: usize,

    #[serde(alias = "writeTimeoutSecs")]
    pub write_timeout_secs: Option<u64>,

    /// Ordered document fields; empty selects the fixed document shape.
    #[serde(rename = "field", alias = "fields")]
    pub fields: Vec<FieldConfig>,
}

impl Default for AppenderConfig {
    fn default() -> Self {
        Self {
            connection_string: None,
            connection_string_name: None,
            collection_name: None,
            certificate_friendly_name: None,
            certificate_store_path: None,
            expire_after_seconds: 0,
            new_collection_max_docs: None,
            new_collection_max_size: None,
            max_pending_writes: DEFAULT_MAX_PENDING_WRITES,
            write_timeout_secs: None,
            fields: Vec::new(),
        }
    }
}

/// One configured document field.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FieldConfig {
    pub name: String,
    pub layout: StandardLayout,
}

/// Settings for the crate's own diagnostics.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Also persist application events through the appender.
    pub capture_events: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            capture_events: true,
        }
    }
}

/// Size settings may be written as strings (`"10k"`) or plain integers.
fn size_setting<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Number(n) => n.to_string(),
    }))
}
