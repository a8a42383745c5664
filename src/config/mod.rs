//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppenderSettings (validated, immutable)
//!     → appender::open / MongoAppender::builder_from_config
//! ```
//!
//! # Design Decisions
//! - Config is read once at setup; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{AppenderConfig, AppenderSettings, FieldConfig, ObservabilityConfig};
pub use validation::{validate_config, ValidationError};
