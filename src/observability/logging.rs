//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the logging subsystem
//! - Optionally route application events into MongoDB
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` overrides the configured level
//! - The MongoDB layer sits behind the same filter as console output

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::appender::MongoAppender;
use crate::config::ObservabilityConfig;
use crate::observability::layer::MongoLayer;

/// Build the filter for `level`, preferring `RUST_LOG` when set.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global subscriber: console output plus the optional MongoDB layer.
///
/// Fails if a global subscriber is already installed.
pub fn init(
    level: &str,
    layer: Option<MongoLayer>,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(tracing_subscriber::fmt::layer())
        .with(layer)
        .try_init()
}

/// Install the global subscriber as `config` describes, capturing events
/// through `appender` when `capture_events` is set.
pub fn init_from_config(
    config: &ObservabilityConfig,
    appender: &MongoAppender,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let layer = config
        .capture_events
        .then(|| MongoLayer::new(appender.clone()));
    init(&config.log_level, layer)
}
