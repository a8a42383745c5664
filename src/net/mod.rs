//! Network-facing setup: where logs go and how the connection is secured.
//!
//! # Data Flow
//! ```text
//! AppenderConfig
//!     → connection.rs (alias lookup, inline fallback)
//!     → ClientOptions::parse
//!     → tls.rs (client certificate by friendly name, when TLS is requested)
//!     → mongodb::Database
//! ```
//!
//! # Design Decisions
//! - A missing connection target is the only fatal setup error
//! - A missing certificate is logged and ignored
//! - Alias sources are injected, never read from global state by default

pub mod connection;
pub mod tls;

pub use connection::{
    connect, resolve_connection_string, ConnectionStringSource, EnvConnectionStrings,
};
pub use tls::{CertificateError, CertificateStore, ClientCertificate, PemDirectoryStore};
