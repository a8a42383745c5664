//! Connection string resolution and database connection setup.
//!
//! # Responsibilities
//! - Resolve a named connection string alias before the inline string
//! - Fail loudly when no connection target exists
//! - Attach a client certificate when the connection uses TLS

use std::collections::HashMap;

use mongodb::options::{ClientOptions, Tls};
use mongodb::{Client, Database};

use crate::config::schema::AppenderConfig;
use crate::error::{AppenderError, AppenderResult};
use crate::net::tls::CertificateStore;

/// Prefix of the environment variables read by [`EnvConnectionStrings`].
pub const ENV_PREFIX: &str = "MONGO_APPENDER_CONNECTION_";

/// Database used when the connection string names none.
pub const DEFAULT_DATABASE: &str = "log4net";

/// Looks up connection strings by alias.
pub trait ConnectionStringSource: Send + Sync {
    fn lookup(&self, name: &str) -> Option<String>;
}

impl ConnectionStringSource for HashMap<String, String> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl<S: ConnectionStringSource + ?Sized> ConnectionStringSource for &S {
    fn lookup(&self, name: &str) -> Option<String> {
        (**self).lookup(name)
    }
}

/// Tries the first source, then the second.
impl<A, B> ConnectionStringSource for (A, B)
where
    A: ConnectionStringSource,
    B: ConnectionStringSource,
{
    fn lookup(&self, name: &str) -> Option<String> {
        self.0.lookup(name).or_else(|| self.1.lookup(name))
    }
}

/// Reads aliases from `MONGO_APPENDER_CONNECTION_<NAME>` variables.
///
/// The name is upper-cased and every character other than an ASCII letter or
/// digit becomes `_`, so `audit-db` reads `MONGO_APPENDER_CONNECTION_AUDIT_DB`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConnectionStrings;

impl EnvConnectionStrings {
    pub fn variable_name(name: &str) -> String {
        let suffix: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{ENV_PREFIX}{suffix}")
    }
}

impl ConnectionStringSource for EnvConnectionStrings {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var(Self::variable_name(name)).ok()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Pick the connection string for `config`.
///
/// A resolvable `connection_string_name` wins over `connection_string`.
pub fn resolve_connection_string(
    config: &AppenderConfig,
    source: &dyn ConnectionStringSource,
) -> AppenderResult<String> {
    if let Some(name) = config.connection_string_name.as_deref() {
        match non_blank(source.lookup(name)) {
            Some(resolved) => {
                tracing::debug!(alias = name, "Resolved connection string alias");
                return Ok(resolved);
            }
            None => tracing::debug!(alias = name, "Connection string alias not found"),
        }
    }

    non_blank(config.connection_string.clone()).ok_or_else(|| {
        AppenderError::Configuration(match config.connection_string_name.as_deref() {
            Some(name) => format!(
                "connection string alias '{name}' did not resolve and no connection string is set"
            ),
            None => "no connection string or connection string name is set".to_string(),
        })
    })
}

/// Parse `uri` and attach a client certificate when it requests TLS.
///
/// A missing certificate is not an error; the connection proceeds with the
/// driver's default TLS behaviour.
pub async fn client_options(
    uri: &str,
    certificate_friendly_name: Option<&str>,
    certificates: Option<&dyn CertificateStore>,
) -> AppenderResult<ClientOptions> {
    let mut options = ClientOptions::parse(uri)
        .await
        .map_err(|e| AppenderError::Configuration(format!("invalid connection string: {e}")))?;

    if let (Some(Tls::Enabled(tls)), Some(name)) = (options.tls.as_mut(), certificate_friendly_name) {
        match certificates.and_then(|store| store.find_client_certificate(name)) {
            Some(certificate) => {
                tracing::debug!(
                    friendly_name = name,
                    path = %certificate.path.display(),
                    "Attaching client certificate"
                );
                tls.cert_key_file_path = Some(certificate.path);
            }
            None => {
                tracing::warn!(friendly_name = name, "Client certificate not found, connecting without one");
            }
        }
    }

    Ok(options)
}

/// Resolve, parse and open the database `config` points at.
pub async fn connect(
    config: &AppenderConfig,
    source: &dyn ConnectionStringSource,
    certificates: Option<&dyn CertificateStore>,
) -> AppenderResult<Database> {
    let uri = resolve_connection_string(config, source)?;
    let options = client_options(
        &uri,
        config.certificate_friendly_name.as_deref(),
        certificates,
    )
    .await?;

    let database_name = options
        .default_database
        .clone()
        .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

    let client = Client::with_options(options)
        .map_err(|e| AppenderError::Configuration(format!("failed to create client: {e}")))?;

    tracing::info!(database = %database_name, "Connected log store");
    Ok(client.database(&database_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::tls::ClientCertificate;
    use std::path::PathBuf;

    fn config(inline: Option<&str>, alias: Option<&str>) -> AppenderConfig {
        AppenderConfig {
            connection_string: inline.map(String::from),
            connection_string_name: alias.map(String::from),
            ..AppenderConfig::default()
        }
    }

    fn aliases() -> HashMap<String, String> {
        HashMap::from([(
            "audit".to_string(),
            "mongodb://audit-host:27017/audit".to_string(),
        )])
    }

    #[test]
    fn test_alias_wins_over_inline() {
        let resolved = resolve_connection_string(
            &config(Some("mongodb://inline:27017"), Some("audit")),
            &aliases(),
        )
        .unwrap();
        assert_eq!(resolved, "mongodb://audit-host:27017/audit");
    }

    #[test]
    fn test_unresolved_alias_falls_back_to_inline() {
        let resolved = resolve_connection_string(
            &config(Some("mongodb://inline:27017"), Some("missing")),
            &aliases(),
        )
        .unwrap();
        assert_eq!(resolved, "mongodb://inline:27017");
    }

    #[test]
    fn test_no_target_is_configuration_error() {
        let err = resolve_connection_string(&config(None, Some("missing")), &aliases()).unwrap_err();
        assert!(matches!(err, AppenderError::Configuration(_)));

        let err = resolve_connection_string(&config(Some("  "), None), &aliases()).unwrap_err();
        assert!(matches!(err, AppenderError::Configuration(_)));
    }

    #[test]
    fn test_chained_sources() {
        let mut second = HashMap::new();
        second.insert("metrics".to_string(), "mongodb://metrics:27017".to_string());
        let chained = (aliases(), second);
        assert_eq!(chained.lookup("audit").as_deref(), Some("mongodb://audit-host:27017/audit"));
        assert_eq!(chained.lookup("metrics").as_deref(), Some("mongodb://metrics:27017"));
        assert_eq!(chained.lookup("other"), None);
    }

    #[test]
    fn test_env_variable_name() {
        assert_eq!(
            EnvConnectionStrings::variable_name("audit-db"),
            "MONGO_APPENDER_CONNECTION_AUDIT_DB"
        );
        assert_eq!(
            EnvConnectionStrings::variable_name("Logs2"),
            "MONGO_APPENDER_CONNECTION_LOGS2"
        );
    }

    struct FixedStore(PathBuf);

    impl CertificateStore for FixedStore {
        fn find_client_certificate(&self, friendly_name: &str) -> Option<ClientCertificate> {
            (friendly_name == "appender").then(|| ClientCertificate {
                friendly_name: friendly_name.to_string(),
                path: self.0.clone(),
                chain_len: 1,
            })
        }
    }

    #[tokio::test]
    async fn test_certificate_attached_when_tls_enabled() {
        let store = FixedStore(PathBuf::from("/etc/certs/appender.pem"));
        let options = client_options(
            "mongodb://localhost:27017/?tls=true",
            Some("appender"),
            Some(&store),
        )
        .await
        .unwrap();

        match options.tls {
            Some(Tls::Enabled(tls)) => assert_eq!(
                tls.cert_key_file_path,
                Some(PathBuf::from("/etc/certs/appender.pem"))
            ),
            other => panic!("expected TLS to be enabled, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_certificate_is_not_an_error() {
        let store = FixedStore(PathBuf::from("/etc/certs/appender.pem"));
        let options = client_options(
            "mongodb://localhost:27017/?tls=true",
            Some("unknown"),
            Some(&store),
        )
        .await
        .unwrap();

        match options.tls {
            Some(Tls::Enabled(tls)) => assert!(tls.cert_key_file_path.is_none()),
            other => panic!("expected TLS to be enabled, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_plain_connection_ignores_certificate() {
        let store = FixedStore(PathBuf::from("/etc/certs/appender.pem"));
        let options = client_options("mongodb://localhost:27017", Some("appender"), Some(&store))
            .await
            .unwrap();
        assert!(!matches!(options.tls, Some(Tls::Enabled(_))));
    }

    #[tokio::test]
    async fn test_invalid_uri_is_configuration_error() {
        let err = client_options("not-a-uri", None, None).await.unwrap_err();
        assert!(matches!(err, AppenderError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_connect_uses_default_database() {
        let db = connect(
            &config(Some("mongodb://localhost:27017"), None),
            &HashMap::new(),
            None,
        )
        .await
        .unwrap();
        assert_eq!(db.name(), "log4net");
        assert_eq!(DEFAULT_DATABASE, "log4net");

        let db = connect(
            &config(Some("mongodb://localhost:27017/telemetry"), None),
            &HashMap::new(),
            None,
        )
        .await
        .unwrap();
        assert_eq!(db.name(), "telemetry");
    }
}
