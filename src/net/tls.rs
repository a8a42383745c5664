//! Client certificate lookup by friendly name.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// A client certificate ready to hand to the driver.
///
/// `path` points at one PEM file holding the certificate chain followed by
/// the private key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCertificate {
    pub friendly_name: String,
    pub path: PathBuf,
    pub chain_len: usize,
}

/// Why a PEM file cannot be used as a client certificate.
#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("cannot read certificate file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed certificate: {0}")]
    MalformedCertificate(#[source] std::io::Error),

    #[error("no certificate found")]
    NoCertificate,

    #[error("no private key found")]
    NoPrivateKey,

    #[error("malformed private key: {0}")]
    MalformedKey(#[source] std::io::Error),
}

/// Finds client certificates by friendly name.
pub trait CertificateStore: Send + Sync {
    fn find_client_certificate(&self, friendly_name: &str) -> Option<ClientCertificate>;
}

/// Certificates stored as `<friendly_name>.pem` files in one directory.
#[derive(Debug, Clone)]
pub struct PemDirectoryStore {
    root: PathBuf,
}

impl PemDirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn candidate(&self, friendly_name: &str) -> Option<PathBuf> {
        // Friendly names are file stems, not paths.
        if friendly_name.is_empty()
            || friendly_name.contains(['/', '\\'])
            || friendly_name.starts_with('.')
        {
            return None;
        }
        Some(self.root.join(format!("{friendly_name}.pem")))
    }
}

impl CertificateStore for PemDirectoryStore {
    fn find_client_certificate(&self, friendly_name: &str) -> Option<ClientCertificate> {
        let path = self.candidate(friendly_name)?;
        if !path.is_file() {
            return None;
        }

        match inspect_pem(&path) {
            Ok(chain_len) => Some(ClientCertificate {
                friendly_name: friendly_name.to_string(),
                path,
                chain_len,
            }),
            Err(error) => {
                tracing::warn!(
                    friendly_name,
                    path = %path.display(),
                    error = %error,
                    "Ignoring unusable client certificate"
                );
                None
            }
        }
    }
}

/// Count the certificates in `path` and check it also carries a private key.
fn inspect_pem(path: &Path) -> Result<usize, CertificateError> {
    let mut reader = BufReader::new(File::open(path)?);
    let chain = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(CertificateError::MalformedCertificate)?;
    if chain.is_empty() {
        return Err(CertificateError::NoCertificate);
    }

    let mut reader = BufReader::new(File::open(path)?);
    match rustls_pemfile::private_key(&mut reader) {
        Ok(Some(_)) => Ok(chain.len()),
        Ok(None) => Err(CertificateError::NoPrivateKey),
        Err(e) => Err(CertificateError::MalformedKey(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = PemDirectoryStore::new(dir.path());
        assert!(store.find_client_certificate("appender").is_none());
    }

    #[test]
    fn test_path_like_names_rejected() {
        let store = PemDirectoryStore::new("/etc/certs");
        assert!(store.candidate("../secret").is_none());
        assert!(store.candidate("a/b").is_none());
        assert!(store.candidate("").is_none());
        assert_eq!(
            store.candidate("appender"),
            Some(PathBuf::from("/etc/certs/appender.pem"))
        );
    }

    #[test]
    fn test_file_without_certificate_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("appender.pem");
        std::fs::write(&path, "not a pem file\n").unwrap();
        let store = PemDirectoryStore::new(dir.path());
        assert!(store.find_client_certificate("appender").is_none());

        let err = inspect_pem(&path).unwrap_err();
        assert!(matches!(err, CertificateError::NoCertificate));
        assert_eq!(err.to_string(), "no certificate found");
    }

    #[test]
    fn test_unreadable_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = inspect_pem(&dir.path().join("absent.pem")).unwrap_err();
        assert!(matches!(err, CertificateError::Io(_)));
        assert!(err.to_string().starts_with("cannot read certificate file"));
    }
}
