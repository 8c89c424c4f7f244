//! TLS configuration for the API listener
//!
//! Loads a PEM certificate chain and private key (PKCS#8 or RSA).

use rustls::ServerConfig;
use rustls_pemfile::{certs, pkcs8_private_keys, rsa_private_keys};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_rustls::TlsAcceptor;
use tracing::info;

use crate::error::{GuardError, Result};

/// TLS manager for the API certificate
pub struct TlsManager {
    cert_path: PathBuf,
    key_path: PathBuf,
}

impl TlsManager {
    /// Create a new TLS manager
    pub fn new(cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
        }
    }

    /// Build a TLS acceptor from the configured files
    pub fn build_acceptor(&self) -> Result<TlsAcceptor> {
        info!(
            "Loading TLS certificate from {} and {}",
            self.cert_path.display(),
            self.key_path.display()
        );
        let server_config = self.build_server_config()?;
        Ok(TlsAcceptor::from(Arc::new(server_config)))
    }

    fn build_server_config(&self) -> Result<ServerConfig> {
        let certs = load_certs(&self.cert_path)?;
        let key = load_private_key(&self.key_path)?;

        ServerConfig::builder()
            .with_safe_defaults()
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| GuardError::Tls(format!("TLS config error: {}", e)))
    }
}

fn open_pem(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path)
        .map_err(|e| GuardError::Tls(format!("Failed to open {}: {}", path.display(), e)))?;
    Ok(BufReader::new(file))
}

fn load_certs(path: &Path) -> Result<Vec<rustls::Certificate>> {
    let certs_der = certs(&mut open_pem(path)?)
        .map_err(|e| GuardError::Tls(format!("Failed to read certificates: {}", e)))?;

    if certs_der.is_empty() {
        return Err(GuardError::Tls("No certificates found in file".to_string()));
    }

    Ok(certs_der.into_iter().map(rustls::Certificate).collect())
}

fn load_private_key(path: &Path) -> Result<rustls::PrivateKey> {
    // Try PKCS8 first, then RSA
    let keys = pkcs8_private_keys(&mut open_pem(path)?)
        .map_err(|e| GuardError::Tls(format!("Failed to read PKCS8 keys: {}", e)))?;
    if let Some(key) = keys.into_iter().next() {
        return Ok(rustls::PrivateKey(key));
    }

    let rsa_keys = rsa_private_keys(&mut open_pem(path)?)
        .map_err(|e| GuardError::Tls(format!("Failed to read RSA keys: {}", e)))?;
    rsa_keys
        .into_iter()
        .next()
        .map(rustls::PrivateKey)
        .ok_or_else(|| GuardError::Tls("No private key found in file".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_certificate_file() {
        let manager = TlsManager::new("/nonexistent/cert.pem", "/nonexistent/key.pem");
        assert!(matches!(manager.build_acceptor(), Err(GuardError::Tls(_))));
    }

    #[test]
    fn test_empty_certificate_file() {
        let mut cert = NamedTempFile::new().unwrap();
        cert.write_all(b"not a pem file\n").unwrap();

        let result = load_certs(cert.path());
        assert!(matches!(result, Err(GuardError::Tls(msg)) if msg.contains("No certificates")));
    }

    #[test]
    fn test_missing_private_key() {
        let mut key = NamedTempFile::new().unwrap();
        key.write_all(b"-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n")
            .unwrap();

        let result = load_private_key(key.path());
        assert!(matches!(result, Err(GuardError::Tls(msg)) if msg.contains("No private key")));
    }
}
