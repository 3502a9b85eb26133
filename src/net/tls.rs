//! TLS configuration and certificate loading.

use axum_server::tls_rustls::RustlsConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::TlsConfig;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("{kind} file not found: {path:?}")]
    Missing { kind: &'static str, path: PathBuf },
    #[error("failed to load TLS material: {0}")]
    Load(#[from] std::io::Error),
}

/// Load the listener's certificate chain and private key.
pub async fn load_tls_config(config: &TlsConfig) -> Result<RustlsConfig, TlsError> {
    let cert_path = Path::new(&config.cert_path);
    let key_path = Path::new(&config.key_path);

    for (kind, path) in [("certificate", cert_path), ("private key", key_path)] {
        if !path.exists() {
            return Err(TlsError::Missing {
                kind,
                path: path.to_path_buf(),
            });
        }
    }

    let tls = RustlsConfig::from_pem_file(cert_path, key_path).await?;
    tracing::info!(cert = %config.cert_path, "TLS material loaded");
    Ok(tls)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_files_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = TlsConfig {
            cert_path: dir.path().join("cert.pem").display().to_string(),
            key_path: dir.path().join("key.pem").display().to_string(),
        };
        let err = load_tls_config(&config).await.unwrap_err();
        assert!(matches!(err, TlsError::Missing { kind: "certificate", .. }));
    }

    #[tokio::test]
    async fn test_garbage_pem_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("cert.pem");
        let key = dir.path().join("key.pem");
        std::fs::write(&cert, "not a certificate").unwrap();
        std::fs::write(&key, "not a key").unwrap();

        let config = TlsConfig {
            cert_path: cert.display().to_string(),
            key_path: key.display().to_string(),
        };
        assert!(matches!(load_tls_config(&config).await, Err(TlsError::Load(_))));
    }
}
