//! Listener certificates for the drain endpoint.

use std::io;
use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

use crate::config::TlsConfig;

/// Error type for listener TLS setup.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("{kind} file not found: {path}")]
    Missing { kind: &'static str, path: String },

    #[error("invalid certificate or key: {0}")]
    Pem(#[source] io::Error),
}

/// Build the rustls config for `listener.tls`.
///
/// Both files are checked up front so a typo names the file instead of
/// surfacing as a PEM parse error.
pub async fn load_tls_config(tls: &TlsConfig) -> Result<RustlsConfig, TlsError> {
    for (kind, path) in [("certificate", &tls.cert_path), ("private key", &tls.key_path)] {
        if !Path::new(path).is_file() {
            return Err(TlsError::Missing {
                kind,
                path: path.clone(),
            });
        }
    }

    RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
        .await
        .map_err(TlsError::Pem)
}
