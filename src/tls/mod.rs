//! TLS subsystem: certificate lifecycle and listener configuration.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     TlsSettings
//!     → manager.rs ensure_certificates()
//!       (validate existing material, or generate self-signed)
//!     → load_rustls_config() (PEM files → rustls server config)
//!     → HTTPS listener bind
//! ```

pub mod manager;

use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

pub use manager::{CertManager, TlsError};

/// Load the rustls server configuration from certificate and key files.
pub async fn load_rustls_config(
    cert_path: &Path,
    key_path: &Path,
) -> Result<RustlsConfig, std::io::Error> {
    if !cert_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("certificate file not found: {}", cert_path.display()),
        ));
    }
    if !key_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("private key file not found: {}", key_path.display()),
        ));
    }

    RustlsConfig::from_pem_file(cert_path, key_path).await
}
