//! Self-signed certificate lifecycle.
//!
//! # Responsibilities
//! - Ensure valid certificate material exists before the listener binds
//! - Generate a self-signed RSA certificate when allowed and needed
//! - Treat missing material as fatal when auto-generation is disabled
//!
//! # Design Decisions
//! - Validity check: both files exist, the certificate parses, and
//!   not_after is strictly in the future; anything else regenerates
//! - Regeneration fully rewrites both files; writes are atomic
//!   (write temp, rename) so a crash cannot leave half-written material
//! - The private key file is restricted to owner read/write on unix

use std::fs;
use std::path::{Path, PathBuf};

use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use openssl::x509::extension::SubjectAlternativeName;
use openssl::x509::{X509NameBuilder, X509};
use thiserror::Error;

use crate::config::TlsSettings;

const RSA_KEY_BITS: u32 = 2048;
const ORGANIZATION: &str = "Ollama Router";

/// Fatal startup errors from certificate management. None are retried.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error(
        "TLS certificates not found at {cert} and {key}; \
         set server.tls.auto_generate = true to create self-signed certificates"
    )]
    MaterialMissing { cert: PathBuf, key: PathBuf },

    #[error("failed to create certificate directory {path}: {source}")]
    CreateDir { path: PathBuf, source: std::io::Error },

    #[error("certificate generation failed: {0}")]
    Generation(#[from] openssl::error::ErrorStack),

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },
}

/// Manages the certificate and key files the HTTPS listener binds with.
pub struct CertManager {
    settings: TlsSettings,
    cert_file: PathBuf,
    key_file: PathBuf,
}

impl CertManager {
    pub fn new(settings: TlsSettings) -> Self {
        let cert_file = settings
            .cert_path
            .clone()
            .unwrap_or_else(|| settings.cert_dir.join("server.crt"));
        let key_file = settings
            .key_path
            .clone()
            .unwrap_or_else(|| settings.cert_dir.join("server.key"));
        Self { settings, cert_file, key_file }
    }

    /// Ensure certificate material exists and is valid, generating it if
    /// allowed. Returns the paths the listener should bind with.
    ///
    /// With valid pre-existing material this performs zero disk writes
    /// and returns the same paths every time.
    pub fn ensure_certificates(&self) -> Result<(PathBuf, PathBuf), TlsError> {
        if !self.settings.auto_generate {
            if !self.cert_file.exists() || !self.key_file.exists() {
                return Err(TlsError::MaterialMissing {
                    cert: self.cert_file.clone(),
                    key: self.key_file.clone(),
                });
            }
            return Ok((self.cert_file.clone(), self.key_file.clone()));
        }

        if self.certificates_valid() {
            return Ok((self.cert_file.clone(), self.key_file.clone()));
        }

        self.generate_self_signed()?;
        Ok((self.cert_file.clone(), self.key_file.clone()))
    }

    /// A pair is valid iff both files exist, the certificate parses, and
    /// its expiry is strictly later than now.
    fn certificates_valid(&self) -> bool {
        if !self.cert_file.exists() || !self.key_file.exists() {
            return false;
        }
        let Ok(pem) = fs::read(&self.cert_file) else {
            return false;
        };
        let Ok(cert) = X509::from_pem(&pem) else {
            return false;
        };
        let Ok(now) = Asn1Time::days_from_now(0) else {
            return false;
        };
        matches!(cert.not_after().compare(&now), Ok(std::cmp::Ordering::Greater))
    }

    fn generate_self_signed(&self) -> Result<(), TlsError> {
        for file in [&self.cert_file, &self.key_file] {
            if let Some(dir) = file.parent() {
                if !dir.as_os_str().is_empty() {
                    fs::create_dir_all(dir).map_err(|source| TlsError::CreateDir {
                        path: dir.to_path_buf(),
                        source,
                    })?;
                }
            }
        }

        let rsa = Rsa::generate(RSA_KEY_BITS)?;
        let pkey = PKey::from_rsa(rsa)?;

        // Self-signed: subject and issuer are the same name.
        let mut name = X509NameBuilder::new()?;
        name.append_entry_by_nid(Nid::COUNTRYNAME, "US")?;
        name.append_entry_by_nid(Nid::STATEORPROVINCENAME, "Local")?;
        name.append_entry_by_nid(Nid::LOCALITYNAME, "Local")?;
        name.append_entry_by_nid(Nid::ORGANIZATIONNAME, ORGANIZATION)?;
        name.append_entry_by_nid(Nid::COMMONNAME, "localhost")?;
        let name = name.build();

        let mut builder = X509::builder()?;
        builder.set_version(2)?;

        let mut serial = BigNum::new()?;
        serial.rand(159, MsbOption::MAYBE_ZERO, false)?;
        let serial = serial.to_asn1_integer()?;
        builder.set_serial_number(&serial)?;

        builder.set_subject_name(&name)?;
        builder.set_issuer_name(&name)?;
        builder.set_pubkey(&pkey)?;
        let not_before = Asn1Time::days_from_now(0)?;
        builder.set_not_before(&not_before)?;
        let not_after = Asn1Time::days_from_now(self.settings.validity_days)?;
        builder.set_not_after(&not_after)?;

        let san = SubjectAlternativeName::new()
            .dns("localhost")
            .ip("127.0.0.1")
            .ip("0.0.0.0")
            .build(&builder.x509v3_context(None, None))?;
        builder.append_extension(san)?;

        builder.sign(&pkey, MessageDigest::sha256())?;
        let cert = builder.build();

        write_atomic(&self.cert_file, &cert.to_pem()?, false)?;
        write_atomic(&self.key_file, &pkey.private_key_to_pem_pkcs8()?, true)?;

        tracing::info!(
            cert = %self.cert_file.display(),
            key = %self.key_file.display(),
            validity_days = self.settings.validity_days,
            "generated self-signed certificate"
        );
        Ok(())
    }
}

/// Write a file through a temporary sibling and rename it into place.
fn write_atomic(path: &Path, bytes: &[u8], restrict: bool) -> Result<(), TlsError> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let write = |source| TlsError::Write { path: path.to_path_buf(), source };
    fs::write(&tmp, bytes).map_err(write)?;
    #[cfg(unix)]
    if restrict {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600)).map_err(write)?;
    }
    #[cfg(not(unix))]
    let _ = restrict;
    fs::rename(&tmp, path).map_err(write)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings(dir: &TempDir) -> TlsSettings {
        TlsSettings {
            cert_dir: dir.path().to_path_buf(),
            ..TlsSettings::default()
        }
    }

    #[test]
    fn generates_material_when_missing() {
        let dir = TempDir::new().unwrap();
        let manager = CertManager::new(settings(&dir));

        let (cert, key) = manager.ensure_certificates().unwrap();
        assert!(cert.exists());
        assert!(key.exists());

        let pem = fs::read(&cert).unwrap();
        let parsed = X509::from_pem(&pem).unwrap();
        assert!(parsed
            .subject_name()
            .entries_by_nid(Nid::COMMONNAME)
            .next()
            .is_some());
    }

    #[test]
    fn ensure_is_idempotent_for_valid_material() {
        let dir = TempDir::new().unwrap();
        let manager = CertManager::new(settings(&dir));

        let (cert_a, key_a) = manager.ensure_certificates().unwrap();
        let cert_bytes = fs::read(&cert_a).unwrap();
        let key_bytes = fs::read(&key_a).unwrap();

        let (cert_b, key_b) = manager.ensure_certificates().unwrap();
        assert_eq!(cert_a, cert_b);
        assert_eq!(key_a, key_b);
        // No rewrite happened.
        assert_eq!(fs::read(&cert_b).unwrap(), cert_bytes);
        assert_eq!(fs::read(&key_b).unwrap(), key_bytes);
    }

    #[test]
    fn validity_window_matches_configured_days() {
        let dir = TempDir::new().unwrap();
        let mut settings = settings(&dir);
        settings.validity_days = 30;
        let manager = CertManager::new(settings);

        let (cert, _) = manager.ensure_certificates().unwrap();
        let parsed = X509::from_pem(&fs::read(cert).unwrap()).unwrap();
        let window = parsed.not_before().diff(parsed.not_after()).unwrap();
        assert!((29..=31).contains(&window.days));
    }

    #[test]
    fn missing_material_is_fatal_without_auto_generate() {
        let dir = TempDir::new().unwrap();
        let mut settings = settings(&dir);
        settings.auto_generate = false;
        let manager = CertManager::new(settings);

        let err = manager.ensure_certificates().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("server.crt"));
        assert!(message.contains("server.key"));
    }

    #[test]
    fn unparseable_certificate_forces_regeneration() {
        let dir = TempDir::new().unwrap();
        let manager = CertManager::new(settings(&dir));

        let cert_path = dir.path().join("server.crt");
        let key_path = dir.path().join("server.key");
        fs::write(&cert_path, b"not a certificate").unwrap();
        fs::write(&key_path, b"not a key").unwrap();

        manager.ensure_certificates().unwrap();
        let pem = fs::read(&cert_path).unwrap();
        assert!(X509::from_pem(&pem).is_ok());
    }

    /// Write a cert/key pair whose not_after is in the past.
    fn write_expired_pair(cert_path: &Path, key_path: &Path) {
        let rsa = Rsa::generate(RSA_KEY_BITS).unwrap();
        let pkey = PKey::from_rsa(rsa).unwrap();

        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_nid(Nid::COMMONNAME, "localhost").unwrap();
        let name = name.build();

        let mut builder = X509::builder().unwrap();
        builder.set_version(2).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(&pkey).unwrap();
        let not_before = Asn1Time::from_unix(0).unwrap();
        builder.set_not_before(&not_before).unwrap();
        let not_after = Asn1Time::from_unix(1).unwrap();
        builder.set_not_after(&not_after).unwrap();
        builder.sign(&pkey, MessageDigest::sha256()).unwrap();

        fs::write(cert_path, builder.build().to_pem().unwrap()).unwrap();
        fs::write(key_path, pkey.private_key_to_pem_pkcs8().unwrap()).unwrap();
    }

    #[test]
    fn expired_certificate_forces_regeneration() {
        let dir = TempDir::new().unwrap();
        let manager = CertManager::new(settings(&dir));

        let cert_path = dir.path().join("server.crt");
        let key_path = dir.path().join("server.key");
        write_expired_pair(&cert_path, &key_path);
        let stale = fs::read(&cert_path).unwrap();

        manager.ensure_certificates().unwrap();

        let pem = fs::read(&cert_path).unwrap();
        assert_ne!(pem, stale);
        let parsed = X509::from_pem(&pem).unwrap();
        let now = Asn1Time::days_from_now(0).unwrap();
        assert_eq!(
            parsed.not_after().compare(&now).unwrap(),
            std::cmp::Ordering::Greater
        );
    }

    #[test]
    fn explicit_paths_override_cert_dir() {
        let dir = TempDir::new().unwrap();
        let mut settings = settings(&dir);
        settings.cert_path = Some(dir.path().join("custom.pem"));
        settings.key_path = Some(dir.path().join("custom-key.pem"));
        let manager = CertManager::new(settings);

        let (cert, key) = manager.ensure_certificates().unwrap();
        assert_eq!(cert, dir.path().join("custom.pem"));
        assert_eq!(key, dir.path().join("custom-key.pem"));
        assert!(cert.exists());
        assert!(key.exists());
    }

    #[cfg(unix)]
    #[test]
    fn key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let manager = CertManager::new(settings(&dir));

        let (_, key) = manager.ensure_certificates().unwrap();
        let mode = fs::metadata(key).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
