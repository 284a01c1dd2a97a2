//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, connection limits > 0)
//! - Check the upstream base URL parses and uses a supported scheme
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs after the full merge, before any component is constructed

use thiserror::Error;
use url::Url;

use crate::config::schema::AppConfig;

/// A single semantic validation failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("upstream.base_url is not a valid URL: {0}")]
    InvalidBaseUrl(String),

    #[error("upstream.base_url must use http or https, got {0}")]
    UnsupportedScheme(String),

    #[error("upstream.timeout_secs must be greater than zero")]
    ZeroTimeout,

    #[error("upstream.max_connections must be greater than zero")]
    ZeroMaxConnections,

    #[error("server.tls.validity_days must be greater than zero")]
    ZeroValidityDays,

    #[error("route path {0:?} must start with '/'")]
    BadRoutePath(String),

    #[error("route {0:?} has a zero timeout override")]
    ZeroRouteTimeout(String),
}

/// Validate a merged configuration, collecting every violation.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.upstream.base_url) {
        Ok(url) if url.scheme() != "http" && url.scheme() != "https" => {
            errors.push(ValidationError::UnsupportedScheme(url.scheme().to_string()));
        }
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::InvalidBaseUrl(e.to_string())),
    }

    if config.upstream.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if config.upstream.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }
    if config.server.tls.validity_days == 0 {
        errors.push(ValidationError::ZeroValidityDays);
    }

    for route in &config.routes {
        if !route.path.starts_with('/') {
            errors.push(ValidationError::BadRoutePath(route.path.clone()));
        }
        if route.timeout_secs == Some(0) {
            errors.push(ValidationError::ZeroRouteTimeout(route.path.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
