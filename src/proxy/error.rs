//! Per-request failure taxonomy.
//!
//! # Responsibilities
//! - Classify upstream failures into timeout / unreachable / other
//! - Map each class to an HTTP status and a structured error body
//!
//! # Design Decisions
//! - No layer performs retries; every failure is surfaced to the caller
//! - Error messages carry the underlying cause for operability

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// A per-request proxying failure, reported to the original caller.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// A timeout tier elapsed. Reported as 504 Gateway Timeout.
    #[error("upstream request to {path} timed out after {}s", timeout.as_secs())]
    Timeout { path: String, timeout: Duration },

    /// The upstream refused or could not accept a connection.
    /// Reported as 502 Bad Gateway.
    #[error("could not connect to upstream: {0}")]
    Unreachable(String),

    /// Any other transport failure. Reported as 500.
    #[error("error proxying request: {0}")]
    Other(String),
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Unreachable(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
