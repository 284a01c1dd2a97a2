//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from config files and
//! environment variables, and every field has a default so a minimal config
//! (or none at all) is enough to start the proxy.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the router.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration (bind address, TLS).
    pub server: ServerConfig,

    /// Upstream Ollama connection settings.
    pub upstream: UpstreamConfig,

    /// Ordered per-route timeout rules. First match wins.
    pub routes: Vec<RouteRule>,

    /// Logging settings.
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Effective route table: the configured rules, or the built-in
    /// defaults when no routes were configured at all.
    pub fn effective_routes(&self) -> Vec<RouteRule> {
        if self.routes.is_empty() {
            default_routes()
        } else {
            self.routes.clone()
        }
    }
}

/// Default route-timeout table for the Ollama-compatible API surface.
pub fn default_routes() -> Vec<RouteRule> {
    vec![
        RouteRule { path: "/v1/chat/completions".to_string(), timeout_secs: Some(600) },
        RouteRule { path: "/v1/models".to_string(), timeout_secs: Some(30) },
        RouteRule { path: "/v1/embeddings".to_string(), timeout_secs: Some(120) },
        RouteRule { path: "/v1/completions".to_string(), timeout_secs: Some(600) },
    ]
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0").
    pub host: String,

    /// Bind port.
    pub port: u16,

    /// TLS certificate settings.
    pub tls: TlsSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8443,
            tls: TlsSettings::default(),
        }
    }
}

/// TLS certificate settings for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsSettings {
    /// Auto-generate a self-signed certificate when no valid material exists.
    pub auto_generate: bool,

    /// Explicit path to the certificate file (PEM).
    pub cert_path: Option<PathBuf>,

    /// Explicit path to the private key file (PEM).
    pub key_path: Option<PathBuf>,

    /// Directory for generated certificates when no explicit paths are set.
    pub cert_dir: PathBuf,

    /// Validity window for generated certificates, in days.
    pub validity_days: u32,
}

impl Default for TlsSettings {
    fn default() -> Self {
        Self {
            auto_generate: true,
            cert_path: None,
            key_path: None,
            cert_dir: PathBuf::from(".certs"),
            validity_days: 365,
        }
    }
}

/// Upstream Ollama connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL requests are forwarded to (e.g., "http://localhost:11434").
    pub base_url: String,

    /// Default read timeout in seconds, used when no route rule overrides it.
    pub timeout_secs: u64,

    /// Maximum concurrent upstream connections.
    pub max_connections: usize,

    /// Maximum idle connections kept in the pool.
    pub max_idle_connections: usize,
}

impl UpstreamConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            timeout_secs: 600,
            max_connections: 100,
            max_idle_connections: 20,
        }
    }
}

/// A single route-timeout rule.
///
/// The path is matched as a literal prefix of the request path, with no
/// normalization. Rules are evaluated in configured order.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RouteRule {
    /// Path prefix to match.
    pub path: String,

    /// Read-timeout override in seconds for matching requests.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl RouteRule {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Log format: "json" or "text".
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

/// Output format for structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Text,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8443);
        assert!(config.server.tls.auto_generate);
        assert_eq!(config.server.tls.validity_days, 365);
        assert_eq!(config.upstream.base_url, "http://localhost:11434");
        assert_eq!(config.upstream.timeout_secs, 600);
        assert_eq!(config.upstream.max_connections, 100);
        assert!(config.routes.is_empty());
    }

    #[test]
    fn empty_routes_fall_back_to_default_table() {
        let config = AppConfig::default();
        let routes = config.effective_routes();
        assert_eq!(routes.len(), 4);
        assert_eq!(routes[0].path, "/v1/chat/completions");
        assert_eq!(routes[0].timeout_secs, Some(600));
        assert_eq!(routes[1].path, "/v1/models");
        assert_eq!(routes[1].timeout_secs, Some(30));
        assert_eq!(routes[2].path, "/v1/embeddings");
        assert_eq!(routes[2].timeout_secs, Some(120));
        assert_eq!(routes[3].path, "/v1/completions");
        assert_eq!(routes[3].timeout_secs, Some(600));
    }

    #[test]
    fn configured_routes_are_not_replaced() {
        let config = AppConfig {
            routes: vec![RouteRule { path: "/api/generate".into(), timeout_secs: Some(120) }],
            ..AppConfig::default()
        };
        let routes = config.effective_routes();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].path, "/api/generate");
    }
}
