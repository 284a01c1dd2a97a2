//! Ollama Router library.
//!
//! An HTTPS-terminating reverse proxy for a single local Ollama backend,
//! with per-route timeout policy and streaming pass-through.

pub mod config;
pub mod http;
pub mod observability;
pub mod proxy;
pub mod routing;
pub mod tls;

pub use config::AppConfig;
pub use http::HttpServer;
