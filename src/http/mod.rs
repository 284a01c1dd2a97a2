//! HTTP server subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → middleware (request ID, trace)
//!     → /health: liveness response, never proxied
//!     → anything else: proxy handler
//!         → buffer body, probe stream flag
//!         → routing (timeout resolution)
//!         → proxy (buffered or streaming forwarder)
//!     → response (or structured proxy error)
//! ```

pub mod server;

pub use server::HttpServer;
