//! Observability subsystem.
//!
//! # Design Decisions
//! - Structured logging via the tracing crate
//! - JSON format for production, plain text for development
//! - Level configurable via config, overridable with RUST_LOG

pub mod logging;

pub use logging::init_logging;
