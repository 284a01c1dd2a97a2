//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! built-in defaults
//!     → environment (OLLAMA_ROUTER_*, "__" nesting)
//!     → config file (TOML)
//!     → command-line overrides (applied by the binary)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → shared via the application state with all subsystems
//! ```
//!
//! # Design Decisions
//! - One fully merged config exists before any component is constructed
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, validate, ConfigError};
pub use schema::{
    AppConfig, LogFormat, LoggingConfig, RouteRule, ServerConfig, TlsSettings, UpstreamConfig,
};
