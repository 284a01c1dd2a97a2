//! Configuration loading and merging.
//!
//! Builds one fully merged configuration before any component is
//! constructed. Precedence, lowest to highest: built-in defaults,
//! environment variables (`OLLAMA_ROUTER_*`, `__` as the nesting
//! separator), then the config file. Command-line overrides are applied
//! on top by the binary after loading.

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable prefix for configuration overrides.
const ENV_PREFIX: &str = "OLLAMA_ROUTER_";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Figment(#[from] figment::Error),

    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("invalid configuration: {}", format_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration, merging defaults, environment, and an optional file.
///
/// The returned config is not yet validated; callers apply CLI overrides
/// first and then run [`validate`].
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    if let Some(path) = path {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        figment = figment.merge(Toml::file(path));
    }

    Ok(figment.extract()?)
}

/// Run semantic validation on a fully merged configuration.
pub fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    validate_config(config).map_err(ConfigError::Validation)
}
