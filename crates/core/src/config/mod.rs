mod loader;
mod types;
mod validate;

pub use loader::{load_config, load_config_from_env, load_config_from_str};
pub use types::*;
pub use validate::validate_config;

use thiserror::Error;

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The given config file path does not exist.
    #[error("config file not found: {0}")]
    FileNotFound(String),

    /// The TOML or environment input could not be parsed.
    #[error("config parse error: {0}")]
    ParseError(String),

    /// The parsed configuration carries an unusable value.
    #[error("invalid config: {0}")]
    ValidationError(String),
}
