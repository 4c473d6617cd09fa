use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, validate::validate_config, ConfigError};

/// Load configuration from file with environment variable overrides.
///
/// Environment variables use the `ORDERFLOW_` prefix with `__` as the
/// section separator, e.g. `ORDERFLOW_TIMER__TICK_INTERVAL_SECS=5`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("ORDERFLOW_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    validate_config(&config)?;
    Ok(config)
}

/// Default configuration with environment variable overrides, for running
/// without a config file.
pub fn load_config_from_env() -> Result<Config, ConfigError> {
    let config: Config = Figment::new()
        .merge(Env::prefixed("ORDERFLOW_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    validate_config(&config)?;
    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    let config: Config =
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}
