use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Timer intervals are non-zero
/// - The timeout target is a usable partial state
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.timer.tick_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "timer.tick_interval_secs cannot be 0".to_string(),
        ));
    }

    if config.timer.sla_threshold_secs == 0 {
        return Err(ConfigError::ValidationError(
            "timer.sla_threshold_secs cannot be 0".to_string(),
        ));
    }

    if !config.timer.timeout_state.is_assignable() {
        return Err(ConfigError::ValidationError(format!(
            "timer.timeout_state cannot be {}",
            config.timer.timeout_state.as_str()
        )));
    }

    Ok(())
}
