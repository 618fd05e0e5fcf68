//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, LoggingConfig, RuntimeConfig, SwitchyardConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &SwitchyardConfig) -> ConfigResult<()> {
    validate_runtime_config(&config.runtime)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Validates worker pool settings.
fn validate_runtime_config(runtime: &RuntimeConfig) -> ConfigResult<()> {
    if runtime.worker_threads == 0 {
        return Err(ConfigError::validation(
            "Worker thread count must be greater than 0",
        ));
    }

    if runtime.max_blocking_threads == 0 {
        return Err(ConfigError::validation(
            "Max blocking threads must be greater than 0",
        ));
    }

    if runtime.thread_name.trim().is_empty() {
        return Err(ConfigError::missing_field("runtime.thread_name"));
    }

    Ok(())
}

/// Validates logging settings.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    if let Some(module) = logging.filters.keys().find(|m| m.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Invalid log filter module name: {module:?}"
        )));
    }

    Ok(())
}
