//! Configuration validation utilities.

use super::ConfigError;
use super::models::*;

/// Validate the entire configuration.
pub fn validate_config(config: &PiiConfig) -> Result<(), ConfigError> {
    validate_runtime_config(&config.runtime)?;

    Ok(())
}

/// Validate runtime configuration.
///
/// The aggregation strategy name is deliberately not checked here: an unknown
/// strategy is a model construction failure, reported through readiness.
fn validate_runtime_config(config: &RuntimeConfig) -> Result<(), ConfigError> {
    if config.model_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "Model directory cannot be empty".to_string(),
        ));
    }

    if let Some(threshold) = config.score_threshold
        && !threshold.is_finite()
    {
        return Err(ConfigError::ValidationError(format!(
            "Score threshold must be a finite number, got {}",
            threshold
        )));
    }

    if config.max_seq_length == Some(0) {
        return Err(ConfigError::ValidationError(
            "Maximum sequence length must be greater than zero".to_string(),
        ));
    }

    if let Some(device) = &config.device
        && device.trim().is_empty()
    {
        return Err(ConfigError::ValidationError(
            "Device cannot be an empty string; leave it unset to auto-detect".to_string(),
        ));
    }

    Ok(())
}
