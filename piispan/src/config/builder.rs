//! Configuration builder.
//!
//! This module provides a builder pattern API for creating configurations.

use super::{Result, models::*, validation};
use std::path::Path;

/// Builder for creating PiiConfig instances.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: PiiConfig,
}

impl ConfigBuilder {
    /// Create a new configuration builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the checkpoint directory.
    pub fn with_model_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.runtime.model_dir = path.as_ref().to_path_buf();
        self
    }

    /// Pin inference to a device instead of auto-detecting one.
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.config.runtime.device = Some(device.into());
        self
    }

    /// Set the aggregation strategy by name.
    pub fn with_aggregation_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.config.runtime.aggregation_strategy = strategy.into();
        self
    }

    /// Drop entities scoring below `threshold`.
    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.config.runtime.score_threshold = Some(threshold);
        self
    }

    /// Enable or disable the warmup inference.
    pub fn with_warmup(mut self, warmup: bool) -> Self {
        self.config.runtime.warmup = warmup;
        self
    }

    /// Cap the number of encoded tokens per text.
    pub fn with_max_seq_length(mut self, length: usize) -> Self {
        self.config.runtime.max_seq_length = Some(length);
        self
    }

    /// Set the log level.
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.config.logging.level = level;
        self
    }

    /// Set the log format.
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.config.logging.format = format;
        self
    }

    /// Also write logs to a file.
    pub fn with_log_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.logging.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<PiiConfig> {
        validation::validate_config(&self.config)?;
        Ok(self.config)
    }
}
