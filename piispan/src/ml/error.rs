//! Error types for ML operations

use std::fmt;
use thiserror::Error;

/// Error type for ML operations
#[derive(Debug, Error)]
pub enum MLError {
    /// Error during model loading
    #[error("Failed to load model: {0}")]
    ModelLoading(String),

    /// Error during tokenization
    #[error("Tokenization error: {0}")]
    Tokenization(String),

    /// Error during a forward pass or post-processing
    #[error("Inference error: {0}")]
    Inference(String),

    /// Error related to model configuration
    #[error("Model configuration error: {0}")]
    Configuration(String),

    /// Requested device is unknown or unavailable
    #[error("Device error: {0}")]
    Device(String),

    /// IO error during model operations
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}

impl MLError {
    /// Create a new model loading error
    pub fn model_loading(msg: impl fmt::Display) -> Self {
        Self::ModelLoading(msg.to_string())
    }

    /// Create a new tokenization error
    pub fn tokenization(msg: impl fmt::Display) -> Self {
        Self::Tokenization(msg.to_string())
    }

    /// Create a new inference error
    pub fn inference(msg: impl fmt::Display) -> Self {
        Self::Inference(msg.to_string())
    }

    /// Create a new configuration error
    pub fn configuration(msg: impl fmt::Display) -> Self {
        Self::Configuration(msg.to_string())
    }

    /// Create a new device error
    pub fn device(msg: impl fmt::Display) -> Self {
        Self::Device(msg.to_string())
    }
}

impl From<candle_core::Error> for MLError {
    fn from(err: candle_core::Error) -> Self {
        MLError::Inference(format!("Candle error: {}", err))
    }
}

/// Result type for ML operations
pub type Result<T> = std::result::Result<T, MLError>;
