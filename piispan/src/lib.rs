//! # Piispan
//!
//! Detects personally identifiable information in free text with a local
//! token-classification checkpoint (BERT or XLM-RoBERTa, run through candle).
//!
//! ```rust,no_run
//! use piispan::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let config = ConfigBuilder::new()
//!         .with_model_dir("./models/xlm-roberta-large")
//!         .with_aggregation_strategy("first")
//!         .build()?;
//!
//!     let _guard = piispan::logging::init(&config.logging)?;
//!     let model = PiiModel::load(&config.runtime)?;
//!
//!     let spans = model.infer("contact: bob@test.io")?;
//!     assert!(spans.iter().all(|s| s.start <= s.end));
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`ml`]: checkpoint files, device selection, tokenizer and classifier
//! - [`pipeline`]: the [`pipeline::TokenClassificationPipeline`] seam and
//!   sub-word aggregation
//! - [`runtime`]: [`runtime::PiiModel`], thresholding and span extraction
//! - [`config`] and [`logging`]: ambient setup shared with the server crate

pub mod config;
pub mod logging;
pub mod ml;
pub mod pipeline;
pub mod runtime;

/// The prelude re-exports commonly used types for convenience
pub mod prelude {
    pub use crate::config::{
        ConfigBuilder, ConfigLoader, LogFormat, LogLevel, PiiConfig, RuntimeConfig,
    };
    pub use crate::ml::MLError;
    pub use crate::pipeline::{AggregationStrategy, EntityGroup, TokenClassificationPipeline};
    pub use crate::runtime::{PiiModel, Span};
    pub use crate::{PiiError, Result};
}

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error type for Piispan operations
#[derive(Debug, thiserror::Error)]
pub enum PiiError {
    /// Error loading or running the model
    #[error("ML error: {0}")]
    ML(#[from] crate::ml::MLError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(#[from] crate::config::ConfigError),

    /// Logging error
    #[error("Logging error: {0}")]
    Logging(#[from] crate::logging::LogError),
}

/// Result type for Piispan operations
pub type Result<T> = std::result::Result<T, PiiError>;
