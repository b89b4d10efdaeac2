//! Checkpoint loading and candle inference for token classification.
//!
//! A checkpoint is a local directory holding `config.json`,
//! `model.safetensors` and `tokenizer.json`. This module turns one into a
//! [`TokenClassifier`] and a [`PiiTokenizer`] on a resolved candle device.

pub mod checkpoint;
pub mod device;
pub mod error;
pub mod labels;
pub mod model;
pub mod tokenizer;

pub use checkpoint::{CheckpointConfig, ModelFiles};
pub use device::{DeviceSpec, resolve_device};
pub use error::{MLError, Result};
pub use labels::{BioPrefix, LabelMap, split_tag};
pub use model::{Architecture, TokenClassifier};
pub use tokenizer::{PiiTokenizer, TokenizedText};
