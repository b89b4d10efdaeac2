//! Token-classification pipeline: encode, classify, aggregate.
//!
//! [`TokenClassificationPipeline`] is the seam between the runtime wrapper and
//! the model. [`CandlePipeline`] is the production implementation; tests plug
//! in their own detectors.

pub mod aggregation;
pub mod candle;

pub use aggregation::{AggregationStrategy, aggregate};
pub use candle::CandlePipeline;

use crate::ml::Result;
use serde::{Deserialize, Serialize};

/// A merged entity as produced by a pipeline, before thresholding.
///
/// `start`/`end` are char offsets into the input text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityGroup {
    /// Aggregated entity tag, without BIO prefix
    pub entity_group: Option<String>,
    /// Raw per-token label
    pub entity: Option<String>,
    pub score: Option<f32>,
    pub start: usize,
    pub end: usize,
    pub word: String,
}

impl EntityGroup {
    /// An aggregated group with a tag and score.
    pub fn grouped(
        tag: impl Into<String>,
        score: f32,
        start: usize,
        end: usize,
        word: impl Into<String>,
    ) -> Self {
        Self {
            entity_group: Some(tag.into()),
            entity: None,
            score: Some(score),
            start,
            end,
            word: word.into(),
        }
    }
}

/// Anything that can turn text into entity groups.
pub trait TokenClassificationPipeline: Send + Sync {
    /// Detect entities in `text`.
    fn run(&self, text: &str) -> Result<Vec<EntityGroup>>;

    /// Labels in class-id order.
    fn id2label(&self) -> Vec<String>;

    /// Name of the device inference runs on.
    fn device(&self) -> String;
}

/// Slice `text` by char positions, clamping both ends into range.
pub fn slice_chars(text: &str, start: usize, end: usize) -> String {
    let len = text.chars().count();
    let end = end.min(len);
    let start = start.min(end);
    text.chars().skip(start).take(end - start).collect()
}
