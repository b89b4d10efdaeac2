//! Model runtime: a checkpoint turned into a text-to-PII-spans callable.
//!
//! [`PiiModel`] owns a [`TokenClassificationPipeline`] and applies the
//! score threshold, label fallback and offset clamping on top of its output.
//!
//! ```rust,no_run
//! use piispan::config::ConfigBuilder;
//! use piispan::runtime::PiiModel;
//!
//! # fn main() -> piispan::Result<()> {
//! let config = ConfigBuilder::new()
//!     .with_model_dir("./models/xlm-roberta-large")
//!     .with_score_threshold(0.5)
//!     .build()?;
//! let model = PiiModel::load(&config.runtime)?;
//!
//! for span in model.infer("메일 alice@example.com")? {
//!     println!("{} [{}..{}] {}", span.label, span.start, span.end, span.text);
//! }
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::RuntimeConfig;
use crate::ml::Result;
use crate::ml::labels::sorted_unique;
use crate::pipeline::{CandlePipeline, EntityGroup, TokenClassificationPipeline, slice_chars};

/// Label used when a pipeline returns neither a group nor a token label.
pub const UNKNOWN_LABEL: &str = "UNK";

/// Text fed through the pipeline once after loading.
pub const WARMUP_TEXT: &str = "warmup";

/// A labelled substring of the input.
///
/// `start` and `end` are char offsets and `text` is always the input sliced
/// at `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub label: String,
    pub text: String,
    pub score: Option<f32>,
}

/// A loaded token-classification model with its post-processing settings.
pub struct PiiModel {
    model_dir: PathBuf,
    device: String,
    labels: Vec<String>,
    score_threshold: Option<f32>,
    pipeline: Box<dyn TokenClassificationPipeline>,
    warmup_error: Option<String>,
}

impl std::fmt::Debug for PiiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PiiModel")
            .field("model_dir", &self.model_dir)
            .field("device", &self.device)
            .field("labels", &self.labels)
            .field("score_threshold", &self.score_threshold)
            .field("warmup_error", &self.warmup_error)
            .finish_non_exhaustive()
    }
}

impl PiiModel {
    /// Load the checkpoint in `config.model_dir` onto the configured device.
    pub fn load(config: &RuntimeConfig) -> Result<Self> {
        let pipeline = CandlePipeline::load(config)?;
        Ok(Self::from_pipeline(config, Box::new(pipeline)))
    }

    /// Wrap an already constructed pipeline, running warmup if enabled.
    pub fn from_pipeline(
        config: &RuntimeConfig,
        pipeline: Box<dyn TokenClassificationPipeline>,
    ) -> Self {
        let mut model = Self {
            model_dir: config.model_dir.clone(),
            device: pipeline.device(),
            labels: sorted_unique(pipeline.id2label()),
            score_threshold: config.score_threshold,
            pipeline,
            warmup_error: None,
        };

        if config.warmup {
            model.warmup();
        }

        info!(
            model_dir = %model.model_dir.display(),
            device = %model.device,
            labels = model.labels.len(),
            score_threshold = ?model.score_threshold,
            "Model runtime initialized"
        );
        model
    }

    fn warmup(&mut self) {
        match self.pipeline.run(WARMUP_TEXT) {
            Ok(_) => debug!("Warmup inference completed"),
            Err(e) => {
                warn!(error = %e, "Warmup inference failed");
                self.warmup_error = Some(e.to_string());
            }
        }
    }

    /// Detect PII spans in one text.
    pub fn infer(&self, text: &str) -> Result<Vec<Span>> {
        let groups = self.pipeline.run(text)?;
        let len = text.chars().count();

        Ok(groups
            .into_iter()
            .filter_map(|group| self.to_span(text, len, group))
            .collect())
    }

    fn to_span(&self, text: &str, len: usize, group: EntityGroup) -> Option<Span> {
        let score = group.score.unwrap_or(0.0);
        if let Some(threshold) = self.score_threshold
            && score < threshold
        {
            return None;
        }

        let label = group
            .entity_group
            .filter(|label| !label.is_empty())
            .or(group.entity.filter(|label| !label.is_empty()))
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string());

        let end = group.end.min(len);
        let start = group.start.min(end);

        Some(Span {
            start,
            end,
            label,
            text: slice_chars(text, start, end),
            score: Some(score),
        })
    }

    /// Detect spans in each text in order, stopping at the first failure.
    pub fn infer_batch<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<Vec<Span>>> {
        texts.iter().map(|text| self.infer(text.as_ref())).collect()
    }

    /// Detect spans in each text in order, keeping every item's own outcome.
    pub fn infer_batch_isolated<S: AsRef<str>>(&self, texts: &[S]) -> Vec<Result<Vec<Span>>> {
        texts
            .iter()
            .enumerate()
            .map(|(index, text)| {
                self.infer(text.as_ref()).inspect_err(|e| {
                    warn!(index, error = %e, "Batch item failed");
                })
            })
            .collect()
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Device inference runs on, such as `cpu` or `cuda:0`.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Sorted, de-duplicated model labels.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn score_threshold(&self) -> Option<f32> {
        self.score_threshold
    }

    /// Error raised by the warmup inference, if any.
    pub fn warmup_error(&self) -> Option<&str> {
        self.warmup_error.as_deref()
    }
}
