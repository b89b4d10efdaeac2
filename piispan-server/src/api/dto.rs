//! Data Transfer Objects for the API

use piispan::runtime::Span;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Single-text inference request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InferRequest {
    /// Text to analyze
    #[schema(example = "메일 alice@example.com / 번호 010-1234-5678 입니다.")]
    pub text: String,

    /// Reserved for returning a masked copy of the text; currently ignored
    pub mask: Option<bool>,
}

/// Batch inference request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchInferRequest {
    /// Texts to analyze, processed in order
    pub texts: Vec<String>,

    /// Reserved for returning masked copies of the texts; currently ignored
    pub mask: Option<bool>,
}

/// A detected PII span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SpanDto {
    /// Start offset in characters
    pub start: usize,

    /// End offset in characters, exclusive
    pub end: usize,

    /// Entity label, e.g. `EMAIL`
    pub label: String,

    /// The input text between `start` and `end`
    pub text: String,

    /// Model confidence
    pub score: Option<f32>,
}

impl From<Span> for SpanDto {
    fn from(span: Span) -> Self {
        Self {
            start: span.start,
            end: span.end,
            label: span.label,
            text: span.text,
            score: span.score,
        }
    }
}

/// Single-text inference result
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InferResponse {
    /// Echo of the input text
    pub text: String,

    pub spans: Vec<SpanDto>,

    /// Masked text; always null
    pub masked: Option<String>,
}

/// Result for one text of a batch
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchItem {
    pub text: String,

    pub spans: Vec<SpanDto>,

    /// Present only when inference failed for this text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Batch inference result, aligned index-for-index with the request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchInferResponse {
    pub results: Vec<BatchItem>,
}

/// Model labels
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LabelsResponse {
    /// Sorted, de-duplicated labels from the model's id2label map
    pub labels: Vec<String>,
}

/// Service health and model readiness
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Whether the model is loaded
    pub ok: bool,

    pub model_dir: String,

    /// Resolved device when ready, otherwise the configured value or `auto`
    pub device: String,

    pub labels: Vec<String>,

    /// Why the model failed to load
    pub init_error: Option<String>,

    /// Tolerated problems such as an invalid threshold or a failed warmup
    pub warnings: Vec<String>,
}

/// Service metadata
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RootResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,

    /// Path of the interactive API documentation
    pub docs: String,
}
