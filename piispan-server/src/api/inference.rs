//! Label listing and inference endpoints

use std::sync::Arc;

use axum::{
    extract::{State, rejection::JsonRejection},
    response::Json,
};
use tracing::debug;

use crate::{
    api::dto::{
        BatchInferRequest, BatchInferResponse, BatchItem, InferRequest, InferResponse,
        LabelsResponse, SpanDto,
    },
    error::{ErrorResponse, ServerResult},
    state::AppState,
};

/// List the labels the model can emit
#[utoipa::path(
    get,
    path = "/labels",
    tag = "model",
    responses(
        (status = 200, description = "Sorted model labels", body = LabelsResponse),
        (status = 503, description = "Model not loaded", body = ErrorResponse)
    )
)]
pub async fn list_labels(
    State(state): State<Arc<AppState>>,
) -> ServerResult<Json<LabelsResponse>> {
    let model = state.model()?;
    Ok(Json(LabelsResponse {
        labels: model.labels().to_vec(),
    }))
}

/// Detect PII spans in one text
#[utoipa::path(
    post,
    path = "/infer",
    tag = "inference",
    request_body = InferRequest,
    responses(
        (status = 200, description = "Detected spans", body = InferResponse),
        (status = 422, description = "Malformed request body", body = ErrorResponse),
        (status = 503, description = "Model not loaded", body = ErrorResponse),
        (status = 500, description = "Inference failed", body = ErrorResponse)
    )
)]
pub async fn infer(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<InferRequest>, JsonRejection>,
) -> ServerResult<Json<InferResponse>> {
    let Json(request) = payload?;
    state.model()?;

    debug!(chars = request.text.chars().count(), "Inference request");

    let text = request.text;
    let (text, spans) = state
        .run_inference(move |model| {
            let spans = model.infer(&text);
            (text, spans)
        })
        .await?;

    Ok(Json(InferResponse {
        text,
        spans: spans?.into_iter().map(SpanDto::from).collect(),
        masked: None,
    }))
}

/// Detect PII spans in each text; a failing text does not fail the batch
#[utoipa::path(
    post,
    path = "/infer/batch",
    tag = "inference",
    request_body = BatchInferRequest,
    responses(
        (status = 200, description = "Per-text results in request order", body = BatchInferResponse),
        (status = 422, description = "Malformed request body", body = ErrorResponse),
        (status = 503, description = "Model not loaded", body = ErrorResponse)
    )
)]
pub async fn infer_batch(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BatchInferRequest>, JsonRejection>,
) -> ServerResult<Json<BatchInferResponse>> {
    let Json(request) = payload?;
    state.model()?;

    debug!(texts = request.texts.len(), "Batch inference request");

    let texts = request.texts;
    let (texts, outcomes) = state
        .run_inference(move |model| {
            let outcomes = model.infer_batch_isolated(&texts);
            (texts, outcomes)
        })
        .await?;

    let results = texts
        .into_iter()
        .zip(outcomes)
        .map(|(text, outcome)| match outcome {
            Ok(spans) => BatchItem {
                text,
                spans: spans.into_iter().map(SpanDto::from).collect(),
                error: None,
            },
            Err(e) => BatchItem {
                text,
                spans: Vec::new(),
                error: Some(e.to_string()),
            },
        })
        .collect();

    Ok(Json(BatchInferResponse { results }))
}
