//! HTTP API for the PII span detection service

use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    response::Json,
    routing::{get, post},
};
use http::HeaderValue;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::ServerConfig, error::ErrorResponse, state::AppState};

pub mod dto;
mod dto_tests;
pub mod inference;

use dto::{HealthResponse, RootResponse};

/// Service name reported by `GET /` and the OpenAPI document
pub const SERVICE_NAME: &str = "PII Model API";

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        root,
        health_check,
        inference::list_labels,
        inference::infer,
        inference::infer_batch,
    ),
    components(
        schemas(
            dto::InferRequest,
            dto::BatchInferRequest,
            dto::SpanDto,
            dto::InferResponse,
            dto::BatchItem,
            dto::BatchInferResponse,
            dto::LabelsResponse,
            dto::HealthResponse,
            dto::RootResponse,
            ErrorResponse,
        )
    ),
    tags(
        (name = "meta", description = "Service metadata and health"),
        (name = "model", description = "Model information"),
        (name = "inference", description = "PII span detection"),
    ),
    info(
        title = "PII Model API",
        description = "Detects personally identifiable information spans in text with a token-classification model.",
    )
)]
pub struct ApiDoc;

/// Create the router with all API endpoints and the documentation UI
pub fn create_router(state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/labels", get(inference::list_labels))
        .route("/infer", post(inference::infer))
        .route("/infer/batch", post(inference::infer_batch))
        .with_state(state);

    let swagger_router = SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi());

    api_router.merge(swagger_router)
}

/// Router plus body limit, CORS and request tracing layers
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);
    let max_request_size = state.config.max_request_size;

    create_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(RequestBodyLimitLayer::new(max_request_size))
            .layer(cors)
            .layer(DefaultBodyLimit::disable()),
    )
}

/// Any origin unless an allow-list is configured; never with credentials
pub fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match config.cors_origins() {
        None => layer.allow_origin(Any),
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| {
                    HeaderValue::from_str(origin)
                        .inspect_err(|e| {
                            warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin")
                        })
                        .ok()
                })
                .collect();
            layer.allow_origin(AllowOrigin::list(origins))
        }
    }
}

/// Service metadata
#[utoipa::path(
    get,
    path = "/",
    tag = "meta",
    responses(
        (status = 200, description = "Service metadata", body = RootResponse)
    )
)]
async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        ok: true,
        service: SERVICE_NAME.to_string(),
        version: piispan::VERSION.to_string(),
        docs: "/docs".to_string(),
    })
}

/// Model readiness; always answers, loaded or not
#[utoipa::path(
    get,
    path = "/health",
    tag = "meta",
    responses(
        (status = 200, description = "Service health and model readiness", body = HealthResponse)
    )
)]
async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let warnings = state.warnings();
    let model_dir = state.config.runtime.model_dir.display().to_string();

    let response = match state.model() {
        Ok(model) => HealthResponse {
            ok: true,
            model_dir,
            device: model.device().to_string(),
            labels: model.labels().to_vec(),
            init_error: None,
            warnings,
        },
        Err(_) => HealthResponse {
            ok: false,
            model_dir,
            device: state.config.configured_device().to_string(),
            labels: Vec::new(),
            init_error: state.init_error().map(str::to_string),
            warnings,
        },
    };

    Json(response)
}
