//! Error handling for the Piispan server

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use piispan::ml::MLError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Message used when the model failed to load without a recorded reason
pub const DEFAULT_NOT_READY_MESSAGE: &str = "Model init failed";

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Stable machine-readable code, e.g. `MODEL_NOT_READY`
    pub error: String,
    pub message: String,
}

/// Server error types
#[derive(Debug, Error)]
pub enum ServerError {
    /// The model could not be loaded at startup
    #[error("{0}")]
    NotReady(String),

    /// Malformed JSON or a body of the wrong shape
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Request body exceeds the configured limit
    #[error("Request body too large: {0}")]
    PayloadTooLarge(String),

    /// Inference failed for a request
    #[error("Inference failed: {0}")]
    Inference(#[from] MLError),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::Inference(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the error code string
    pub fn error_type(&self) -> &'static str {
        match self {
            ServerError::NotReady(_) => "MODEL_NOT_READY",
            ServerError::Validation(_) | ServerError::PayloadTooLarge(_) => "INVALID_REQUEST",
            ServerError::Inference(_) => "INFERENCE_FAILED",
            ServerError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServerError::PayloadTooLarge(rejection.body_text())
        } else {
            ServerError::Validation(rejection.body_text())
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.error_type(), "Request failed");
        }

        let error_response = ErrorResponse {
            error: self.error_type().to_string(),
            message: self.to_string(),
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

/// Helper function to create a not-ready error from an optional init error
pub fn not_ready(init_error: Option<&str>) -> ServerError {
    let message = init_error
        .filter(|msg| !msg.is_empty())
        .unwrap_or(DEFAULT_NOT_READY_MESSAGE);
    ServerError::NotReady(message.to_string())
}
