//! HTTP error mapping.
//!
//! Every failure leaves the API as `{error, message}` with a status derived
//! from the pipeline taxonomy.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::PipelineError;

/// Error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable detail.
    pub message: String,
}

/// Errors returned by API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request body could not be read as JSON of the expected shape.
    #[error("invalid request body: {0}")]
    BadRequest(String),

    /// The pipeline rejected or failed the request.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ApiError {
    /// Status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Pipeline(PipelineError::Validation { .. }) => {
                StatusCode::BAD_REQUEST
            }
            Self::Pipeline(PipelineError::UpstreamTimeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            Self::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    const fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Pipeline(PipelineError::Validation { .. }) => "validation_error",
            Self::Pipeline(PipelineError::UpstreamUnavailable { .. }) => "upstream_unavailable",
            Self::Pipeline(PipelineError::UpstreamTimeout { .. }) => "upstream_timeout",
            Self::Pipeline(PipelineError::Cancelled) => "cancelled",
            Self::Pipeline(PipelineError::Internal { .. }) => "internal_error",
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        tracing::error!(status = status.as_u16(), error = code, message = %self, "request failed");

        let body = ErrorResponse {
            error: code,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
