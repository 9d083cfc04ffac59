//! Error types for lyra-annotate
//!
//! Only failures that happen before the event stream starts become HTTP errors.
//! Everything after that point is contained per chunk or reported as an `error` event.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lyra_common::api::ErrorBody;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400) - malformed body, non-retryable
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Setup failure before the stream starts (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            ApiError::BadRequest(msg) | ApiError::Internal(msg) => msg,
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error = %error, "Request failed before streaming");
        } else {
            tracing::debug!(status = %status, error = %error, "Rejected request");
        }

        (status, Json(ErrorBody { error })).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
