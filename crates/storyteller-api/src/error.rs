//! StoryTeller — API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use storyteller_core::error::{PlaybackError, StoreError};
use thiserror::Error;

/// Startup errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Opening the content store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around domain errors that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A content store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A playback engine failure.
    #[error(transparent)]
    Playback(#[from] PlaybackError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            Self::Store(StoreError::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
            Self::Store(StoreError::Validation(_)) => (StatusCode::BAD_REQUEST, "validation_error"),
            Self::Store(StoreError::Io(_)) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            Self::Playback(PlaybackError::NoContent) => (StatusCode::NOT_FOUND, "no_content"),
            Self::Playback(PlaybackError::UnknownBranch(_)) => {
                (StatusCode::NOT_FOUND, "unknown_branch")
            }
            Self::Playback(PlaybackError::OutOfRange(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "out_of_range")
            }
            Self::Playback(PlaybackError::InvalidOperation(_)) => {
                (StatusCode::CONFLICT, "invalid_operation")
            }
        };

        let body = ErrorBody {
            error: error_code,
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
