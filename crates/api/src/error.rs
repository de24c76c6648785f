//! JSON error responses.

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use filestore_core::storage::StorageError;

/// Errors a handler can return.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Storage service failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Request body was not valid multipart or exceeded the body limit.
    #[error(transparent)]
    Multipart(#[from] MultipartError),
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Storage(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Self::Multipart(e) => e.status(),
        }
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Storage(e) => e.error_code(),
            Self::Multipart(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => "file_too_large",
            Self::Multipart(_) => "invalid_multipart",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = match &self {
            Self::Storage(e) => e.to_string(),
            Self::Multipart(e) => e.body_text(),
        };

        if status.is_server_error() {
            error!(error = %message, code, "Request failed");
        } else {
            warn!(error = %message, code, "Request rejected");
        }

        (
            status,
            Json(json!({
                "error": code,
                "message": message
            })),
        )
            .into_response()
    }
}
