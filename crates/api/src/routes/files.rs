//! File upload, download, and metadata routes.

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tracing::info;

use crate::{AppState, error::ApiError};
use filestore_core::storage::{BlobStat, StorageError, identifier::sanitize_filename};

/// Multipart field carrying the upload.
const FILE_FIELD: &str = "file";

/// Creates the file routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload))
        .route("/download/{file_id}", get(download))
        .route("/files/{file_id}", get(file_info))
}

// ============================================================================
// Response Types
// ============================================================================

/// Response for a successful upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Human-readable confirmation.
    pub message: &'static str,
    /// Generated identifier.
    pub file_id: String,
    /// Sanitized original filename.
    pub original_name: String,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/upload`
/// Store the multipart field `file` and return its identifier.
async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        // Browsers send octet-stream for anything they cannot classify
        let content_type = field
            .content_type()
            .filter(|ct| *ct != "application/octet-stream")
            .map(str::to_string);
        let bytes = field.bytes().await?;
        upload = Some((filename, content_type, bytes));
        break;
    }

    let Some((filename, content_type, bytes)) = upload else {
        return Err(StorageError::NoFileProvided.into());
    };

    let stored = state
        .storage
        .store(bytes, &filename, content_type.as_deref())
        .await?;

    info!(file_id = %stored.file_id, size = stored.size, "File uploaded");

    Ok(Json(UploadResponse {
        message: "File uploaded",
        file_id: stored.file_id,
        original_name: stored.original_name,
    }))
}

/// GET `/download/{file_id}`
/// Stream the blob back as an attachment under its original name.
async fn download(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Response, ApiError> {
    let content = state.storage.retrieve(&file_id).await?;

    let filename = sanitize_filename(content.original_name.as_deref().unwrap_or(&file_id));
    let headers = [
        (header::CONTENT_TYPE, content.content_type),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
    ];

    Ok((headers, content.bytes).into_response())
}

/// GET `/files/{file_id}`
/// Report existence and size. A missing blob is a 404 carrying `exists: false`.
async fn file_info(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<(StatusCode, Json<BlobStat>), ApiError> {
    let stat = state.storage.stat(&file_id).await?;
    let status = if stat.exists {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    Ok((status, Json(stat)))
}
