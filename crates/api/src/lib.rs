//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - Upload, download, and metadata routes over the storage service
//! - Health check route
//! - JSON error envelope for the storage error taxonomy

pub mod error;
pub mod routes;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use filestore_core::storage::StorageService;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Allowance on top of the upload limit for multipart framing and headers.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Storage service, created once at startup.
    pub storage: Arc<StorageService>,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.storage.config().max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .merge(routes::routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
