//! API route definitions.

use axum::Router;

use crate::AppState;

pub mod files;
pub mod health;

/// Creates the API router with all routes.
pub fn routes() -> Router<AppState> {
    Router::new().merge(health::routes()).merge(files::routes())
}
