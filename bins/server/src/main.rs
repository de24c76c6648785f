//! Filestore API Server
//!
//! Main entry point for the Filestore upload/download service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use filestore_api::{AppState, create_router};
use filestore_core::storage::{StorageConfig, StorageService};
use filestore_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "filestore=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("failed to load configuration")?;

    // Build the storage service once; every request shares it
    let storage_config = StorageConfig::from_settings(&config.storage)?;
    info!(
        backend = storage_config.provider.name(),
        max_upload_bytes = storage_config.max_file_size,
        allowed_extensions = ?storage_config.allowed_extensions,
        "Storage configured"
    );
    let storage = StorageService::from_config(storage_config).await?;

    // Create application state
    let state = AppState {
        storage: Arc::new(storage),
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
