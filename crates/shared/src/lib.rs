//! Shared configuration for Filestore.
//!
//! This crate provides the settings every other crate reads:
//! - HTTP server bind address
//! - Storage backend selection and its connection parameters
//! - Upload limits and the allowed-extension set

pub mod config;

pub use config::{AppConfig, BackendKind, ObjectStoreSettings, ServerConfig, StorageSettings};
