//! Blob storage for uploaded files.
//!
//! One [`StorageService`] fronts exactly one backend, chosen by configuration:
//! - Local filesystem, rooted at a fixed directory
//! - S3-compatible object store (AWS S3, MinIO, Cloudflare R2) via Apache OpenDAL
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        StorageService                            │
//! │      store(bytes, filename) │ retrieve(id) │ stat(id)            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  identifier::generate  →  {uuid_v4}.{allowed_extension}          │
//! ├──────────────────────────────┬──────────────────────────────────┤
//! │        LocalFsBackend        │       ObjectStoreBackend         │
//! │   tokio::fs under a root     │   OpenDAL S3 + TimeoutLayer      │
//! └──────────────────────────────┴──────────────────────────────────┘
//! ```

mod backend;
mod config;
mod error;
pub mod identifier;
mod local;
mod s3;
mod service;

pub use backend::{BlobBackend, BlobContent, BlobMetadata};
pub use config::{StorageConfig, StorageProvider};
pub use error::StorageError;
pub use local::LocalFsBackend;
pub use s3::{ObjectStoreBackend, S3Settings};
pub use service::{BlobStat, StorageService, StoredBlob};
