//! Core storage logic for Filestore.
//!
//! This crate contains the blob storage abstraction with ZERO web dependencies.
//! Identifier generation, backend adapters, and the error taxonomy live here.
//!
//! # Modules
//!
//! - `storage` - Blob store service over a pluggable backend (local filesystem or S3)

pub mod storage;
