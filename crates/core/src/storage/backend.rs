//! Backend adapter contract shared by every storage medium.

use async_trait::async_trait;
use bytes::Bytes;

use super::error::StorageError;

/// Blob body and the metadata needed to deliver it as an attachment.
#[derive(Debug, Clone)]
pub struct BlobContent {
    /// Raw bytes.
    pub bytes: Bytes,
    /// MIME type reported by the backend or inferred from the key.
    pub content_type: String,
    /// Sanitized name recorded at store time, if the backend kept it.
    pub original_name: Option<String>,
}

/// Blob metadata returned by a head probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobMetadata {
    /// Size in bytes.
    pub size: u64,
    /// MIME type reported by the backend or inferred from the key.
    pub content_type: String,
    /// Last modification time, object store only.
    pub last_modified: Option<String>,
    /// Sanitized name recorded at store time, if the backend kept it.
    pub original_name: Option<String>,
}

/// A storage medium that can write, read, and probe blobs by key.
///
/// Implementations hold no cache and no per-key state; concurrent calls on
/// distinct or identical keys need no coordination.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobBackend: Send + Sync {
    /// Short backend name for logs and health output.
    fn name(&self) -> &'static str;

    /// Persist `bytes` under `key`. A failed write leaves nothing readable.
    async fn write(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
        original_name: &str,
    ) -> Result<(), StorageError>;

    /// Read the full blob stored under `key`.
    async fn read(&self, key: &str) -> Result<BlobContent, StorageError>;

    /// Fetch metadata for `key` without transferring the body.
    async fn head(&self, key: &str) -> Result<BlobMetadata, StorageError>;
}
