//! Storage service: validation and delegation to the configured backend.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info};

use super::backend::{BlobBackend, BlobContent};
use super::config::{StorageConfig, StorageProvider};
use super::error::StorageError;
use super::identifier::{self, content_type_for_key, is_valid_key, sanitize_filename};
use super::local::LocalFsBackend;
use super::s3::{ObjectStoreBackend, S3Settings};

/// Result of a successful upload.
#[derive(Debug, Clone, Serialize)]
pub struct StoredBlob {
    /// Generated identifier.
    pub file_id: String,
    /// Sanitized original filename.
    pub original_name: String,
    /// Size in bytes.
    pub size: u64,
    /// Content type recorded with the blob.
    pub content_type: String,
}

/// Existence probe result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlobStat {
    /// Identifier that was probed.
    pub file_id: String,
    /// Whether the blob exists.
    pub exists: bool,
    /// Size in bytes, when it exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Content type, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Last modification time, when the backend reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

impl BlobStat {
    fn absent(file_id: &str) -> Self {
        Self {
            file_id: file_id.to_string(),
            exists: false,
            size: None,
            content_type: None,
            last_modified: None,
        }
    }
}

/// Blob storage service. One instance per process, shared behind an `Arc`.
pub struct StorageService {
    backend: Arc<dyn BlobBackend>,
    config: StorageConfig,
}

impl StorageService {
    /// Create a storage service from configuration, building the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub async fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        let backend: Arc<dyn BlobBackend> = match &config.provider {
            StorageProvider::LocalFs { root } => {
                Arc::new(LocalFsBackend::new(root.clone()).await?)
            }
            StorageProvider::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
                prefix,
                timeout_secs,
            } => Arc::new(ObjectStoreBackend::new(&S3Settings {
                endpoint: endpoint.clone(),
                bucket: bucket.clone(),
                access_key_id: access_key_id.clone(),
                secret_access_key: secret_access_key.clone(),
                region: region.clone(),
                prefix: prefix.clone(),
                timeout: std::time::Duration::from_secs(*timeout_secs),
            })?),
        };

        info!(backend = backend.name(), "Storage backend initialized");
        Ok(Self::with_backend(backend, config))
    }

    /// Create a storage service over an existing backend.
    #[must_use]
    pub fn with_backend(backend: Arc<dyn BlobBackend>, config: StorageConfig) -> Self {
        Self { backend, config }
    }

    /// Validate an upload without touching the backend.
    ///
    /// Checks run in order: empty input, size limit, extension.
    ///
    /// # Errors
    ///
    /// Returns `NoFileProvided`, `FileTooLarge`, or `InvalidExtension`.
    pub fn validate_upload(&self, filename: &str, size: u64) -> Result<String, StorageError> {
        if filename.trim().is_empty() || size == 0 {
            return Err(StorageError::NoFileProvided);
        }

        if size > self.config.max_file_size {
            return Err(StorageError::file_too_large(size, self.config.max_file_size));
        }

        identifier::generate(filename, &self.config.allowed_extensions)
    }

    /// Store a new blob and return its identifier.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any backend I/O, or the backend's
    /// `BackendUnavailable` / `WriteFailed`.
    pub async fn store(
        &self,
        bytes: Bytes,
        filename: &str,
        content_type: Option<&str>,
    ) -> Result<StoredBlob, StorageError> {
        let size = bytes.len() as u64;
        let file_id = self.validate_upload(filename, size)?;
        let original_name = sanitize_filename(filename);

        let content_type = content_type
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
            .map_or_else(|| content_type_for_key(&file_id).to_string(), String::from);

        self.backend
            .write(&file_id, bytes, &content_type, &original_name)
            .await?;

        info!(
            file_id = %file_id,
            original_name = %original_name,
            size,
            backend = self.backend.name(),
            "Blob stored"
        );

        Ok(StoredBlob {
            file_id,
            original_name,
            size,
            content_type,
        })
    }

    /// Retrieve a blob by identifier.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `BackendUnavailable`, or `ReadFailed`.
    pub async fn retrieve(&self, file_id: &str) -> Result<BlobContent, StorageError> {
        if !is_valid_key(file_id) {
            return Err(StorageError::not_found(file_id));
        }

        match self.backend.read(file_id).await {
            Ok(content) => {
                debug!(file_id, size = content.bytes.len(), "Blob retrieved");
                Ok(content)
            }
            Err(StorageError::InvalidKey(_)) => Err(StorageError::not_found(file_id)),
            Err(e) => Err(e),
        }
    }

    /// Probe a blob without reading its body. Absence is not an error.
    ///
    /// # Errors
    ///
    /// Returns `BackendUnavailable` or `ReadFailed` when the backend cannot answer.
    pub async fn stat(&self, file_id: &str) -> Result<BlobStat, StorageError> {
        if !is_valid_key(file_id) {
            return Ok(BlobStat::absent(file_id));
        }

        match self.backend.head(file_id).await {
            Ok(meta) => Ok(BlobStat {
                file_id: file_id.to_string(),
                exists: true,
                size: Some(meta.size),
                content_type: Some(meta.content_type),
                last_modified: meta.last_modified,
            }),
            Err(StorageError::NotFound { .. } | StorageError::InvalidKey(_)) => {
                Ok(BlobStat::absent(file_id))
            }
            Err(e) => Err(e),
        }
    }

    /// Get the active backend name.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::backend::{BlobMetadata, MockBlobBackend};
    use std::collections::HashSet;
    use tempfile::TempDir;

    async fn local_service() -> (TempDir, StorageService) {
        let dir = TempDir::new().expect("temp dir");
        let config = StorageConfig::new(StorageProvider::local_fs(dir.path().join("uploads")));
        let service = StorageService::from_config(config)
            .await
            .expect("should create service");
        (dir, service)
    }

    fn mock_service(backend: MockBlobBackend) -> StorageService {
        StorageService::with_backend(
            Arc::new(backend),
            StorageConfig::new(StorageProvider::local_fs("./unused")).with_max_file_size(1024),
        )
    }

    #[tokio::test]
    async fn test_report_pdf_scenario() {
        let (_dir, service) = local_service().await;
        let payload = Bytes::from_static(b"0123456789");

        let stored = service
            .store(payload.clone(), "report.pdf", None)
            .await
            .expect("store");
        let (uuid, ext) = stored.file_id.rsplit_once('.').expect("extension");
        assert_eq!(ext, "pdf");
        assert!(uuid::Uuid::parse_str(uuid).is_ok());
        assert_eq!(stored.original_name, "report.pdf");
        assert_eq!(stored.content_type, "application/pdf");

        let stat = service.stat(&stored.file_id).await.expect("stat");
        assert!(stat.exists);
        assert_eq!(stat.size, Some(10));

        let content = service.retrieve(&stored.file_id).await.expect("retrieve");
        assert_eq!(content.bytes, payload);
        assert_eq!(content.original_name.as_deref(), Some("report.pdf"));
    }

    #[tokio::test]
    async fn test_declared_content_type_wins() {
        let (_dir, service) = local_service().await;
        let stored = service
            .store(Bytes::from_static(b"hello"), "notes.txt", Some("text/markdown"))
            .await
            .expect("store");
        let content = service.retrieve(&stored.file_id).await.expect("retrieve");
        assert_eq!(content.content_type, "text/markdown");
    }

    #[tokio::test]
    async fn test_never_stored_identifier() {
        let (_dir, service) = local_service().await;
        let id = "ffffffff-0000-0000-0000-000000000000.txt";

        let err = service.retrieve(id).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));

        let stat = service.stat(id).await.expect("stat never fails on absence");
        assert_eq!(stat, BlobStat::absent(id));
    }

    #[tokio::test]
    async fn test_traversal_identifier_is_absent() {
        let (_dir, service) = local_service().await;
        let err = service.retrieve("../Cargo.toml").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
        let stat = service.stat(".meta").await.expect("stat");
        assert!(!stat.exists);
    }

    #[tokio::test]
    async fn test_repeated_filename_gets_fresh_identifiers() {
        let (_dir, service) = local_service().await;
        let mut ids = HashSet::new();
        for i in 0..200 {
            let stored = service
                .store(Bytes::from(format!("payload {i}")), "same.txt", None)
                .await
                .expect("store");
            assert!(ids.insert(stored.file_id));
        }
    }

    #[tokio::test]
    async fn test_concurrent_stores_round_trip() {
        let (_dir, service) = local_service().await;
        let service = Arc::new(service);

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    let payload = Bytes::from(vec![u8::try_from(i).unwrap_or(0); 1000 + i]);
                    let stored = service
                        .store(payload.clone(), &format!("file-{i}.zip"), None)
                        .await
                        .expect("store");
                    (stored, payload)
                })
            })
            .collect();

        for handle in handles {
            let (stored, payload) = handle.await.expect("task");
            let content = service.retrieve(&stored.file_id).await.expect("retrieve");
            assert_eq!(content.bytes, payload);
        }
    }

    #[tokio::test]
    async fn test_rejected_uploads_never_reach_backend() {
        let mut backend = MockBlobBackend::new();
        backend.expect_write().never();
        backend.expect_name().return_const("mock");
        let service = mock_service(backend);

        let err = service
            .store(Bytes::from_static(b"MZ"), "malware.exe", None)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidExtension { .. }));

        let err = service
            .store(Bytes::from_static(b"data"), "README", None)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidExtension { .. }));

        let err = service.store(Bytes::new(), "empty.txt", None).await.unwrap_err();
        assert!(matches!(err, StorageError::NoFileProvided));

        let err = service
            .store(Bytes::from_static(b"data"), "  ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NoFileProvided));

        let err = service
            .store(Bytes::from(vec![0u8; 2048]), "big.pdf", None)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::FileTooLarge { size: 2048, max: 1024 }));
    }

    #[tokio::test]
    async fn test_backend_unavailable_propagates() {
        let mut backend = MockBlobBackend::new();
        backend
            .expect_write()
            .times(1)
            .returning(|_, _, _, _| Err(StorageError::unavailable("connect timeout")));
        backend.expect_name().return_const("mock");
        let service = mock_service(backend);

        let err = service
            .store(Bytes::from_static(b"data"), "a.txt", None)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::BackendUnavailable(_)));
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_stat_uses_head_only() {
        let mut backend = MockBlobBackend::new();
        backend.expect_read().never();
        backend.expect_head().times(1).returning(|_| {
            Ok(BlobMetadata {
                size: 42,
                content_type: "image/png".to_string(),
                last_modified: Some("2026-01-01T00:00:00Z".to_string()),
                original_name: None,
            })
        });
        let service = mock_service(backend);

        let stat = service.stat("abc.png").await.expect("stat");
        assert!(stat.exists);
        assert_eq!(stat.size, Some(42));
        assert_eq!(stat.content_type.as_deref(), Some("image/png"));
        assert_eq!(stat.last_modified.as_deref(), Some("2026-01-01T00:00:00Z"));
    }

    #[tokio::test]
    async fn test_stat_surfaces_backend_faults() {
        let mut backend = MockBlobBackend::new();
        backend
            .expect_head()
            .returning(|_| Err(StorageError::unavailable("no route to host")));
        let service = mock_service(backend);

        let err = service.stat("abc.png").await.unwrap_err();
        assert!(matches!(err, StorageError::BackendUnavailable(_)));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    // Size validation: anything above the limit is rejected, anything
    // non-empty at or below it passes the size check.
    proptest! {
        #[test]
        fn prop_file_size_validation(
            max_size in 1024u64..10_000_000,
            file_size in 1u64..20_000_000,
        ) {
            let config = StorageConfig::new(StorageProvider::local_fs("./test"))
                .with_max_file_size(max_size);
            let service = StorageService::with_backend(
                Arc::new(crate::storage::backend::MockBlobBackend::new()),
                config,
            );

            let result = service.validate_upload("invoice.pdf", file_size);

            if file_size <= max_size {
                prop_assert!(result.is_ok(), "Expected Ok for valid file size");
            } else {
                let is_too_large = matches!(result, Err(StorageError::FileTooLarge { .. }));
                prop_assert!(is_too_large, "Expected FileTooLarge error");
            }
        }
    }
}
