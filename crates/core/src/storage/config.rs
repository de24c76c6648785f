//! Storage configuration types.

use filestore_shared::{BackendKind, StorageSettings};
use std::path::PathBuf;

use super::error::StorageError;

/// Storage provider configuration.
#[derive(Debug, Clone)]
pub enum StorageProvider {
    /// S3-compatible storage: AWS S3, MinIO, Cloudflare R2
    S3 {
        /// Endpoint override for self-hosted stores; `None` uses the managed default.
        endpoint: Option<String>,
        /// S3 bucket name.
        bucket: String,
        /// Access key ID.
        access_key_id: String,
        /// Secret access key.
        secret_access_key: String,
        /// Region.
        region: String,
        /// Key prefix every identifier is appended to.
        prefix: String,
        /// Per-request timeout in seconds.
        timeout_secs: u64,
    },
    /// Local filesystem
    LocalFs {
        /// Root directory path.
        root: PathBuf,
    },
}

impl StorageProvider {
    /// Default region when none is configured.
    pub const DEFAULT_REGION: &'static str = "us-east-1";
    /// Default key prefix inside the bucket.
    pub const DEFAULT_PREFIX: &'static str = "uploads/";
    /// Default object store request timeout: 10 seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

    /// Create S3-compatible provider with default region, prefix, and timeout.
    #[must_use]
    pub fn s3(
        bucket: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        Self::S3 {
            endpoint: None,
            bucket: bucket.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: Self::DEFAULT_REGION.to_string(),
            prefix: Self::DEFAULT_PREFIX.to_string(),
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Create local filesystem provider.
    #[must_use]
    pub fn local_fs(root: impl Into<PathBuf>) -> Self {
        Self::LocalFs { root: root.into() }
    }

    /// Set the endpoint override (S3 only).
    #[must_use]
    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        if let Self::S3 { endpoint, .. } = &mut self {
            *endpoint = Some(url.into());
        }
        self
    }

    /// Set the region (S3 only).
    #[must_use]
    pub fn with_region(mut self, value: impl Into<String>) -> Self {
        if let Self::S3 { region, .. } = &mut self {
            *region = value.into();
        }
        self
    }

    /// Set the key prefix (S3 only).
    #[must_use]
    pub fn with_prefix(mut self, value: impl Into<String>) -> Self {
        if let Self::S3 { prefix, .. } = &mut self {
            *prefix = value.into();
        }
        self
    }

    /// Set the request timeout (S3 only).
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        if let Self::S3 { timeout_secs, .. } = &mut self {
            *timeout_secs = secs;
        }
        self
    }

    /// Get the provider name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::S3 { .. } => "s3",
            Self::LocalFs { .. } => "local",
        }
    }
}

/// Storage service configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage provider configuration.
    pub provider: StorageProvider,
    /// Maximum file size in bytes.
    pub max_file_size: u64,
    /// Allowed file extensions, lower-case, without the dot.
    pub allowed_extensions: Vec<String>,
}

impl StorageConfig {
    /// Default max file size: 16MB.
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;

    /// Create a new storage config with default settings.
    #[must_use]
    pub fn new(provider: StorageProvider) -> Self {
        Self {
            provider,
            max_file_size: Self::DEFAULT_MAX_FILE_SIZE,
            allowed_extensions: Self::default_extensions(),
        }
    }

    /// Set maximum file size.
    #[must_use]
    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// Set allowed extensions. Entries are trimmed, lower-cased, and stripped
    /// of a leading dot; empty entries are dropped.
    #[must_use]
    pub fn with_allowed_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    /// Default allowed extensions: common documents, images, and archives.
    #[must_use]
    pub fn default_extensions() -> Vec<String> {
        [
            // Documents
            "txt", "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
            // Images
            "png", "jpg", "jpeg", "gif",
            // Archives
            "zip", "rar", "7z",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    /// Build the storage config from loaded application settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the settings fail validation.
    pub fn from_settings(settings: &StorageSettings) -> Result<Self, StorageError> {
        settings
            .validate()
            .map_err(|e| StorageError::configuration(e.to_string()))?;

        let provider = match settings.backend {
            BackendKind::Local => StorageProvider::local_fs(settings.local_root.clone()),
            BackendKind::S3 => {
                let s3 = &settings.s3;
                let provider = StorageProvider::s3(
                    s3.bucket.clone().unwrap_or_default(),
                    s3.access_key_id.clone().unwrap_or_default(),
                    s3.secret_access_key.clone().unwrap_or_default(),
                )
                .with_region(s3.region.clone())
                .with_prefix(s3.prefix.clone())
                .with_timeout_secs(s3.timeout_secs);

                match &s3.endpoint {
                    Some(endpoint) if !endpoint.trim().is_empty() => {
                        provider.with_endpoint(endpoint)
                    }
                    _ => provider,
                }
            }
        };

        let config = Self::new(provider).with_max_file_size(settings.max_upload_bytes);
        Ok(match &settings.allowed_extensions {
            Some(extensions) => config.with_allowed_extensions(extensions),
            None => config,
        })
    }
}
