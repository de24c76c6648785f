//! Storage error types.

use thiserror::Error;

/// Storage operation errors.
///
/// Both backends normalize their failures into these variants, so callers
/// never see filesystem or object-store specific error shapes.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Upload carried no file, an empty filename, or zero bytes.
    #[error("no file provided")]
    NoFileProvided,

    /// Filename has no extension or the extension is not allowed.
    #[error("file type not allowed: '{filename}'")]
    InvalidExtension {
        /// The declared filename that was rejected.
        filename: String,
    },

    /// Storage key is not a single safe path segment.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// File size exceeds maximum allowed.
    #[error("file size {size} bytes exceeds maximum allowed {max} bytes")]
    FileTooLarge {
        /// Actual file size.
        size: u64,
        /// Maximum allowed size.
        max: u64,
    },

    /// File not found in storage.
    #[error("file not found: {key}")]
    NotFound {
        /// Storage key that was not found.
        key: String,
    },

    /// Backend unreachable, timed out, or rejected our credentials.
    #[error("storage backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Backend reachable but refused the write.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Backend reachable but the read failed.
    #[error("read failed: {0}")]
    ReadFailed(String),

    /// Storage provider configuration error.
    #[error("storage configuration error: {0}")]
    Configuration(String),
}

impl StorageError {
    /// Create an invalid extension error.
    #[must_use]
    pub fn invalid_extension(filename: impl Into<String>) -> Self {
        Self::InvalidExtension {
            filename: filename.into(),
        }
    }

    /// Create a file too large error.
    #[must_use]
    pub fn file_too_large(size: u64, max: u64) -> Self {
        Self::FileTooLarge { size, max }
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a backend unavailable error.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::BackendUnavailable(msg.into())
    }

    /// Create a write failure.
    #[must_use]
    pub fn write_failed(msg: impl Into<String>) -> Self {
        Self::WriteFailed(msg.into())
    }

    /// Create a read failure.
    #[must_use]
    pub fn read_failed(msg: impl Into<String>) -> Self {
        Self::ReadFailed(msg.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NoFileProvided | Self::InvalidExtension { .. } | Self::InvalidKey(_) => 400,
            Self::NotFound { .. } => 404,
            Self::FileTooLarge { .. } => 413,
            Self::BackendUnavailable(_)
            | Self::WriteFailed(_)
            | Self::ReadFailed(_)
            | Self::Configuration(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NoFileProvided => "no_file_provided",
            Self::InvalidExtension { .. } => "invalid_extension",
            Self::InvalidKey(_) => "invalid_key",
            Self::FileTooLarge { .. } => "file_too_large",
            Self::NotFound { .. } => "not_found",
            Self::BackendUnavailable(_) => "backend_unavailable",
            Self::WriteFailed(_) => "write_failed",
            Self::ReadFailed(_) => "read_failed",
            Self::Configuration(_) => "configuration_error",
        }
    }
}
