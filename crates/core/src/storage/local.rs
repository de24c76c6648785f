//! Local filesystem backend.
//!
//! Blobs live directly under a root directory, one file per identifier.
//! Display metadata goes to a JSON sidecar under `<root>/.meta/`.

use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use super::backend::{BlobBackend, BlobContent, BlobMetadata};
use super::error::StorageError;
use super::identifier::{content_type_for_key, is_valid_key};

const META_DIR: &str = ".meta";

/// Display metadata kept next to each blob.
#[derive(Debug, Serialize, Deserialize)]
struct Sidecar {
    original_name: String,
    content_type: String,
}

/// Filesystem-backed blob storage rooted at a fixed directory.
#[derive(Debug, Clone)]
pub struct LocalFsBackend {
    root: PathBuf,
}

impl LocalFsBackend {
    /// Open the backend, creating the root directory if absent.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the root cannot be created.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(root.join(META_DIR)).await.map_err(|e| {
            StorageError::configuration(format!(
                "cannot create storage root {}: {e}",
                root.display()
            ))
        })?;
        Ok(Self { root })
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to a path that is guaranteed to sit directly in the root.
    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        if !is_valid_key(key) || key.starts_with('.') {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        let mut components = Path::new(key).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Ok(self.root.join(name)),
            _ => Err(StorageError::InvalidKey(key.to_string())),
        }
    }

    fn sidecar_path(&self, key: &str) -> PathBuf {
        self.root.join(META_DIR).join(format!("{key}.json"))
    }

    async fn load_sidecar(&self, key: &str) -> Option<Sidecar> {
        let raw = match fs::read(self.sidecar_path(key)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                debug!(key, error = %e, "Unreadable sidecar");
                return None;
            }
        };
        serde_json::from_slice(&raw)
            .inspect_err(|e| debug!(key, error = %e, "Malformed sidecar"))
            .ok()
    }
}

fn read_error(key: &str, err: &io::Error) -> StorageError {
    match err.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::IsADirectory => StorageError::not_found(key),
        _ => StorageError::read_failed(format!("{key}: {err}")),
    }
}

#[async_trait]
impl BlobBackend for LocalFsBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn write(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
        original_name: &str,
    ) -> Result<(), StorageError> {
        let path = self.resolve(key)?;

        if let Err(e) = fs::write(&path, &bytes).await {
            if let Err(cleanup) = fs::remove_file(&path).await {
                debug!(key, error = %cleanup, "No partial file to clean up");
            }
            return Err(StorageError::write_failed(format!("{key}: {e}")));
        }

        let sidecar = Sidecar {
            original_name: original_name.to_string(),
            content_type: content_type.to_string(),
        };
        let json = serde_json::to_vec(&sidecar)
            .map_err(|e| StorageError::write_failed(format!("{key}: {e}")))?;
        if let Err(e) = fs::write(self.sidecar_path(key), json).await {
            warn!(key, error = %e, "Failed to write sidecar, original name will be lost");
        }

        Ok(())
    }

    async fn read(&self, key: &str) -> Result<BlobContent, StorageError> {
        let path = self.resolve(key)?;
        let bytes = fs::read(&path).await.map_err(|e| read_error(key, &e))?;
        let sidecar = self.load_sidecar(key).await;

        let (content_type, original_name) = match sidecar {
            Some(s) => (s.content_type, Some(s.original_name)),
            None => (content_type_for_key(key).to_string(), None),
        };

        Ok(BlobContent {
            bytes: Bytes::from(bytes),
            content_type,
            original_name,
        })
    }

    async fn head(&self, key: &str) -> Result<BlobMetadata, StorageError> {
        let path = self.resolve(key)?;
        let meta = fs::metadata(&path).await.map_err(|e| read_error(key, &e))?;
        if !meta.is_file() {
            return Err(StorageError::not_found(key));
        }
        let sidecar = self.load_sidecar(key).await;

        let (content_type, original_name) = match sidecar {
            Some(s) => (s.content_type, Some(s.original_name)),
            None => (content_type_for_key(key).to_string(), None),
        };

        Ok(BlobMetadata {
            size: meta.len(),
            content_type,
            last_modified: None,
            original_name,
        })
    }
}
