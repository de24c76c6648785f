//! Application configuration management.

use std::path::PathBuf;

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Storage configuration.
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5003
}

/// Which storage medium is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Local filesystem under `local_root`.
    #[default]
    Local,
    /// S3-compatible object store.
    S3,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Active backend.
    #[serde(default)]
    pub backend: BackendKind,
    /// Root directory for the local backend.
    #[serde(default = "default_local_root")]
    pub local_root: PathBuf,
    /// Maximum upload size in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    /// Allowed extensions; `None` keeps the built-in set.
    #[serde(default)]
    pub allowed_extensions: Option<Vec<String>>,
    /// Object store connection parameters.
    #[serde(default)]
    pub s3: ObjectStoreSettings,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            local_root: default_local_root(),
            max_upload_bytes: default_max_upload_bytes(),
            allowed_extensions: None,
            s3: ObjectStoreSettings::default(),
        }
    }
}

fn default_local_root() -> PathBuf {
    PathBuf::from("./uploads")
}

fn default_max_upload_bytes() -> u64 {
    16 * 1024 * 1024 // 16 MiB
}

/// Object store connection parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectStoreSettings {
    /// Endpoint override for self-hosted stores.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Region.
    #[serde(default = "default_region")]
    pub region: String,
    /// Bucket name. Mandatory for the s3 backend.
    #[serde(default)]
    pub bucket: Option<String>,
    /// Access key ID. Mandatory for the s3 backend.
    #[serde(default)]
    pub access_key_id: Option<String>,
    /// Secret access key. Mandatory for the s3 backend.
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Key prefix inside the bucket.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ObjectStoreSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: default_region(),
            bucket: None,
            access_key_id: None,
            secret_access_key: None,
            prefix: default_prefix(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_prefix() -> String {
    "uploads/".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl StorageSettings {
    /// Checks the upload limit and, for the s3 backend, bucket and credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the s3 backend lacks bucket or credentials, or the
    /// upload limit is zero.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.max_upload_bytes == 0 {
            return Err(config::ConfigError::Message(
                "storage.max_upload_bytes must be greater than zero".to_string(),
            ));
        }

        if self.backend == BackendKind::S3 {
            require(self.s3.bucket.as_ref(), "bucket")?;
            require(self.s3.access_key_id.as_ref(), "access_key_id")?;
            require(self.s3.secret_access_key.as_ref(), "secret_access_key")?;
        }

        Ok(())
    }
}

fn require(value: Option<&String>, key: &str) -> Result<(), config::ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(config::ConfigError::Message(format!(
            "storage.s3.{key} is required when storage.backend = \"s3\""
        ))),
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Environment variables use the `FILESTORE` prefix and `__` as the
    /// nesting separator, e.g. `FILESTORE__STORAGE__S3__BUCKET`.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or is incomplete.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("FILESTORE")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("storage.allowed_extensions"),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field requirements that serde defaults cannot express.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage settings are incomplete.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        self.storage.validate()
    }
}
