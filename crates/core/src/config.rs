//! Configuration types shared across crates.
//!
//! All five process-wide inputs live here: auth secrets, the externally
//! visible base URL, and the storage and metadata connection descriptors.
//! Changing any of them requires a restart.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Externally visible base URL, used when composing asset URLs in
    /// manifests (e.g., "https://updates.example.com"). No trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Cap on the total buffered size of one publish request.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    /// Cap on a single file part within a publish request.
    #[serde(default = "default_max_file_part_bytes")]
    pub max_file_part_bytes: u64,
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_base_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_max_upload_bytes() -> u64 {
    crate::DEFAULT_MAX_UPLOAD_BYTES
}

fn default_max_file_part_bytes() -> u64 {
    crate::DEFAULT_MAX_FILE_PART_BYTES
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            base_url: default_base_url(),
            max_upload_bytes: default_max_upload_bytes(),
            max_file_part_bytes: default_max_file_part_bytes(),
        }
    }
}

impl ServerConfig {
    /// Base URL with any trailing slash removed.
    pub fn base_url_trimmed(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage.
    Filesystem {
        /// Root directory for storage.
        path: PathBuf,
    },
    /// S3-compatible storage.
    S3 {
        /// Bucket name.
        bucket: String,
        /// Optional endpoint URL (for MinIO, etc.).
        endpoint: Option<String>,
        /// AWS region.
        region: Option<String>,
        /// AWS access key ID. Falls back to the environment if not set.
        access_key_id: Option<String>,
        /// AWS secret access key. Falls back to the environment if not set.
        secret_access_key: Option<String>,
        /// Force path-style URLs; required for MinIO and similar services.
        #[serde(default)]
        force_path_style: bool,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/blobs"),
        }
    }
}

impl StorageConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Filesystem { .. } => Ok(()),
            Self::S3 {
                bucket,
                access_key_id,
                secret_access_key,
                ..
            } => {
                if bucket.is_empty() {
                    return Err("s3 bucket must not be empty".to_string());
                }
                if access_key_id.is_some() != secret_access_key.is_some() {
                    return Err(
                        "access_key_id and secret_access_key must be set together".to_string()
                    );
                }
                Ok(())
            }
        }
    }
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database file.
    Sqlite {
        /// Path to the database file; created if missing.
        path: PathBuf,
    },
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/hangar.db"),
        }
    }
}

/// Authentication configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret used to sign dashboard bearer tokens (HS256).
    pub token_secret: String,
    /// Lifetime of issued bearer tokens in seconds.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
    /// Shared secret the publish endpoint requires.
    pub upload_secret: String,
    /// Bootstrap password for the admin dashboard user.
    pub admin_password: String,
}

fn default_token_ttl_secs() -> u64 {
    12 * 60 * 60
}

impl AuthConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.token_secret.len() < 16 {
            return Err("auth.token_secret must be at least 16 characters".to_string());
        }
        if self.upload_secret.is_empty() {
            return Err("auth.upload_secret must not be empty".to_string());
        }
        if self.admin_password.is_empty() {
            return Err("auth.admin_password must not be empty".to_string());
        }
        Ok(())
    }
}

/// Top-level application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Validate every section, failing fast on the first error.
    pub fn validate(&self) -> Result<(), String> {
        self.storage.validate()?;
        self.auth.validate()?;
        if self.server.max_file_part_bytes > self.server.max_upload_bytes {
            return Err(
                "server.max_file_part_bytes must not exceed server.max_upload_bytes".to_string(),
            );
        }
        Ok(())
    }

    /// Create a test configuration with dummy secrets.
    ///
    /// **For testing only.**
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            metadata: MetadataConfig::default(),
            auth: AuthConfig {
                token_secret: "test-token-secret-0123456789".to_string(),
                token_ttl_secs: default_token_ttl_secs(),
                upload_secret: "test-upload-secret".to_string(),
                admin_password: "test-admin-password".to_string(),
            },
        }
    }
}
