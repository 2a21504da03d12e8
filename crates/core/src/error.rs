//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid platform: {0}")]
    InvalidPlatform(String),

    #[error("invalid upload status: {0}")]
    InvalidStatus(String),

    #[error("invalid export metadata: {0}")]
    InvalidMetadata(String),

    #[error("missing bundle for platform {platform}: {path}")]
    MissingBundle { platform: String, path: String },

    #[error("missing asset for platform {platform}: {path}")]
    MissingAsset { platform: String, path: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
