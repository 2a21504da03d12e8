//! Core domain types and shared logic for the hangar update server.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Content addressing (SHA-256/Base64URL, MD5/hex, update-id derivation)
//! - Platform and upload status enums
//! - Publisher export metadata and the server-computed assets manifest
//! - Process configuration

pub mod assets;
pub mod config;
pub mod error;
pub mod hash;
pub mod platform;

pub use assets::{AssetDescriptor, AssetsManifest, ExportMetadata, PlatformAssets};
pub use error::{Error, Result};
pub use hash::{hash_to_update_id, md5_hex, sha256_b64url};
pub use platform::{Platform, UploadStatus};

/// Default cap on the total buffered size of one publish request: 256 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 256 * 1024 * 1024;

/// Default cap on a single file part within a publish request: 128 MiB.
pub const DEFAULT_MAX_FILE_PART_BYTES: u64 = 128 * 1024 * 1024;

/// Object-store key prefix all upload blobs live under.
pub const BLOB_ROOT: &str = "updates";

/// Build the object-store prefix for one upload.
///
/// The manifest advertises URLs under this prefix, so it must match the keys
/// the ingestion pipeline writes.
pub fn blob_prefix(application_id: &str, runtime_version: &str, update_id: &str) -> String {
    format!("{BLOB_ROOT}/{application_id}/{runtime_version}/{update_id}")
}
