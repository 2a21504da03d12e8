//! Database models mapping to the metadata schema.

use sqlx::FromRow;
use time::OffsetDateTime;

/// Application record: one logical mobile product, identified by a slug.
///
/// The slug is stored with its original case; lookups are case-insensitive.
/// The signing pair is present only when the server signs manifests itself.
#[derive(Debug, Clone, FromRow)]
pub struct ApplicationRow {
    pub id: String,
    pub display_name: String,
    pub private_key_pem: Option<String>,
    pub public_key_pem: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Upload record: one published artifact bundle, the unit of release.
#[derive(Debug, Clone, FromRow)]
pub struct UploadRow {
    pub id: String,
    pub application_id: String,
    pub runtime_version: String,
    pub release_channel: String,
    pub platform: String,
    pub status: String,
    pub blob_prefix: String,
    /// Verbatim bytes of the publisher's metadata.json.
    pub metadata_json: Option<String>,
    /// Verbatim bytes of the publisher's app config document.
    pub app_config_json: Option<String>,
    /// Server-computed assets manifest cache, keyed by platform.
    pub assets_manifest_json: Option<String>,
    /// Publisher-supplied pre-signed manifest map, stored verbatim.
    pub signed_manifest_json: Option<String>,
    /// Signature map accompanying `signed_manifest_json`.
    pub manifest_signature: Option<String>,
    pub git_branch: Option<String>,
    pub git_commit: Option<String>,
    pub size_bytes: i64,
    pub created_at: OffsetDateTime,
    pub released_at: Option<OffsetDateTime>,
    pub updated_at: OffsetDateTime,
}

/// Device record: one row per client device seen by the manifest endpoint.
/// Purely observational; never consulted on the serving path.
#[derive(Debug, Clone, FromRow)]
pub struct DeviceRow {
    pub id: String,
    pub application_id: String,
    pub runtime_version: Option<String>,
    pub platform: Option<String>,
    pub release_channel: Option<String>,
    pub embedded_update_id: Option<String>,
    pub current_update_id: Option<String>,
    pub first_seen: OffsetDateTime,
    pub last_seen: OffsetDateTime,
    pub update_count: i64,
}

/// Dashboard user record.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub username: String,
    /// SHA-256 of the password, lowercase hex.
    pub password_hash: String,
    pub created_at: OffsetDateTime,
    pub last_login_at: Option<OffsetDateTime>,
}
