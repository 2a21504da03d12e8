//! Upload repository, including the release state machine primitives.

use crate::error::MetadataResult;
use crate::models::UploadRow;
use async_trait::async_trait;
use time::OffsetDateTime;

/// Dashboard listing filter. All fields are conjunctive; `None` matches any.
#[derive(Clone, Debug, Default)]
pub struct UploadFilter {
    pub runtime_version: Option<String>,
    pub release_channel: Option<String>,
    pub status: Option<String>,
}

/// Repository for upload operations.
#[async_trait]
pub trait UploadRepo: Send + Sync {
    /// Insert a new upload row.
    async fn insert_upload(&self, upload: &UploadRow) -> MetadataResult<()>;

    /// Get an upload by id.
    async fn get_upload(&self, id: &str) -> MetadataResult<Option<UploadRow>>;

    /// List an application's uploads, newest first.
    async fn list_uploads(
        &self,
        application_id: &str,
        filter: &UploadFilter,
    ) -> MetadataResult<Vec<UploadRow>>;

    /// Find the upload to serve for a device coordinate: the unique
    /// `released` row, preferring an exact platform match over `all`,
    /// breaking residual ties on the most recent `released_at`.
    async fn find_servable_upload(
        &self,
        application_id: &str,
        runtime_version: &str,
        release_channel: &str,
        platform: &str,
    ) -> MetadataResult<Option<UploadRow>>;

    /// Promote a `ready` upload to `released`, demoting every `released`
    /// sibling of its (application, runtime version, channel) coordinate to
    /// `obsolete` in the same transaction. Errors with a constraint
    /// violation when the target is not `ready`.
    async fn release_upload(&self, id: &str, now: OffsetDateTime) -> MetadataResult<UploadRow>;

    /// Re-promote a `ready` or `obsolete` upload, demoting the currently
    /// `released` sibling. Identical to `release_upload` except prior
    /// obsolescence is no obstacle. Errors when the target is already
    /// `released`.
    async fn rollback_upload(&self, id: &str, now: OffsetDateTime) -> MetadataResult<UploadRow>;

    /// Atomic single-row status update, returning the updated row. Used by
    /// the dashboard to retire a release without a replacement; the
    /// multi-row transitions go through `release_upload`/`rollback_upload`.
    async fn update_upload_status(
        &self,
        id: &str,
        status: &str,
        now: OffsetDateTime,
    ) -> MetadataResult<UploadRow>;

    /// Delete an upload row. Callers clear the blobs under its
    /// `blob_prefix` before removing the row, so a partial failure stays
    /// retryable.
    async fn delete_upload(&self, id: &str) -> MetadataResult<()>;
}
