//! Application repository.

use crate::error::MetadataResult;
use crate::models::ApplicationRow;
use async_trait::async_trait;
use time::OffsetDateTime;

/// Repository for application operations.
#[async_trait]
pub trait ApplicationRepo: Send + Sync {
    /// Create a new application. Fails when the slug already exists,
    /// case-insensitively.
    async fn create_application(&self, app: &ApplicationRow) -> MetadataResult<()>;

    /// Look up an application by slug, case-insensitively, returning the
    /// canonical row.
    async fn get_application(&self, id: &str) -> MetadataResult<Option<ApplicationRow>>;

    /// List all applications, ordered by slug.
    async fn list_applications(&self) -> MetadataResult<Vec<ApplicationRow>>;

    /// Update an application's display name.
    async fn update_application(
        &self,
        id: &str,
        display_name: &str,
        updated_at: OffsetDateTime,
    ) -> MetadataResult<()>;

    /// Store a signing key pair on an application.
    async fn set_application_keys(
        &self,
        id: &str,
        private_key_pem: &str,
        public_key_pem: &str,
        updated_at: OffsetDateTime,
    ) -> MetadataResult<()>;

    /// Delete an application; uploads and devices cascade.
    async fn delete_application(&self, id: &str) -> MetadataResult<()>;
}
