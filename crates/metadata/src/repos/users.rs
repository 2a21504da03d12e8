//! Dashboard user repository.

use crate::error::MetadataResult;
use crate::models::UserRow;
use async_trait::async_trait;
use time::OffsetDateTime;

/// Repository for dashboard users.
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Get a user by name.
    async fn get_user(&self, username: &str) -> MetadataResult<Option<UserRow>>;

    /// Insert a user, or replace its password hash if it already exists.
    async fn upsert_user(&self, user: &UserRow) -> MetadataResult<()>;

    /// Record a successful login.
    async fn touch_last_login(&self, username: &str, at: OffsetDateTime) -> MetadataResult<()>;
}
