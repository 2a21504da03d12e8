//! Admin user initialization.

use crate::auth::sha256_hex;
use anyhow::Result;
use hangar_core::config::AuthConfig;
use hangar_metadata::MetadataStore;
use hangar_metadata::models::UserRow;
use time::OffsetDateTime;

/// Username of the bootstrap dashboard user.
pub const ADMIN_USERNAME: &str = "admin";

/// Ensure the admin user exists with the configured bootstrap password,
/// rotating the stored hash when the configured password changes.
pub async fn ensure_admin_user(metadata: &dyn MetadataStore, config: &AuthConfig) -> Result<()> {
    let hash = sha256_hex(config.admin_password.as_bytes());

    if let Some(existing) = metadata.get_user(ADMIN_USERNAME).await? {
        if existing.password_hash == hash {
            tracing::debug!("Admin user already exists");
            return Ok(());
        }
        tracing::info!("Admin password changed, rotating stored hash");
    }

    metadata
        .upsert_user(&UserRow {
            username: ADMIN_USERNAME.to_string(),
            password_hash: hash,
            created_at: OffsetDateTime::now_utc(),
            last_login_at: None,
        })
        .await?;

    tracing::info!(username = ADMIN_USERNAME, "Admin user ensured");
    Ok(())
}
