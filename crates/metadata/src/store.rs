//! Metadata store trait and SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::repos::{ApplicationRepo, DeviceRepo, UploadRepo, UserRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore:
    ApplicationRepo + UploadRepo + DeviceRepo + UserRepo + Send + Sync
{
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS applications (
    id TEXT PRIMARY KEY,
    display_name TEXT NOT NULL,
    private_key_pem TEXT,
    public_key_pem TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_applications_id_nocase
    ON applications (id COLLATE NOCASE);

CREATE TABLE IF NOT EXISTS uploads (
    id TEXT PRIMARY KEY,
    application_id TEXT NOT NULL REFERENCES applications(id) ON DELETE CASCADE,
    runtime_version TEXT NOT NULL,
    release_channel TEXT NOT NULL,
    platform TEXT NOT NULL,
    status TEXT NOT NULL,
    blob_prefix TEXT NOT NULL,
    metadata_json TEXT,
    app_config_json TEXT,
    assets_manifest_json TEXT,
    signed_manifest_json TEXT,
    manifest_signature TEXT,
    git_branch TEXT,
    git_commit TEXT,
    size_bytes INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    released_at TEXT,
    updated_at TEXT NOT NULL
);

-- Hot path: manifest lookup and the state machine's sibling scan.
CREATE INDEX IF NOT EXISTS idx_uploads_coordinate
    ON uploads (application_id, runtime_version, release_channel, platform, status);

-- Dashboard listing.
CREATE INDEX IF NOT EXISTS idx_uploads_app_created
    ON uploads (application_id, created_at);

CREATE TABLE IF NOT EXISTS devices (
    id TEXT NOT NULL,
    application_id TEXT NOT NULL REFERENCES applications(id) ON DELETE CASCADE,
    runtime_version TEXT,
    platform TEXT,
    release_channel TEXT,
    embedded_update_id TEXT,
    current_update_id TEXT,
    first_seen TEXT NOT NULL,
    last_seen TEXT NOT NULL,
    update_count INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (id, application_id)
);

CREATE INDEX IF NOT EXISTS idx_devices_app_platform
    ON devices (application_id, platform);

CREATE INDEX IF NOT EXISTS idx_devices_last_seen
    ON devices (last_seen);

CREATE TABLE IF NOT EXISTS users (
    username TEXT PRIMARY KEY,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL,
    last_login_at TEXT
);
"#;

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Create a new SQLite store and run migrations.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))
            .map_err(sqlx::Error::from)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection avoids
            // persistent "database is locked" failures under axum concurrency.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

impl From<std::io::Error> for MetadataError {
    fn from(e: std::io::Error) -> Self {
        MetadataError::Internal(format!("I/O error: {e}"))
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// Implement the repository traits for SqliteStore
mod sqlite_impl {
    use super::*;
    use crate::models::*;
    use crate::repos::{DeviceSeen, UploadFilter};
    use time::OffsetDateTime;

    #[async_trait]
    impl ApplicationRepo for SqliteStore {
        async fn create_application(&self, app: &ApplicationRow) -> MetadataResult<()> {
            if self.get_application(&app.id).await?.is_some() {
                return Err(MetadataError::AlreadyExists(format!(
                    "application '{}' already exists",
                    app.id
                )));
            }

            sqlx::query(
                r#"
                INSERT INTO applications (id, display_name, private_key_pem, public_key_pem, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&app.id)
            .bind(&app.display_name)
            .bind(&app.private_key_pem)
            .bind(&app.public_key_pem)
            .bind(app.created_at)
            .bind(app.updated_at)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn get_application(&self, id: &str) -> MetadataResult<Option<ApplicationRow>> {
            let row = sqlx::query_as::<_, ApplicationRow>(
                "SELECT * FROM applications WHERE id = ? COLLATE NOCASE",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn list_applications(&self) -> MetadataResult<Vec<ApplicationRow>> {
            let rows =
                sqlx::query_as::<_, ApplicationRow>("SELECT * FROM applications ORDER BY id")
                    .fetch_all(&self.pool)
                    .await?;
            Ok(rows)
        }

        async fn update_application(
            &self,
            id: &str,
            display_name: &str,
            updated_at: OffsetDateTime,
        ) -> MetadataResult<()> {
            let result = sqlx::query(
                "UPDATE applications SET display_name = ?, updated_at = ? WHERE id = ? COLLATE NOCASE",
            )
            .bind(display_name)
            .bind(updated_at)
            .bind(id)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(MetadataError::NotFound(format!(
                    "application '{id}' not found"
                )));
            }
            Ok(())
        }

        async fn set_application_keys(
            &self,
            id: &str,
            private_key_pem: &str,
            public_key_pem: &str,
            updated_at: OffsetDateTime,
        ) -> MetadataResult<()> {
            let result = sqlx::query(
                "UPDATE applications SET private_key_pem = ?, public_key_pem = ?, updated_at = ? WHERE id = ? COLLATE NOCASE",
            )
            .bind(private_key_pem)
            .bind(public_key_pem)
            .bind(updated_at)
            .bind(id)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(MetadataError::NotFound(format!(
                    "application '{id}' not found"
                )));
            }
            Ok(())
        }

        async fn delete_application(&self, id: &str) -> MetadataResult<()> {
            let result =
                sqlx::query("DELETE FROM applications WHERE id = ? COLLATE NOCASE")
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
            if result.rows_affected() == 0 {
                return Err(MetadataError::NotFound(format!(
                    "application '{id}' not found"
                )));
            }
            Ok(())
        }
    }

    impl SqliteStore {
        /// Shared promotion path for release and rollback.
        ///
        /// Demotes every `released` sibling of the target's coordinate and
        /// promotes the target, in one transaction, so readers never observe
        /// two `released` rows for the same coordinate.
        async fn promote_upload(
            &self,
            id: &str,
            allow_repromote: bool,
            now: OffsetDateTime,
        ) -> MetadataResult<UploadRow> {
            let mut tx = self.pool.begin().await?;

            let target = sqlx::query_as::<_, UploadRow>("SELECT * FROM uploads WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| MetadataError::NotFound(format!("upload '{id}' not found")))?;

            if target.status == "released" {
                return Err(MetadataError::Constraint(format!(
                    "upload '{id}' is already released"
                )));
            }
            if !allow_repromote && target.status != "ready" {
                return Err(MetadataError::Constraint(format!(
                    "upload '{id}' is not in ready state (status: {})",
                    target.status
                )));
            }

            // Demote every released sibling of the coordinate. Deliberately
            // not conditioned on platform: a narrower release supersedes a
            // broader one; the composer consults platform at read time.
            sqlx::query(
                r#"
                UPDATE uploads SET status = 'obsolete', updated_at = ?
                WHERE application_id = ? AND runtime_version = ? AND release_channel = ?
                  AND status = 'released' AND id != ?
                "#,
            )
            .bind(now)
            .bind(&target.application_id)
            .bind(&target.runtime_version)
            .bind(&target.release_channel)
            .bind(id)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "UPDATE uploads SET status = 'released', released_at = ?, updated_at = ? WHERE id = ?",
            )
            .bind(now)
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;

            let row = sqlx::query_as::<_, UploadRow>("SELECT * FROM uploads WHERE id = ?")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
            Ok(row)
        }
    }

    #[async_trait]
    impl UploadRepo for SqliteStore {
        async fn insert_upload(&self, upload: &UploadRow) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO uploads (
                    id, application_id, runtime_version, release_channel, platform,
                    status, blob_prefix, metadata_json, app_config_json,
                    assets_manifest_json, signed_manifest_json, manifest_signature,
                    git_branch, git_commit, size_bytes, created_at, released_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&upload.id)
            .bind(&upload.application_id)
            .bind(&upload.runtime_version)
            .bind(&upload.release_channel)
            .bind(&upload.platform)
            .bind(&upload.status)
            .bind(&upload.blob_prefix)
            .bind(&upload.metadata_json)
            .bind(&upload.app_config_json)
            .bind(&upload.assets_manifest_json)
            .bind(&upload.signed_manifest_json)
            .bind(&upload.manifest_signature)
            .bind(&upload.git_branch)
            .bind(&upload.git_commit)
            .bind(upload.size_bytes)
            .bind(upload.created_at)
            .bind(upload.released_at)
            .bind(upload.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err)
                    if db_err.message().contains("UNIQUE constraint") =>
                {
                    MetadataError::AlreadyExists(format!(
                        "upload '{}' already exists",
                        upload.id
                    ))
                }
                other => other.into(),
            })?;
            Ok(())
        }

        async fn get_upload(&self, id: &str) -> MetadataResult<Option<UploadRow>> {
            let row = sqlx::query_as::<_, UploadRow>("SELECT * FROM uploads WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn list_uploads(
            &self,
            application_id: &str,
            filter: &UploadFilter,
        ) -> MetadataResult<Vec<UploadRow>> {
            let rows = sqlx::query_as::<_, UploadRow>(
                r#"
                SELECT * FROM uploads
                WHERE application_id = ?
                  AND (? IS NULL OR runtime_version = ?)
                  AND (? IS NULL OR release_channel = ?)
                  AND (? IS NULL OR status = ?)
                ORDER BY created_at DESC, id DESC
                "#,
            )
            .bind(application_id)
            .bind(&filter.runtime_version)
            .bind(&filter.runtime_version)
            .bind(&filter.release_channel)
            .bind(&filter.release_channel)
            .bind(&filter.status)
            .bind(&filter.status)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn find_servable_upload(
            &self,
            application_id: &str,
            runtime_version: &str,
            release_channel: &str,
            platform: &str,
        ) -> MetadataResult<Option<UploadRow>> {
            let row = sqlx::query_as::<_, UploadRow>(
                r#"
                SELECT * FROM uploads
                WHERE application_id = ? AND runtime_version = ? AND release_channel = ?
                  AND status = 'released'
                  AND platform IN (?, 'all')
                ORDER BY CASE WHEN platform = ? THEN 0 ELSE 1 END, released_at DESC
                LIMIT 1
                "#,
            )
            .bind(application_id)
            .bind(runtime_version)
            .bind(release_channel)
            .bind(platform)
            .bind(platform)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn release_upload(
            &self,
            id: &str,
            now: OffsetDateTime,
        ) -> MetadataResult<UploadRow> {
            self.promote_upload(id, false, now).await
        }

        async fn rollback_upload(
            &self,
            id: &str,
            now: OffsetDateTime,
        ) -> MetadataResult<UploadRow> {
            self.promote_upload(id, true, now).await
        }

        async fn update_upload_status(
            &self,
            id: &str,
            status: &str,
            now: OffsetDateTime,
        ) -> MetadataResult<UploadRow> {
            let result =
                sqlx::query("UPDATE uploads SET status = ?, updated_at = ? WHERE id = ?")
                    .bind(status)
                    .bind(now)
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
            if result.rows_affected() == 0 {
                return Err(MetadataError::NotFound(format!("upload '{id}' not found")));
            }

            let row = sqlx::query_as::<_, UploadRow>("SELECT * FROM uploads WHERE id = ?")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
            Ok(row)
        }

        async fn delete_upload(&self, id: &str) -> MetadataResult<()> {
            let result = sqlx::query("DELETE FROM uploads WHERE id = ?")
                .bind(id)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(MetadataError::NotFound(format!("upload '{id}' not found")));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl DeviceRepo for SqliteStore {
        async fn upsert_device(&self, seen: &DeviceSeen) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO devices (
                    id, application_id, runtime_version, platform, release_channel,
                    embedded_update_id, current_update_id, first_seen, last_seen, update_count
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
                ON CONFLICT(id, application_id) DO UPDATE SET
                    runtime_version = excluded.runtime_version,
                    platform = excluded.platform,
                    release_channel = excluded.release_channel,
                    embedded_update_id = excluded.embedded_update_id,
                    update_count = devices.update_count + CASE
                        WHEN excluded.current_update_id IS NOT devices.current_update_id THEN 1
                        ELSE 0
                    END,
                    current_update_id = excluded.current_update_id,
                    last_seen = excluded.last_seen
                "#,
            )
            .bind(&seen.id)
            .bind(&seen.application_id)
            .bind(&seen.runtime_version)
            .bind(&seen.platform)
            .bind(&seen.release_channel)
            .bind(&seen.embedded_update_id)
            .bind(&seen.current_update_id)
            .bind(seen.seen_at)
            .bind(seen.seen_at)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn list_devices(
            &self,
            application_id: &str,
            platform: Option<&str>,
            seen_since: Option<OffsetDateTime>,
        ) -> MetadataResult<Vec<DeviceRow>> {
            let rows = sqlx::query_as::<_, DeviceRow>(
                r#"
                SELECT * FROM devices
                WHERE application_id = ?
                  AND (? IS NULL OR platform = ?)
                  AND (? IS NULL OR last_seen >= ?)
                ORDER BY last_seen DESC
                "#,
            )
            .bind(application_id)
            .bind(platform)
            .bind(platform)
            .bind(seen_since)
            .bind(seen_since)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }
    }

    #[async_trait]
    impl UserRepo for SqliteStore {
        async fn get_user(&self, username: &str) -> MetadataResult<Option<UserRow>> {
            let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE username = ?")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn upsert_user(&self, user: &UserRow) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO users (username, password_hash, created_at, last_login_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(username) DO UPDATE SET password_hash = excluded.password_hash
                "#,
            )
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(user.created_at)
            .bind(user.last_login_at)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn touch_last_login(
            &self,
            username: &str,
            at: OffsetDateTime,
        ) -> MetadataResult<()> {
            sqlx::query("UPDATE users SET last_login_at = ? WHERE username = ?")
                .bind(at)
                .bind(username)
                .execute(&self.pool)
                .await?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApplicationRow, UploadRow};
    use crate::repos::{DeviceSeen, UploadFilter};
    use time::OffsetDateTime;

    async fn store() -> (tempfile::TempDir, SqliteStore) {
        let temp = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(temp.path().join("meta.db")).await.unwrap();
        (temp, store)
    }

    fn app(id: &str) -> ApplicationRow {
        let now = OffsetDateTime::now_utc();
        ApplicationRow {
            id: id.to_string(),
            display_name: id.to_string(),
            private_key_pem: None,
            public_key_pem: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn upload(id: &str, app_id: &str, platform: &str) -> UploadRow {
        let now = OffsetDateTime::now_utc();
        UploadRow {
            id: id.to_string(),
            application_id: app_id.to_string(),
            runtime_version: "1.0.0".to_string(),
            release_channel: "production".to_string(),
            platform: platform.to_string(),
            status: "ready".to_string(),
            blob_prefix: format!("updates/{app_id}/1.0.0/{id}"),
            metadata_json: None,
            app_config_json: None,
            assets_manifest_json: None,
            signed_manifest_json: None,
            manifest_signature: None,
            git_branch: None,
            git_commit: None,
            size_bytes: 0,
            created_at: now,
            released_at: None,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn application_lookup_is_case_insensitive() {
        let (_temp, store) = store().await;
        store.create_application(&app("MyApp")).await.unwrap();

        let row = store.get_application("myapp").await.unwrap().unwrap();
        assert_eq!(row.id, "MyApp");

        // Case-insensitively duplicate slugs are rejected.
        match store.create_application(&app("MYAPP")).await {
            Err(MetadataError::AlreadyExists(_)) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn release_enforces_single_live_row() {
        let (_temp, store) = store().await;
        store.create_application(&app("myapp")).await.unwrap();
        store.insert_upload(&upload("u1", "myapp", "all")).await.unwrap();
        store.insert_upload(&upload("u2", "myapp", "all")).await.unwrap();

        let now = OffsetDateTime::now_utc();
        let released = store.release_upload("u1", now).await.unwrap();
        assert_eq!(released.status, "released");
        assert!(released.released_at.is_some());

        // Second release of the same row is a conflict and changes nothing.
        match store.release_upload("u1", now).await {
            Err(MetadataError::Constraint(_)) => {}
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(store.get_upload("u1").await.unwrap().unwrap().status, "released");

        // Releasing the sibling demotes the previous release.
        store.release_upload("u2", now).await.unwrap();
        assert_eq!(store.get_upload("u1").await.unwrap().unwrap().status, "obsolete");
        assert_eq!(store.get_upload("u2").await.unwrap().unwrap().status, "released");
    }

    #[tokio::test]
    async fn rollback_repromotes_obsolete_row() {
        let (_temp, store) = store().await;
        store.create_application(&app("myapp")).await.unwrap();
        store.insert_upload(&upload("u1", "myapp", "all")).await.unwrap();
        store.insert_upload(&upload("u2", "myapp", "all")).await.unwrap();

        let now = OffsetDateTime::now_utc();
        store.release_upload("u1", now).await.unwrap();
        store.release_upload("u2", now).await.unwrap();

        // u1 is obsolete; Release refuses it but Rollback re-promotes.
        match store.release_upload("u1", now).await {
            Err(MetadataError::Constraint(_)) => {}
            other => panic!("unexpected: {other:?}"),
        }
        store.rollback_upload("u1", now).await.unwrap();

        assert_eq!(store.get_upload("u1").await.unwrap().unwrap().status, "released");
        assert_eq!(store.get_upload("u2").await.unwrap().unwrap().status, "obsolete");
    }

    #[tokio::test]
    async fn narrow_release_supersedes_broad_release() {
        let (_temp, store) = store().await;
        store.create_application(&app("myapp")).await.unwrap();
        store.insert_upload(&upload("u_all", "myapp", "all")).await.unwrap();
        store.insert_upload(&upload("u_ios", "myapp", "ios")).await.unwrap();

        let now = OffsetDateTime::now_utc();
        store.release_upload("u_all", now).await.unwrap();
        store.release_upload("u_ios", now).await.unwrap();

        // The ios release obsoletes the all release for the coordinate.
        assert_eq!(store.get_upload("u_all").await.unwrap().unwrap().status, "obsolete");

        let ios = store
            .find_servable_upload("myapp", "1.0.0", "production", "ios")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ios.id, "u_ios");

        // Nothing is left for android.
        assert!(store
            .find_servable_upload("myapp", "1.0.0", "production", "android")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn servable_lookup_prefers_exact_platform() {
        let (_temp, store) = store().await;
        store.create_application(&app("myapp")).await.unwrap();

        // Releases on distinct runtime versions coexist.
        let mut broad = upload("u_all", "myapp", "all");
        broad.runtime_version = "1.0.0".to_string();
        let mut narrow = upload("u_ios", "myapp", "ios");
        narrow.runtime_version = "2.0.0".to_string();
        store.insert_upload(&broad).await.unwrap();
        store.insert_upload(&narrow).await.unwrap();

        let now = OffsetDateTime::now_utc();
        store.release_upload("u_all", now).await.unwrap();
        store.release_upload("u_ios", now).await.unwrap();

        let v1_android = store
            .find_servable_upload("myapp", "1.0.0", "production", "android")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(v1_android.id, "u_all");

        let v2_ios = store
            .find_servable_upload("myapp", "2.0.0", "production", "ios")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(v2_ios.id, "u_ios");

        assert!(store
            .find_servable_upload("myapp", "2.0.0", "production", "android")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn list_uploads_filters_and_orders() {
        let (_temp, store) = store().await;
        store.create_application(&app("myapp")).await.unwrap();
        store.insert_upload(&upload("u1", "myapp", "all")).await.unwrap();
        let mut staging = upload("u2", "myapp", "all");
        staging.release_channel = "staging".to_string();
        store.insert_upload(&staging).await.unwrap();

        let all = store
            .list_uploads("myapp", &UploadFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let filtered = store
            .list_uploads(
                "myapp",
                &UploadFilter {
                    release_channel: Some("staging".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "u2");
    }

    #[tokio::test]
    async fn delete_application_cascades() {
        let (_temp, store) = store().await;
        store.create_application(&app("myapp")).await.unwrap();
        store.insert_upload(&upload("u1", "myapp", "all")).await.unwrap();
        store
            .upsert_device(&DeviceSeen {
                id: "device-1".to_string(),
                application_id: "myapp".to_string(),
                runtime_version: Some("1.0.0".to_string()),
                platform: Some("ios".to_string()),
                release_channel: Some("production".to_string()),
                embedded_update_id: None,
                current_update_id: None,
                seen_at: OffsetDateTime::now_utc(),
            })
            .await
            .unwrap();

        store.delete_application("MYAPP").await.unwrap();
        assert!(store.get_upload("u1").await.unwrap().is_none());
        assert!(store.list_devices("myapp", None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn device_upsert_tracks_update_changes() {
        let (_temp, store) = store().await;
        store.create_application(&app("myapp")).await.unwrap();

        let mut seen = DeviceSeen {
            id: "device-1".to_string(),
            application_id: "myapp".to_string(),
            runtime_version: Some("1.0.0".to_string()),
            platform: Some("ios".to_string()),
            release_channel: Some("production".to_string()),
            embedded_update_id: Some("embedded".to_string()),
            current_update_id: Some("u1".to_string()),
            seen_at: OffsetDateTime::now_utc(),
        };
        store.upsert_device(&seen).await.unwrap();
        // Same update id: count unchanged.
        store.upsert_device(&seen).await.unwrap();
        // New update id: count bumps.
        seen.current_update_id = Some("u2".to_string());
        store.upsert_device(&seen).await.unwrap();

        let devices = store.list_devices("myapp", Some("ios"), None).await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].update_count, 1);
        assert_eq!(devices[0].current_update_id.as_deref(), Some("u2"));
    }

    #[tokio::test]
    async fn user_upsert_and_login_touch() {
        let (_temp, store) = store().await;
        let now = OffsetDateTime::now_utc();
        store
            .upsert_user(&crate::models::UserRow {
                username: "admin".to_string(),
                password_hash: "a".repeat(64),
                created_at: now,
                last_login_at: None,
            })
            .await
            .unwrap();

        store.touch_last_login("admin", now).await.unwrap();
        let user = store.get_user("admin").await.unwrap().unwrap();
        assert!(user.last_login_at.is_some());

        // Re-upsert rotates the password hash.
        store
            .upsert_user(&crate::models::UserRow {
                username: "admin".to_string(),
                password_hash: "b".repeat(64),
                created_at: now,
                last_login_at: None,
            })
            .await
            .unwrap();
        let user = store.get_user("admin").await.unwrap().unwrap();
        assert_eq!(user.password_hash, "b".repeat(64));
    }
}
