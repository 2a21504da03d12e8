//! Device repository.

use crate::error::MetadataResult;
use crate::models::DeviceRow;
use async_trait::async_trait;
use time::OffsetDateTime;

/// One manifest-poll observation of a device.
#[derive(Clone, Debug)]
pub struct DeviceSeen {
    pub id: String,
    pub application_id: String,
    pub runtime_version: Option<String>,
    pub platform: Option<String>,
    pub release_channel: Option<String>,
    pub embedded_update_id: Option<String>,
    pub current_update_id: Option<String>,
    pub seen_at: OffsetDateTime,
}

/// Repository for device observations.
#[async_trait]
pub trait DeviceRepo: Send + Sync {
    /// Upsert a device's last-seen record. `update_count` is bumped when
    /// the reported current update differs from the stored one; the field
    /// is best-effort and never read on the serving path.
    async fn upsert_device(&self, seen: &DeviceSeen) -> MetadataResult<()>;

    /// List an application's devices, most recently seen first.
    async fn list_devices(
        &self,
        application_id: &str,
        platform: Option<&str>,
        seen_since: Option<OffsetDateTime>,
    ) -> MetadataResult<Vec<DeviceRow>>;
}
