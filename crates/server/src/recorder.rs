//! Device record recorder.
//!
//! Upserts the per-device last-seen record off the manifest response path.
//! Failures are logged and never affect the response; the records are
//! observational only.

use hangar_metadata::{DeviceSeen, MetadataStore};
use std::sync::Arc;

/// Enqueue a device upsert on a background task.
pub fn spawn_device_record(metadata: Arc<dyn MetadataStore>, seen: DeviceSeen) {
    tokio::spawn(async move {
        if let Err(e) = metadata.upsert_device(&seen).await {
            tracing::warn!(
                device_id = %seen.id,
                application_id = %seen.application_id,
                error = %e,
                "device record upsert failed"
            );
        }
    });
}
