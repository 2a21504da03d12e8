//! Metadata store for the hangar update server.
//!
//! This crate provides:
//! - Typed repositories over `applications`, `uploads`, `devices`, `users`
//! - The transactional release state machine (release, rollback)
//! - A SQLite implementation behind the `MetadataStore` trait

pub mod error;
pub mod models;
pub mod repos;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use repos::{ApplicationRepo, DeviceRepo, DeviceSeen, UploadFilter, UploadRepo, UserRepo};
pub use store::{MetadataStore, SqliteStore};

use hangar_core::config::MetadataConfig;
use std::sync::Arc;

/// Create a metadata store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    match config {
        MetadataConfig::Sqlite { path } => {
            let store = SqliteStore::new(path).await?;
            Ok(Arc::new(store))
        }
    }
}
