//! HTTP handlers.

pub mod apps;
pub mod assets;
pub mod auth;
pub mod health;
pub mod manifest;
pub mod publish;
pub mod uploads;

pub use apps::{
    create_application, delete_application, generate_keypair, get_application, list_applications,
    list_devices, update_application,
};
pub use assets::get_asset;
pub use auth::login;
pub use health::health_check;
pub use manifest::{get_manifest, get_manifest_path};
pub use publish::publish;
pub use uploads::{delete_upload, get_upload, list_uploads, release, rollback, update_upload};
