//! HTTP server for the hangar update server.
//!
//! This crate provides the HTTP surface:
//! - Device manifest polling and asset streaming
//! - Bundle ingestion (publish)
//! - Release / rollback drivers
//! - Dashboard CRUD and auth

pub mod auth;
pub mod bootstrap;
pub mod error;
pub mod handlers;
pub mod multipart;
pub mod recorder;
pub mod request;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
