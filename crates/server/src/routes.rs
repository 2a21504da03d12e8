//! Route configuration.

use crate::auth::auth_middleware;
use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    // Device-facing and publish endpoints; no bearer auth. The publish
    // endpoint checks its shared secret itself and gets a raised body limit.
    let public_routes = Router::new()
        .route("/api/manifest", get(handlers::get_manifest))
        .route(
            "/api/manifest/{project}/{channel}",
            get(handlers::get_manifest_path),
        )
        .route("/api/assets", get(handlers::get_asset))
        .route(
            "/upload",
            post(handlers::publish)
                .layer(DefaultBodyLimit::max(state.config.server.max_upload_bytes as usize)),
        )
        .route("/auth/login", post(handlers::login))
        .route("/healthz", get(handlers::health_check));

    // Dashboard endpoints behind the bearer-token middleware.
    let dashboard_routes = Router::new()
        .route(
            "/apps",
            get(handlers::list_applications).post(handlers::create_application),
        )
        .route(
            "/apps/{id}",
            get(handlers::get_application)
                .patch(handlers::update_application)
                .delete(handlers::delete_application),
        )
        .route("/apps/{id}/keypair", post(handlers::generate_keypair))
        .route("/apps/{id}/devices", get(handlers::list_devices))
        .route("/uploads", get(handlers::list_uploads))
        .route(
            "/uploads/{id}",
            get(handlers::get_upload)
                .patch(handlers::update_upload)
                .delete(handlers::delete_upload),
        )
        .route("/utils/release", post(handlers::release))
        .route("/utils/rollback", post(handlers::rollback))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(dashboard_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
