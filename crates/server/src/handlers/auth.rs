//! Dashboard login endpoint.

use crate::auth::{issue_token, secrets_match, sha256_hex};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(rename = "expiresInSecs")]
    pub expires_in_secs: u64,
}

/// POST /auth/login - Exchange credentials for a bearer token.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = state
        .metadata
        .get_user(&req.username)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("invalid credentials".to_string()))?;

    let provided_hash = sha256_hex(req.password.as_bytes());
    if !secrets_match(&provided_hash, &user.password_hash) {
        return Err(ApiError::Unauthorized("invalid credentials".to_string()));
    }

    let token = issue_token(&state.config.auth, &user.username)?;
    state
        .metadata
        .touch_last_login(&user.username, OffsetDateTime::now_utc())
        .await?;

    Ok(Json(LoginResponse {
        token,
        expires_in_secs: state.config.auth.token_ttl_secs,
    }))
}
