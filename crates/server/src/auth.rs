//! Authentication: dashboard bearer tokens and the publish shared secret.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use hangar_core::config::AuthConfig;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

/// Header carrying the publish shared secret.
pub const UPLOAD_SECRET_HEADER: &str = "x-upload-secret";

/// Claims carried by dashboard bearer tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username the token was issued to.
    pub sub: String,
    /// Expiration timestamp (Unix seconds).
    pub exp: u64,
    /// Issued-at timestamp (Unix seconds).
    pub iat: u64,
}

/// Authenticated request extension.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub username: String,
}

/// SHA-256 of `data`, lowercase hex. Used for password storage and lookup.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Compare two secrets by their SHA-256 digests.
///
/// Hashing first makes the comparison fixed-length and independent of where
/// the inputs diverge.
pub fn secrets_match(provided: &str, expected: &str) -> bool {
    Sha256::digest(provided.as_bytes()) == Sha256::digest(expected.as_bytes())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Issue a bearer token for `username`, signed with the configured secret.
pub fn issue_token(config: &AuthConfig, username: &str) -> ApiResult<String> {
    let now = unix_now();
    let claims = Claims {
        sub: username.to_string(),
        exp: now + config.token_ttl_secs,
        iat: now,
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.token_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token encoding failed: {e}")))
}

/// Validate a bearer token and return its claims.
pub fn validate_token(config: &AuthConfig, token: &str) -> ApiResult<Claims> {
    let data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.token_secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|_| ApiError::Unauthorized("invalid bearer token".to_string()))?;
    Ok(data.claims)
}

/// Extract bearer token from the Authorization header.
/// Per RFC 6750, the "Bearer" scheme is case-insensitive.
fn extract_bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            if v.len() >= 7 && v[..7].eq_ignore_ascii_case("bearer ") {
                Some(&v[7..])
            } else {
                None
            }
        })
}

/// Middleware protecting dashboard routes with a bearer token.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&req)
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;

    let claims = validate_token(&state.config.auth, token)?;
    req.extensions_mut().insert(AuthenticatedUser {
        username: claims.sub,
    });

    Ok(next.run(req).await)
}

/// Check the publish shared secret, comparing digests. No detail on failure.
pub fn require_upload_secret(headers: &HeaderMap, config: &AuthConfig) -> ApiResult<()> {
    let provided = headers
        .get(UPLOAD_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("missing upload secret".to_string()))?;

    if secrets_match(provided, &config.upload_secret) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("invalid upload secret".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_config() -> AuthConfig {
        AuthConfig {
            token_secret: "test-token-secret-0123456789".to_string(),
            token_ttl_secs: 3600,
            upload_secret: "upload-secret".to_string(),
            admin_password: "admin-password".to_string(),
        }
    }

    #[test]
    fn issued_tokens_validate() {
        let config = auth_config();
        let token = issue_token(&config, "admin").unwrap();
        let claims = validate_token(&config, &token).unwrap();
        assert_eq!(claims.sub, "admin");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn wrong_secret_rejected() {
        let config = auth_config();
        let token = issue_token(&config, "admin").unwrap();

        let mut other = auth_config();
        other.token_secret = "another-secret-0123456789".to_string();
        assert!(validate_token(&other, &token).is_err());
    }

    #[test]
    fn garbage_token_rejected() {
        assert!(validate_token(&auth_config(), "not.a.jwt").is_err());
    }

    #[test]
    fn secret_comparison() {
        assert!(secrets_match("abc", "abc"));
        assert!(!secrets_match("abc", "abd"));
        assert!(!secrets_match("abc", "abcd"));
    }
}
