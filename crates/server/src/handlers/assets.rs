//! Asset streaming endpoint.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::http::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use serde::Deserialize;

/// Query parameters of the asset endpoint.
#[derive(Debug, Deserialize)]
pub struct AssetQuery {
    pub asset: String,
    #[serde(rename = "contentType")]
    pub content_type: Option<String>,
}

/// GET /api/assets?asset=<key>&contentType=<ct> - Stream one stored blob.
///
/// Two path predicates gate access: the key must lie under the update blob
/// root, and the config documents at the prefix root are never served.
pub async fn get_asset(
    State(state): State<AppState>,
    Query(query): Query<AssetQuery>,
) -> ApiResult<Response> {
    let key = query.asset.as_str();

    if !key.starts_with("updates/") {
        return Err(ApiError::Forbidden(format!(
            "asset key outside update storage: {key}"
        )));
    }
    if key.ends_with("app.json") || key.ends_with("package.json") {
        return Err(ApiError::Forbidden(format!(
            "config documents are not served: {key}"
        )));
    }

    // Size first for Content-Length, then stream the bytes straight through.
    let meta = state.storage.head(key).await?;
    let stream = state.storage.get_stream(key).await?;
    let body_stream = stream.map(|result| result.map_err(|e| std::io::Error::other(e.to_string())));

    let content_type = query
        .content_type
        .as_deref()
        .unwrap_or("application/octet-stream");

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, content_type),
            (CONTENT_LENGTH, &meta.size.to_string()),
            (CACHE_CONTROL, "public, max-age=31536000, immutable"),
        ],
        Body::from_stream(body_stream),
    )
        .into_response())
}
