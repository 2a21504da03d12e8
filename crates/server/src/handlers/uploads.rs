//! Dashboard upload listing and the release/rollback drivers.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use hangar_core::UploadStatus;
use hangar_metadata::UploadFilter;
use hangar_metadata::models::UploadRow;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Upload summary response.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: String,
    #[serde(rename = "applicationId")]
    pub application_id: String,
    #[serde(rename = "runtimeVersion")]
    pub runtime_version: String,
    #[serde(rename = "releaseChannel")]
    pub release_channel: String,
    pub platform: String,
    pub status: String,
    #[serde(rename = "gitBranch")]
    pub git_branch: Option<String>,
    #[serde(rename = "gitCommit")]
    pub git_commit: Option<String>,
    #[serde(rename = "sizeBytes")]
    pub size_bytes: i64,
    #[serde(rename = "createdAt", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(
        rename = "releasedAt",
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub released_at: Option<OffsetDateTime>,
}

impl From<UploadRow> for UploadResponse {
    fn from(row: UploadRow) -> Self {
        Self {
            id: row.id,
            application_id: row.application_id,
            runtime_version: row.runtime_version,
            release_channel: row.release_channel,
            platform: row.platform,
            status: row.status,
            git_branch: row.git_branch,
            git_commit: row.git_commit,
            size_bytes: row.size_bytes,
            created_at: row.created_at,
            released_at: row.released_at,
        }
    }
}

/// Upload listing query parameters.
#[derive(Debug, Deserialize)]
pub struct ListUploadsQuery {
    pub project: String,
    pub version: Option<String>,
    pub channel: Option<String>,
    pub status: Option<String>,
}

/// GET /uploads?project=… - List an application's uploads, newest first.
pub async fn list_uploads(
    State(state): State<AppState>,
    Query(query): Query<ListUploadsQuery>,
) -> ApiResult<Json<Vec<UploadResponse>>> {
    let app = state
        .metadata
        .get_application(&query.project)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("application '{}' not found", query.project)))?;

    let filter = UploadFilter {
        runtime_version: query.version,
        release_channel: query.channel,
        status: query.status,
    };
    let uploads = state.metadata.list_uploads(&app.id, &filter).await?;
    Ok(Json(uploads.into_iter().map(Into::into).collect()))
}

/// GET /uploads/{id} - Get one upload.
pub async fn get_upload(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<UploadResponse>> {
    let upload = state
        .metadata
        .get_upload(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("upload '{id}' not found")))?;
    Ok(Json(upload.into()))
}

/// PATCH request body. The only supported transition is retiring a
/// released upload; promotions go through /utils/release and
/// /utils/rollback so sibling demotion stays transactional.
#[derive(Debug, Deserialize)]
pub struct UpdateUploadRequest {
    pub status: String,
}

/// PATCH /uploads/{id} - Retire a released upload without a replacement.
pub async fn update_upload(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateUploadRequest>,
) -> ApiResult<Json<UploadResponse>> {
    let requested = req
        .status
        .parse::<UploadStatus>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if requested != UploadStatus::Obsolete {
        return Err(ApiError::BadRequest(format!(
            "unsupported status transition: {requested} (only 'obsolete' is accepted)"
        )));
    }

    let row = state
        .metadata
        .get_upload(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("upload '{id}' not found")))?;
    if row.status != UploadStatus::Released.as_str() {
        return Err(ApiError::Conflict(format!(
            "upload '{id}' is not released (status: {})",
            row.status
        )));
    }

    let row = state
        .metadata
        .update_upload_status(
            &id,
            UploadStatus::Obsolete.as_str(),
            OffsetDateTime::now_utc(),
        )
        .await?;

    tracing::info!(upload_id = %id, "Upload retired");
    Ok(Json(row.into()))
}

/// DELETE /uploads/{id} - Delete an upload and its blobs.
pub async fn delete_upload(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let row = state
        .metadata
        .get_upload(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("upload '{id}' not found")))?;

    // Blobs first, as in delete_application: a failure here leaves the row
    // intact and the delete can be retried.
    for key in state.storage.list(&row.blob_prefix).await? {
        state.storage.delete(&key).await?;
    }

    state.metadata.delete_upload(&id).await?;

    tracing::info!(upload_id = %id, "Upload deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Release / rollback request body.
#[derive(Debug, Deserialize)]
pub struct PromoteRequest {
    #[serde(rename = "uploadId")]
    pub upload_id: String,
}

/// POST /utils/release - Promote a ready upload to released.
pub async fn release(
    State(state): State<AppState>,
    Json(req): Json<PromoteRequest>,
) -> ApiResult<Json<UploadResponse>> {
    let row = state
        .metadata
        .release_upload(&req.upload_id, OffsetDateTime::now_utc())
        .await?;

    tracing::info!(
        upload_id = %row.id,
        application_id = %row.application_id,
        runtime_version = %row.runtime_version,
        release_channel = %row.release_channel,
        "Upload released"
    );
    Ok(Json(row.into()))
}

/// POST /utils/rollback - Re-promote a previously superseded upload.
pub async fn rollback(
    State(state): State<AppState>,
    Json(req): Json<PromoteRequest>,
) -> ApiResult<Json<UploadResponse>> {
    let row = state
        .metadata
        .rollback_upload(&req.upload_id, OffsetDateTime::now_utc())
        .await?;

    tracing::info!(
        upload_id = %row.id,
        application_id = %row.application_id,
        runtime_version = %row.runtime_version,
        release_channel = %row.release_channel,
        "Upload rolled back"
    );
    Ok(Json(row.into()))
}
