//! Dashboard application CRUD.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use hangar_metadata::models::{ApplicationRow, DeviceRow};
use hangar_signer::KeyPair;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Application response; never exposes the private key.
#[derive(Debug, Serialize)]
pub struct ApplicationResponse {
    pub id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "hasSigningKey")]
    pub has_signing_key: bool,
    #[serde(rename = "publicKeyPem", skip_serializing_if = "Option::is_none")]
    pub public_key_pem: Option<String>,
    #[serde(rename = "createdAt", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(rename = "updatedAt", with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<ApplicationRow> for ApplicationResponse {
    fn from(row: ApplicationRow) -> Self {
        Self {
            id: row.id,
            display_name: row.display_name,
            has_signing_key: row.private_key_pem.is_some(),
            public_key_pem: row.public_key_pem,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateApplicationRequest {
    pub id: String,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateApplicationRequest {
    #[serde(rename = "displayName")]
    pub display_name: String,
}

/// Slugs become object-store path segments, so the alphabet is restricted.
fn validate_slug(id: &str) -> ApiResult<()> {
    if id.is_empty() || id.len() > 64 {
        return Err(ApiError::BadRequest(
            "application id must be 1-64 characters".to_string(),
        ));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(ApiError::BadRequest(format!(
            "application id contains invalid characters: {id}"
        )));
    }
    Ok(())
}

/// GET /apps - List applications.
pub async fn list_applications(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ApplicationResponse>>> {
    let apps = state.metadata.list_applications().await?;
    Ok(Json(apps.into_iter().map(Into::into).collect()))
}

/// POST /apps - Create an application.
pub async fn create_application(
    State(state): State<AppState>,
    Json(req): Json<CreateApplicationRequest>,
) -> ApiResult<(StatusCode, Json<ApplicationResponse>)> {
    validate_slug(&req.id)?;

    let now = OffsetDateTime::now_utc();
    let row = ApplicationRow {
        display_name: req.display_name.unwrap_or_else(|| req.id.clone()),
        id: req.id,
        private_key_pem: None,
        public_key_pem: None,
        created_at: now,
        updated_at: now,
    };
    state.metadata.create_application(&row).await?;

    tracing::info!(application_id = %row.id, "Application created");
    Ok((StatusCode::CREATED, Json(row.into())))
}

/// GET /apps/{id} - Get an application.
pub async fn get_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApplicationResponse>> {
    let app = state
        .metadata
        .get_application(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("application '{id}' not found")))?;
    Ok(Json(app.into()))
}

/// PATCH /apps/{id} - Update an application's display name.
pub async fn update_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateApplicationRequest>,
) -> ApiResult<Json<ApplicationResponse>> {
    let app = state
        .metadata
        .get_application(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("application '{id}' not found")))?;

    state
        .metadata
        .update_application(&app.id, &req.display_name, OffsetDateTime::now_utc())
        .await?;

    let updated = state
        .metadata
        .get_application(&app.id)
        .await?
        .ok_or_else(|| ApiError::Internal("application vanished during update".to_string()))?;
    Ok(Json(updated.into()))
}

/// DELETE /apps/{id} - Delete an application, its rows, and its blobs.
pub async fn delete_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let app = state
        .metadata
        .get_application(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("application '{id}' not found")))?;

    // Blobs first: a failure here leaves rows intact and the delete can be
    // retried. Orphaned blobs from a partial pass are reconciled by GC.
    let prefix = format!("{}/{}/", hangar_core::BLOB_ROOT, app.id);
    for key in state.storage.list(&prefix).await? {
        state.storage.delete(&key).await?;
    }

    state.metadata.delete_application(&app.id).await?;

    tracing::info!(application_id = %app.id, "Application deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Key pair generation response: the public half only.
#[derive(Debug, Serialize)]
pub struct KeypairResponse {
    #[serde(rename = "publicKeyPem")]
    pub public_key_pem: String,
}

/// POST /apps/{id}/keypair - Generate and store a signing key pair.
pub async fn generate_keypair(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<KeypairResponse>)> {
    let app = state
        .metadata
        .get_application(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("application '{id}' not found")))?;

    let pair = KeyPair::generate()?;
    let private_pem = pair.private_key_pem()?;
    let public_pem = pair.public_key_pem()?;

    state
        .metadata
        .set_application_keys(&app.id, &private_pem, &public_pem, OffsetDateTime::now_utc())
        .await?;

    tracing::info!(application_id = %app.id, "Signing key pair generated");
    Ok((
        StatusCode::CREATED,
        Json(KeypairResponse {
            public_key_pem: public_pem,
        }),
    ))
}

/// Device listing query parameters.
#[derive(Debug, Deserialize)]
pub struct DeviceQuery {
    pub platform: Option<String>,
    #[serde(rename = "seenSince")]
    pub seen_since: Option<String>,
}

/// Device response.
#[derive(Debug, Serialize)]
pub struct DeviceResponse {
    pub id: String,
    #[serde(rename = "runtimeVersion")]
    pub runtime_version: Option<String>,
    pub platform: Option<String>,
    #[serde(rename = "releaseChannel")]
    pub release_channel: Option<String>,
    #[serde(rename = "embeddedUpdateId")]
    pub embedded_update_id: Option<String>,
    #[serde(rename = "currentUpdateId")]
    pub current_update_id: Option<String>,
    #[serde(rename = "firstSeen", with = "time::serde::rfc3339")]
    pub first_seen: OffsetDateTime,
    #[serde(rename = "lastSeen", with = "time::serde::rfc3339")]
    pub last_seen: OffsetDateTime,
    #[serde(rename = "updateCount")]
    pub update_count: i64,
}

impl From<DeviceRow> for DeviceResponse {
    fn from(row: DeviceRow) -> Self {
        Self {
            id: row.id,
            runtime_version: row.runtime_version,
            platform: row.platform,
            release_channel: row.release_channel,
            embedded_update_id: row.embedded_update_id,
            current_update_id: row.current_update_id,
            first_seen: row.first_seen,
            last_seen: row.last_seen,
            update_count: row.update_count,
        }
    }
}

/// GET /apps/{id}/devices - List devices seen polling this application.
pub async fn list_devices(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DeviceQuery>,
) -> ApiResult<Json<Vec<DeviceResponse>>> {
    let app = state
        .metadata
        .get_application(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("application '{id}' not found")))?;

    let seen_since = match query.seen_since.as_deref() {
        Some(raw) => Some(OffsetDateTime::parse(raw, &Rfc3339).map_err(|e| {
            ApiError::BadRequest(format!("invalid seenSince timestamp: {e}"))
        })?),
        None => None,
    };

    let devices = state
        .metadata
        .list_devices(&app.id, query.platform.as_deref(), seen_since)
        .await?;
    Ok(Json(devices.into_iter().map(Into::into).collect()))
}
