//! Bundle ingestion endpoint.
//!
//! Receives a pre-exported bundle as multipart form data, derives a stable
//! update identifier, writes every file into the content-addressed blob
//! layout, pre-computes the assets manifest cache, and inserts one `ready`
//! upload row. The hot manifest path later serves entirely from that row.

use crate::auth::require_upload_secret;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use hangar_core::{
    AssetsManifest, ExportMetadata, Platform, UploadStatus, hash_to_update_id, sha256_b64url,
};
use hangar_metadata::models::UploadRow;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use time::OffsetDateTime;
use uuid::Uuid;

/// The reserved field names holding the export's config documents.
const METADATA_FIELD: &str = "metadata.json";
const APP_CONFIG_FIELD: &str = "app.json";

/// Publish response.
#[derive(Debug, Serialize)]
pub struct PublishResponse {
    pub id: String,
    pub platform: String,
    pub status: String,
}

/// POST /upload - Ingest one exported bundle.
pub async fn publish(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<PublishResponse>)> {
    require_upload_secret(&headers, &state.config.auth)?;

    let project = required_header(&headers, "project")?;
    let runtime_version = required_header(&headers, "version")?;
    let release_channel = required_header(&headers, "release-channel")?;
    let platform = match header(&headers, "platform") {
        Some(raw) => raw
            .parse::<Platform>()
            .map_err(|_| ApiError::BadRequest(format!("invalid platform: {raw}")))?,
        None => Platform::All,
    };
    let git_branch = header(&headers, "git-branch").map(str::to_string);
    let git_commit = header(&headers, "git-commit").map(str::to_string);

    let signed_manifest = decode_base64_header(&headers, "signed-manifest")?;
    let manifest_signature = decode_base64_header(&headers, "manifest-signature")?;
    if signed_manifest.is_some() != manifest_signature.is_some() {
        return Err(ApiError::BadRequest(
            "signed-manifest and manifest-signature must be supplied together".to_string(),
        ));
    }

    let app = state
        .metadata
        .get_application(&project)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("application '{project}' not found")))?;

    let files = buffer_files(multipart, &state).await?;
    let size_bytes: u64 = files.values().map(|b| b.len() as u64).sum();

    let metadata_json = utf8_field(&files, METADATA_FIELD)?;
    let app_config_json = utf8_field(&files, APP_CONFIG_FIELD)?;

    // Update identifier, in precedence order: the id a pre-signed manifest
    // already committed to, then the metadata digest salted with the
    // platform, then a fresh random id.
    let update_id = if let Some(signed) = &signed_manifest {
        presigned_update_id(signed)?
    } else if let Some(metadata) = &metadata_json {
        let mut salted = metadata.clone().into_bytes();
        salted.push(b':');
        salted.extend_from_slice(platform.as_str().as_bytes());
        hash_to_update_id(&sha256_b64url(&salted))
    } else {
        Uuid::new_v4().to_string()
    };

    // Validate the export before touching the object store.
    let assets_manifest_json = match &metadata_json {
        Some(raw) => {
            let metadata = ExportMetadata::parse(raw.as_bytes())
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            let manifest = AssetsManifest::compute(&metadata, &files)
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            Some(
                manifest
                    .to_json()
                    .map_err(|e| ApiError::Internal(e.to_string()))?,
            )
        }
        None => None,
    };

    let blob_prefix = hangar_core::blob_prefix(&app.id, &runtime_version, &update_id);
    for (path, data) in &files {
        state
            .storage
            .put(&format!("{blob_prefix}/{path}"), data.clone())
            .await?;
    }

    let now = OffsetDateTime::now_utc();
    let row = UploadRow {
        id: update_id.clone(),
        application_id: app.id.clone(),
        runtime_version: runtime_version.clone(),
        release_channel,
        platform: platform.as_str().to_string(),
        status: UploadStatus::Ready.as_str().to_string(),
        blob_prefix,
        metadata_json,
        app_config_json,
        assets_manifest_json,
        signed_manifest_json: signed_manifest,
        manifest_signature,
        git_branch,
        git_commit,
        size_bytes: size_bytes as i64,
        created_at: now,
        released_at: None,
        updated_at: now,
    };
    state.metadata.insert_upload(&row).await?;

    tracing::info!(
        upload_id = %row.id,
        application_id = %row.application_id,
        runtime_version = %row.runtime_version,
        platform = %row.platform,
        size_bytes = row.size_bytes,
        "Upload ingested"
    );

    Ok((
        StatusCode::CREATED,
        Json(PublishResponse {
            id: row.id,
            platform: row.platform,
            status: row.status,
        }),
    ))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

fn required_header(headers: &HeaderMap, name: &str) -> ApiResult<String> {
    header(headers, name)
        .map(str::to_string)
        .ok_or_else(|| ApiError::BadRequest(format!("missing required header: {name}")))
}

fn decode_base64_header(headers: &HeaderMap, name: &str) -> ApiResult<Option<String>> {
    let Some(raw) = header(headers, name) else {
        return Ok(None);
    };
    let bytes = STANDARD
        .decode(raw)
        .map_err(|e| ApiError::BadRequest(format!("invalid base64 in {name}: {e}")))?;
    let text = String::from_utf8(bytes)
        .map_err(|e| ApiError::BadRequest(format!("invalid UTF-8 in {name}: {e}")))?;
    Ok(Some(text))
}

/// Buffer every file part, keyed by its normalized relative path.
async fn buffer_files(
    mut multipart: Multipart,
    state: &AppState,
) -> ApiResult<HashMap<String, Bytes>> {
    let max_part = state.config.server.max_file_part_bytes;
    let max_total = state.config.server.max_upload_bytes;

    let mut files: HashMap<String, Bytes> = HashMap::new();
    let mut total: u64 = 0;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                return Err(ApiError::PayloadTooLarge("request body too large".to_string()));
            }
            Err(e) => return Err(ApiError::BadRequest(format!("invalid multipart body: {e}"))),
        };

        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let path = normalize_path(&name)?;

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read part '{path}': {e}")))?;

        if data.len() as u64 > max_part {
            return Err(ApiError::PayloadTooLarge(format!(
                "file part '{path}' exceeds {max_part} bytes"
            )));
        }
        total += data.len() as u64;
        if total > max_total {
            return Err(ApiError::PayloadTooLarge(format!(
                "upload exceeds {max_total} bytes"
            )));
        }

        files.insert(path, data);
    }

    if files.is_empty() {
        return Err(ApiError::BadRequest("upload contains no files".to_string()));
    }
    Ok(files)
}

/// Normalize a publisher-supplied relative path into a blob key suffix.
fn normalize_path(name: &str) -> ApiResult<String> {
    let path = name.trim_start_matches("./").trim_start_matches('/');
    if path.is_empty() {
        return Err(ApiError::BadRequest("empty file path".to_string()));
    }
    if path.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
        return Err(ApiError::BadRequest(format!("unsafe file path: {name}")));
    }
    Ok(path.to_string())
}

fn utf8_field(files: &HashMap<String, Bytes>, name: &str) -> ApiResult<Option<String>> {
    match files.get(name) {
        None => Ok(None),
        Some(bytes) => String::from_utf8(bytes.to_vec())
            .map(Some)
            .map_err(|e| ApiError::BadRequest(format!("{name} is not valid UTF-8: {e}"))),
    }
}

/// Pull the update id out of a pre-signed manifest map.
///
/// The map is keyed by platform; each value is the manifest as a JSON
/// string. The first entry whose value parses as an object carrying a
/// string `id` supplies the identifier, so the content-addressed URLs the
/// signature already covers resolve under the prefix we create.
fn presigned_update_id(signed_manifest: &str) -> ApiResult<String> {
    let map: Value = serde_json::from_str(signed_manifest)
        .map_err(|e| ApiError::BadRequest(format!("invalid signed manifest: {e}")))?;
    let entries = map.as_object().ok_or_else(|| {
        ApiError::BadRequest("signed manifest must be a platform map".to_string())
    })?;

    let ordered = ["ios", "android", "all"];
    let candidates = ordered
        .iter()
        .filter_map(|p| entries.get(*p))
        .chain(entries.iter().filter(|(k, _)| !ordered.contains(&k.as_str())).map(|(_, v)| v));

    for entry in candidates {
        let Some(inner) = entry.as_str() else { continue };
        let Ok(parsed) = serde_json::from_str::<Value>(inner) else {
            continue;
        };
        if let Some(id) = parsed.get("id").and_then(Value::as_str) {
            return Ok(id.to_string());
        }
    }

    Err(ApiError::BadRequest(
        "signed manifest carries no update id".to_string(),
    ))
}
