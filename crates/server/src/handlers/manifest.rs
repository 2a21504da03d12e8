//! Device manifest endpoint (read path).

use crate::error::{ApiError, ApiResult};
use crate::multipart::encode_manifest_body;
use crate::recorder::spawn_device_record;
use crate::request::DeviceContext;
use crate::state::AppState;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use hangar_metadata::DeviceSeen;
use hangar_metadata::models::{ApplicationRow, UploadRow};
use hangar_signer::ManifestSigner;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::{Value, json};
use std::collections::HashMap;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// GET /api/manifest - Device poll with context in headers or query.
pub async fn get_manifest(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let ctx = DeviceContext::parse(&headers, &query, None, None)?;
    serve_manifest(&state, ctx).await
}

/// GET /api/manifest/{project}/{channel} - Device poll with path segments.
pub async fn get_manifest_path(
    State(state): State<AppState>,
    Path((project, channel)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let ctx = DeviceContext::parse(&headers, &query, Some(&project), Some(&channel))?;
    serve_manifest(&state, ctx).await
}

async fn serve_manifest(state: &AppState, ctx: DeviceContext) -> ApiResult<Response> {
    let app = state
        .metadata
        .get_application(&ctx.application_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("application '{}' not found", ctx.application_id))
        })?;

    let upload = state
        .metadata
        .find_servable_upload(
            &app.id,
            &ctx.runtime_version,
            &ctx.release_channel,
            ctx.platform.as_str(),
        )
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "no released update for {}/{}/{} on {}",
                app.id, ctx.runtime_version, ctx.release_channel, ctx.platform
            ))
        })?;

    // Observational only; must not delay or fail the response.
    if let Some(client_id) = &ctx.client_id {
        spawn_device_record(
            state.metadata.clone(),
            DeviceSeen {
                id: client_id.clone(),
                application_id: app.id.clone(),
                runtime_version: Some(ctx.runtime_version.clone()),
                platform: Some(ctx.platform.as_str().to_string()),
                release_channel: Some(ctx.release_channel.clone()),
                embedded_update_id: ctx.embedded_update_id.clone(),
                current_update_id: ctx.current_update_id.clone(),
                seen_at: OffsetDateTime::now_utc(),
            },
        );
    }

    // A publisher-signed manifest passes through byte-for-byte: the
    // signature covers those exact bytes, so re-serializing would break it.
    if let Some((manifest_bytes, signature)) = presigned_entry(&upload, ctx.platform.as_str())? {
        return respond(&ctx, manifest_bytes, Some(signature));
    }

    let (manifest_bytes, signature) = compose_manifest(state, &app, &upload, &ctx)?;
    respond(&ctx, manifest_bytes, signature)
}

/// Extract the pre-signed manifest entry and signature for a platform.
///
/// `signed_manifest_json` is a map from platform to the manifest as a JSON
/// string; pulling the string value back out restores the signed bytes
/// exactly (JSON string escaping is lossless).
fn presigned_entry(upload: &UploadRow, platform: &str) -> ApiResult<Option<(Vec<u8>, String)>> {
    let Some(signed) = &upload.signed_manifest_json else {
        return Ok(None);
    };
    let map: Value = serde_json::from_str(signed)
        .map_err(|e| ApiError::Internal(format!("stored signed manifest unreadable: {e}")))?;
    let Some(manifest) = map.get(platform).and_then(Value::as_str) else {
        return Ok(None);
    };

    let signature = upload
        .manifest_signature
        .as_deref()
        .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
        .and_then(|sigs| sigs.get(platform).and_then(Value::as_str).map(str::to_string))
        .ok_or_else(|| {
            ApiError::Internal(format!(
                "upload '{}' has a signed manifest but no signature for {platform}",
                upload.id
            ))
        })?;

    Ok(Some((
        manifest.as_bytes().to_vec(),
        hangar_signer::signature_header(&signature),
    )))
}

/// Compose the manifest JSON from the cached assets manifest and sign it
/// when the device asked for a signature.
fn compose_manifest(
    state: &AppState,
    app: &ApplicationRow,
    upload: &UploadRow,
    ctx: &DeviceContext,
) -> ApiResult<(Vec<u8>, Option<String>)> {
    let assets_json = upload.assets_manifest_json.as_deref().ok_or_else(|| {
        ApiError::NotFound(format!(
            "upload '{}' has no manifest for {}",
            upload.id, ctx.platform
        ))
    })?;
    let assets = hangar_core::AssetsManifest::parse(assets_json.as_bytes())
        .map_err(|e| ApiError::Internal(format!("stored assets manifest unreadable: {e}")))?;
    let platform_assets = assets.platform(ctx.platform.as_str()).ok_or_else(|| {
        ApiError::NotFound(format!(
            "upload '{}' has no manifest for {}",
            upload.id, ctx.platform
        ))
    })?;

    let created_at = upload
        .created_at
        .format(&Rfc3339)
        .map_err(|e| ApiError::Internal(format!("timestamp formatting failed: {e}")))?;

    let expo_client: Value = match upload.app_config_json.as_deref() {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| ApiError::Internal(format!("stored app config unreadable: {e}")))?,
        None => json!({}),
    };

    let base_url = state.config.server.base_url_trimmed();
    let manifest = json!({
        "id": upload.id,
        "createdAt": created_at,
        "runtimeVersion": upload.runtime_version,
        "launchAsset": asset_value(base_url, upload, ctx, &platform_assets.launch_asset),
        "assets": platform_assets
            .assets
            .iter()
            .map(|asset| asset_value(base_url, upload, ctx, asset))
            .collect::<Vec<_>>(),
        "metadata": {},
        "extra": { "expoClient": expo_client },
    });

    // Serialized exactly once; the signature and the wire bytes are the
    // same buffer.
    let bytes = serde_json::to_vec(&manifest)
        .map_err(|e| ApiError::Internal(format!("manifest serialization failed: {e}")))?;

    let signature = if ctx.expect_signature {
        let pem = app.private_key_pem.as_deref().ok_or_else(|| {
            ApiError::SigningFailed(format!("application '{}' has no signing key", app.id))
        })?;
        let signer = ManifestSigner::from_private_key_pem(pem)
            .map_err(|e| ApiError::SigningFailed(format!("signing key unusable: {e}")))?;
        let header = signer
            .sign_to_header(&bytes)
            .map_err(|e| ApiError::SigningFailed(e.to_string()))?;
        Some(header)
    } else {
        None
    };

    Ok((bytes, signature))
}

fn asset_value(
    base_url: &str,
    upload: &UploadRow,
    ctx: &DeviceContext,
    asset: &hangar_core::AssetDescriptor,
) -> Value {
    let key = format!("{}/{}", upload.blob_prefix, asset.path);
    let url = format!(
        "{base_url}/api/assets?asset={}&contentType={}&platform={}",
        utf8_percent_encode(&key, NON_ALPHANUMERIC),
        utf8_percent_encode(&asset.content_type, NON_ALPHANUMERIC),
        ctx.platform
    );
    json!({
        "hash": asset.hash,
        "key": asset.key,
        "fileExtension": asset.file_extension,
        "contentType": asset.content_type,
        "url": url,
    })
}

fn respond(
    ctx: &DeviceContext,
    manifest_bytes: Vec<u8>,
    signature: Option<String>,
) -> ApiResult<Response> {
    let encoded = encode_manifest_body(&manifest_bytes, signature.as_deref());

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, encoded.content_type())
        .header("expo-protocol-version", ctx.protocol_version.as_str())
        .header("expo-sfv-version", "0")
        .header(CACHE_CONTROL, "private, max-age=0");
    if let Some(signature) = signature.as_deref() {
        builder = builder.header("expo-signature", signature);
    }

    builder
        .body(Body::from(encoded.body))
        .map_err(|e| ApiError::Internal(format!("response build failed: {e}")))
}
