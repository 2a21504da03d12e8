//! Device request parsing.
//!
//! A polling device describes itself through headers, query parameters, or
//! path segments. Precedence is header > query > path for every field, so a
//! proxy that rewrites the path can never override an explicit header.

use crate::error::{ApiError, ApiResult};
use axum::http::HeaderMap;
use hangar_core::Platform;
use std::collections::HashMap;

/// Header names recognized on the manifest endpoint.
pub const HDR_PROJECT: &str = "x-app-project";
pub const HDR_PLATFORM: &str = "x-app-platform";
pub const HDR_RUNTIME_VERSION: &str = "x-app-runtime-version";
pub const HDR_CHANNEL: &str = "x-app-channel-name";
pub const HDR_PROTOCOL_VERSION: &str = "x-app-protocol-version";
pub const HDR_EXPECT_SIGNATURE: &str = "x-app-expect-signature";
pub const HDR_CLIENT_ID: &str = "x-eas-client-id";
pub const HDR_EMBEDDED_UPDATE_ID: &str = "x-app-embedded-update-id";
pub const HDR_CURRENT_UPDATE_ID: &str = "x-app-current-update-id";

/// Parsed context of one device poll.
#[derive(Clone, Debug)]
pub struct DeviceContext {
    /// Application slug as supplied; canonicalized against the store later.
    pub application_id: String,
    pub platform: Platform,
    pub runtime_version: String,
    pub release_channel: String,
    pub protocol_version: String,
    pub expect_signature: bool,
    pub client_id: Option<String>,
    pub embedded_update_id: Option<String>,
    pub current_update_id: Option<String>,
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

fn field<'a>(
    headers: &'a HeaderMap,
    query: &'a HashMap<String, String>,
    header_name: &str,
    query_name: &str,
    path_value: Option<&'a str>,
) -> Option<&'a str> {
    header(headers, header_name)
        .or_else(|| query.get(query_name).map(String::as_str).filter(|v| !v.is_empty()))
        .or(path_value)
}

fn required<'a>(
    headers: &'a HeaderMap,
    query: &'a HashMap<String, String>,
    header_name: &str,
    query_name: &str,
    path_value: Option<&'a str>,
    field_name: &str,
) -> ApiResult<&'a str> {
    field(headers, query, header_name, query_name, path_value)
        .ok_or_else(|| ApiError::BadRequest(format!("missing required field: {field_name}")))
}

impl DeviceContext {
    /// Parse the device context from a manifest request.
    ///
    /// `path_project` and `path_channel` come from the
    /// `/api/manifest/{project}/{channel}` route when used.
    pub fn parse(
        headers: &HeaderMap,
        query: &HashMap<String, String>,
        path_project: Option<&str>,
        path_channel: Option<&str>,
    ) -> ApiResult<Self> {
        let application_id = required(
            headers,
            query,
            HDR_PROJECT,
            "project",
            path_project,
            "project",
        )?
        .to_string();

        let platform_str =
            required(headers, query, HDR_PLATFORM, "platform", None, "platform")?;
        let platform = Platform::parse_device(platform_str)
            .map_err(|_| ApiError::BadRequest(format!("invalid platform: {platform_str}")))?;

        let runtime_version = required(
            headers,
            query,
            HDR_RUNTIME_VERSION,
            "version",
            None,
            "version",
        )?
        .to_string();

        let release_channel = required(
            headers,
            query,
            HDR_CHANNEL,
            "channel",
            path_channel,
            "channel",
        )?
        .to_string();

        let protocol_version = header(headers, HDR_PROTOCOL_VERSION)
            .unwrap_or("0")
            .to_string();

        let expect_signature = match header(headers, HDR_EXPECT_SIGNATURE) {
            None => false,
            Some(v) => !matches!(v, "false" | "0"),
        };

        Ok(Self {
            application_id,
            platform,
            runtime_version,
            release_channel,
            protocol_version,
            expect_signature,
            client_id: header(headers, HDR_CLIENT_ID).map(str::to_string),
            embedded_update_id: header(headers, HDR_EMBEDDED_UPDATE_ID).map(str::to_string),
            current_update_id: header(headers, HDR_CURRENT_UPDATE_ID).map(str::to_string),
        })
    }
}
