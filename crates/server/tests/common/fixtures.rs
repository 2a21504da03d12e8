//! Test fixtures: exported-bundle payloads and multipart codecs.

#![allow(dead_code)]

use std::collections::HashMap;

/// Matches `AppConfig::for_testing()`.
pub const UPLOAD_SECRET: &str = "test-upload-secret";
pub const ADMIN_PASSWORD: &str = "test-admin-password";

/// Boundary used for publish request bodies.
pub const TEST_BOUNDARY: &str = "hangar-test-boundary";

/// metadata.json for an export with ios and android bundles.
///
/// `marker` lands in the bundle paths, so distinct markers yield distinct
/// metadata bytes and therefore distinct derived update ids.
pub fn metadata_json(marker: &str) -> String {
    format!(
        r#"{{"version":0,"bundler":"metro","fileMetadata":{{"ios":{{"bundle":"_static/js/ios/index-{marker}.hbc","assets":[{{"path":"assets/icon","ext":"png"}}]}},"android":{{"bundle":"_static/js/android/index-{marker}.hbc","assets":[]}}}}}}"#
    )
}

/// metadata.json for an ios-only export.
pub fn metadata_json_ios_only(marker: &str) -> String {
    format!(
        r#"{{"version":0,"bundler":"metro","fileMetadata":{{"ios":{{"bundle":"_static/js/ios/index-{marker}.hbc","assets":[]}}}}}}"#
    )
}

/// A small app.json document.
pub fn app_config_json() -> String {
    r#"{"name":"My App","slug":"myapp","sdkVersion":"52.0.0"}"#.to_string()
}

/// The file set for a default two-platform export.
pub fn default_files(marker: &str) -> Vec<(String, Vec<u8>)> {
    vec![
        ("metadata.json".to_string(), metadata_json(marker).into_bytes()),
        ("app.json".to_string(), app_config_json().into_bytes()),
        (
            format!("_static/js/ios/index-{marker}.hbc"),
            format!("ios bundle {marker}").into_bytes(),
        ),
        (
            format!("_static/js/android/index-{marker}.hbc"),
            format!("android bundle {marker}").into_bytes(),
        ),
        ("assets/icon".to_string(), b"png bytes".to_vec()),
    ]
}

/// The file set for an ios-only export.
pub fn ios_only_files(marker: &str) -> Vec<(String, Vec<u8>)> {
    vec![
        (
            "metadata.json".to_string(),
            metadata_json_ios_only(marker).into_bytes(),
        ),
        ("app.json".to_string(), app_config_json().into_bytes()),
        (
            format!("_static/js/ios/index-{marker}.hbc"),
            format!("ios bundle {marker}").into_bytes(),
        ),
    ]
}

/// Encode files as a multipart/form-data publish body.
pub fn multipart_body(files: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, data) in files {
        body.extend_from_slice(format!("--{TEST_BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"{name}\"\r\n")
                .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{TEST_BOUNDARY}--\r\n").as_bytes());
    body
}

/// Content-Type header for `multipart_body`.
pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={TEST_BOUNDARY}")
}

/// One decoded part of a multipart/mixed manifest response.
pub struct ResponsePart {
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// Parse a multipart/mixed response body into its named parts.
pub fn parse_response_parts(content_type: &str, body: &[u8]) -> HashMap<String, ResponsePart> {
    let boundary = content_type
        .split("boundary=")
        .nth(1)
        .expect("content type carries no boundary")
        .trim();
    let text = std::str::from_utf8(body).expect("multipart body is not UTF-8");

    let mut parts = HashMap::new();
    for raw in text.split(&format!("--{boundary}")) {
        if raw.is_empty() || raw.starts_with("--") {
            continue;
        }
        let raw = raw.strip_prefix("\r\n").unwrap_or(raw);
        let Some((head, rest)) = raw.split_once("\r\n\r\n") else {
            continue;
        };

        let headers: HashMap<String, String> = head
            .split("\r\n")
            .filter_map(|line| line.split_once(": "))
            .map(|(k, v)| (k.to_lowercase(), v.to_string()))
            .collect();

        let name = headers
            .get("content-disposition")
            .and_then(|v| v.split("name=\"").nth(1))
            .and_then(|v| v.split('"').next())
            .map(str::to_string);

        if let Some(name) = name {
            parts.insert(
                name,
                ResponsePart {
                    headers,
                    body: rest.strip_suffix("\r\n").unwrap_or(rest).to_string(),
                },
            );
        }
    }
    parts
}

/// Decode a percent-encoded query parameter value.
pub fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 3 <= bytes.len() {
            if let Ok(byte) = u8::from_str_radix(&s[i + 1..i + 3], 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).expect("decoded value is not UTF-8")
}

/// Pull the percent-decoded `asset` parameter out of an asset URL.
pub fn asset_key_from_url(url: &str) -> String {
    let encoded = url
        .split("asset=")
        .nth(1)
        .and_then(|v| v.split('&').next())
        .expect("url carries no asset parameter");
    percent_decode(encoded)
}

/// Pull the `sig="…"` value out of an expo-signature header.
pub fn signature_from_header(header: &str) -> String {
    header
        .split("sig=\"")
        .nth(1)
        .and_then(|v| v.split('"').next())
        .expect("header carries no sig")
        .to_string()
}
