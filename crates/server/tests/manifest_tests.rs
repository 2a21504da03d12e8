//! Manifest composition, signing, and passthrough tests.

mod common;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use common::TestServer;
use common::fixtures::{
    UPLOAD_SECRET, default_files, ios_only_files, multipart_body, multipart_content_type,
    parse_response_parts, signature_from_header,
};
use hangar_signer::{KeyPair, verify_signature};
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;

async fn create_app(server: &TestServer, id: &str) {
    let token = server.bearer_token();
    let request = Request::builder()
        .method("POST")
        .uri("/apps")
        .header("Authorization", format!("Bearer {token}"))
        .header("Content-Type", "application/json")
        .body(Body::from(json!({"id": id}).to_string()))
        .unwrap();
    let response = server.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

async fn publish(
    server: &TestServer,
    project: &str,
    version: &str,
    platform: Option<&str>,
    extra_headers: &[(&str, &str)],
    files: &[(String, Vec<u8>)],
) -> String {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/upload")
        .header("x-upload-secret", UPLOAD_SECRET)
        .header("project", project)
        .header("version", version)
        .header("release-channel", "production")
        .header("Content-Type", multipart_content_type());
    if let Some(platform) = platform {
        builder = builder.header("platform", platform);
    }
    for (name, value) in extra_headers {
        builder = builder.header(*name, *value);
    }

    let response = server
        .router
        .clone()
        .oneshot(builder.body(Body::from(multipart_body(files))).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    json.get("id").and_then(Value::as_str).unwrap().to_string()
}

async fn release(server: &TestServer, id: &str) {
    let token = server.bearer_token();
    let request = Request::builder()
        .method("POST")
        .uri("/utils/release")
        .header("Authorization", format!("Bearer {token}"))
        .header("Content-Type", "application/json")
        .body(Body::from(json!({"uploadId": id}).to_string()))
        .unwrap();
    let response = server.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

async fn device_poll(
    server: &TestServer,
    headers: &[(&str, &str)],
) -> (StatusCode, HeaderMap, Vec<u8>) {
    let mut builder = Request::builder().method("GET").uri("/api/manifest");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let response = server
        .router
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, body.to_vec())
}

fn device_headers<'a>(
    project: &'a str,
    platform: &'a str,
    version: &'a str,
) -> Vec<(&'a str, &'a str)> {
    vec![
        ("x-app-project", project),
        ("x-app-platform", platform),
        ("x-app-runtime-version", version),
        ("x-app-channel-name", "production"),
    ]
}

fn manifest_part(headers: &HeaderMap, body: &[u8]) -> (String, Value) {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(content_type.starts_with("multipart/mixed; boundary="));

    let parts = parse_response_parts(content_type, body);
    let manifest = parts.get("manifest").expect("manifest part missing");
    let parsed: Value = serde_json::from_str(&manifest.body).expect("manifest part is not JSON");
    (manifest.body.clone(), parsed)
}

#[tokio::test]
async fn composed_manifest_carries_expected_fields() {
    let server = TestServer::new().await;
    create_app(&server, "myapp").await;

    let id = publish(&server, "myapp", "1.0.0", None, &[], &default_files("u1")).await;
    release(&server, &id).await;

    let mut headers = device_headers("myapp", "ios", "1.0.0");
    headers.push(("x-app-protocol-version", "1"));
    let (status, resp_headers, body) = device_poll(&server, &headers).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(
        resp_headers.get("expo-sfv-version").and_then(|v| v.to_str().ok()),
        Some("0")
    );
    assert_eq!(
        resp_headers
            .get("expo-protocol-version")
            .and_then(|v| v.to_str().ok()),
        Some("1")
    );
    assert_eq!(
        resp_headers.get("cache-control").and_then(|v| v.to_str().ok()),
        Some("private, max-age=0")
    );

    let (_, manifest) = manifest_part(&resp_headers, &body);
    assert_eq!(manifest.get("id").and_then(Value::as_str), Some(id.as_str()));
    assert_eq!(
        manifest.get("runtimeVersion").and_then(Value::as_str),
        Some("1.0.0")
    );
    // createdAt is RFC 3339.
    let created_at = manifest.get("createdAt").and_then(Value::as_str).unwrap();
    time::OffsetDateTime::parse(created_at, &time::format_description::well_known::Rfc3339)
        .unwrap();

    let launch = manifest.get("launchAsset").unwrap();
    assert_eq!(
        launch.get("contentType").and_then(Value::as_str),
        Some("application/javascript")
    );
    assert_eq!(
        launch.get("fileExtension").and_then(Value::as_str),
        Some(".bundle")
    );
    let url = launch.get("url").and_then(Value::as_str).unwrap();
    assert!(url.contains("/api/assets?asset="));
    assert!(url.contains("platform=ios"));
    // The advertised key sits under the upload's blob prefix.
    let upload = server.metadata().get_upload(&id).await.unwrap().unwrap();
    let key = common::fixtures::asset_key_from_url(url);
    assert!(key.starts_with(&upload.blob_prefix), "key: {key}");

    let assets = manifest.get("assets").and_then(Value::as_array).unwrap();
    assert_eq!(assets.len(), 1);
    assert_eq!(
        assets[0].get("fileExtension").and_then(Value::as_str),
        Some(".png")
    );

    assert_eq!(manifest.get("metadata"), Some(&json!({})));
    assert_eq!(
        manifest
            .pointer("/extra/expoClient/name")
            .and_then(Value::as_str),
        Some("My App")
    );
}

#[tokio::test]
async fn advertised_assets_exist_in_storage() {
    let server = TestServer::new().await;
    create_app(&server, "myapp").await;

    let id = publish(&server, "myapp", "1.0.0", None, &[], &default_files("u1")).await;
    release(&server, &id).await;

    let (_, resp_headers, body) = device_poll(&server, &device_headers("myapp", "ios", "1.0.0")).await;
    let (_, manifest) = manifest_part(&resp_headers, &body);

    let upload = server.metadata().get_upload(&id).await.unwrap().unwrap();
    let mut keys: Vec<String> = Vec::new();
    let launch_url = manifest
        .pointer("/launchAsset/url")
        .and_then(Value::as_str)
        .unwrap()
        .to_string();
    keys.push(launch_url);
    for asset in manifest.get("assets").and_then(Value::as_array).unwrap() {
        keys.push(asset.get("url").and_then(Value::as_str).unwrap().to_string());
    }

    for url in keys {
        let key = common::fixtures::asset_key_from_url(&url);
        assert!(
            key.starts_with(&upload.blob_prefix),
            "advertised key outside prefix: {key}"
        );
        assert!(
            server.storage().exists(&key).await.unwrap(),
            "advertised key missing from storage: {key}"
        );
    }
}

#[tokio::test]
async fn manifest_bytes_are_deterministic() {
    let server = TestServer::new().await;
    create_app(&server, "myapp").await;

    let id = publish(&server, "myapp", "1.0.0", None, &[], &default_files("u1")).await;
    release(&server, &id).await;

    let headers = device_headers("myapp", "ios", "1.0.0");
    let (_, h1, b1) = device_poll(&server, &headers).await;
    let (_, h2, b2) = device_poll(&server, &headers).await;

    let (bytes1, _) = manifest_part(&h1, &b1);
    let (bytes2, _) = manifest_part(&h2, &b2);
    assert_eq!(bytes1, bytes2, "manifest part bytes differ across polls");
}

#[tokio::test]
async fn case_mismatched_project_resolves() {
    let server = TestServer::new().await;
    create_app(&server, "MyApp").await;

    let id = publish(&server, "MyApp", "1.0.0", None, &[], &default_files("u1")).await;
    release(&server, &id).await;

    let (status, resp_headers, body) =
        device_poll(&server, &device_headers("myapp", "ios", "1.0.0")).await;
    assert_eq!(status, StatusCode::OK);
    let (_, manifest) = manifest_part(&resp_headers, &body);
    assert_eq!(manifest.get("id").and_then(Value::as_str), Some(id.as_str()));
}

#[tokio::test]
async fn platform_split_serves_per_platform() {
    let server = TestServer::new().await;
    create_app(&server, "myapp").await;

    // Broad release on 1.0.0.
    let u1 = publish(&server, "myapp", "1.0.0", None, &[], &default_files("u1")).await;
    release(&server, &u1).await;

    // Narrow ios release on its own runtime version.
    let u_ios = publish(
        &server,
        "myapp",
        "2.0.0-ios",
        Some("ios"),
        &[],
        &ios_only_files("u2"),
    )
    .await;
    release(&server, &u_ios).await;

    let (status, h, b) = device_poll(&server, &device_headers("myapp", "ios", "2.0.0-ios")).await;
    assert_eq!(status, StatusCode::OK);
    let (_, manifest) = manifest_part(&h, &b);
    assert_eq!(
        manifest.get("id").and_then(Value::as_str),
        Some(u_ios.as_str())
    );

    // The ios-only release serves nothing to android.
    let (status, _, _) =
        device_poll(&server, &device_headers("myapp", "android", "2.0.0-ios")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The broad 1.0.0 release still serves android.
    let (status, h, b) = device_poll(&server, &device_headers("myapp", "android", "1.0.0")).await;
    assert_eq!(status, StatusCode::OK);
    let (_, manifest) = manifest_part(&h, &b);
    assert_eq!(manifest.get("id").and_then(Value::as_str), Some(u1.as_str()));
}

#[tokio::test]
async fn signed_manifest_when_device_expects_it() {
    let server = TestServer::new().await;
    create_app(&server, "myapp").await;

    // Generate a signing key through the dashboard.
    let token = server.bearer_token();
    let request = Request::builder()
        .method("POST")
        .uri("/apps/myapp/keypair")
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = server.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let keypair_json: Value = serde_json::from_slice(&body).unwrap();
    assert!(
        keypair_json
            .get("publicKeyPem")
            .and_then(Value::as_str)
            .unwrap()
            .contains("BEGIN PUBLIC KEY")
    );

    let id = publish(&server, "myapp", "1.0.0", None, &[], &default_files("u1")).await;
    release(&server, &id).await;

    let mut headers = device_headers("myapp", "ios", "1.0.0");
    headers.push(("x-app-expect-signature", "true"));
    let (status, resp_headers, body) = device_poll(&server, &headers).await;
    assert_eq!(status, StatusCode::OK);

    let signature_header = resp_headers
        .get("expo-signature")
        .and_then(|v| v.to_str().ok())
        .expect("top-level expo-signature header missing");
    assert!(signature_header.contains("keyid=\"main\""));

    let content_type = resp_headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap();
    let parts = parse_response_parts(content_type, &body);
    let manifest = parts.get("manifest").unwrap();
    assert_eq!(
        manifest.headers.get("expo-signature").map(String::as_str),
        Some(signature_header),
        "part header mirrors the top-level header"
    );

    // The signature verifies over the exact part bytes.
    let app = server.metadata().get_application("myapp").await.unwrap().unwrap();
    let keypair = KeyPair::from_private_key_pem(app.private_key_pem.as_deref().unwrap()).unwrap();
    let sig = signature_from_header(signature_header);
    verify_signature(&keypair, manifest.body.as_bytes(), &sig).unwrap();
}

#[tokio::test]
async fn signing_fails_closed_without_a_key() {
    let server = TestServer::new().await;
    create_app(&server, "myapp").await;

    let id = publish(&server, "myapp", "1.0.0", None, &[], &default_files("u1")).await;
    release(&server, &id).await;

    let mut headers = device_headers("myapp", "ios", "1.0.0");
    headers.push(("x-app-expect-signature", "true"));
    let (status, _, body) = device_poll(&server, &headers).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        json.get("code").and_then(Value::as_str),
        Some("signing_failed")
    );
}

#[tokio::test]
async fn presigned_manifest_passes_through_verbatim() {
    let server = TestServer::new().await;
    create_app(&server, "myapp").await;

    // Odd spacing proves the bytes are not re-serialized.
    let inner_manifest =
        "{\"id\": \"11111111-2222-3333-4444-555555555555\",  \"runtimeVersion\":\"1.0.0\"}";
    let signed_map = json!({ "ios": inner_manifest }).to_string();
    let signature_map = json!({ "ios": "cHJlc2lnbmVkLXNpZw==" }).to_string();

    let signed_b64 = STANDARD.encode(&signed_map);
    let signature_b64 = STANDARD.encode(&signature_map);

    let id = publish(
        &server,
        "myapp",
        "1.0.0",
        Some("ios"),
        &[
            ("signed-manifest", signed_b64.as_str()),
            ("manifest-signature", signature_b64.as_str()),
        ],
        &ios_only_files("u1"),
    )
    .await;

    // The upload takes the id the signature already committed to, and the
    // blob prefix ends with it.
    assert_eq!(id, "11111111-2222-3333-4444-555555555555");
    let upload = server.metadata().get_upload(&id).await.unwrap().unwrap();
    assert!(upload.blob_prefix.ends_with(&format!("/{id}")));

    release(&server, &id).await;

    let mut headers = device_headers("myapp", "ios", "1.0.0");
    headers.push(("x-app-expect-signature", "true"));
    let (status, resp_headers, body) = device_poll(&server, &headers).await;
    assert_eq!(status, StatusCode::OK);

    let content_type = resp_headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap();
    let parts = parse_response_parts(content_type, &body);
    let manifest = parts.get("manifest").unwrap();

    // Byte-identical passthrough, pre-stored signature attached.
    assert_eq!(manifest.body, inner_manifest);
    let signature_header = resp_headers
        .get("expo-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert_eq!(
        signature_from_header(signature_header),
        "cHJlc2lnbmVkLXNpZw=="
    );
}

#[tokio::test]
async fn device_poll_records_the_device() {
    let server = TestServer::new().await;
    create_app(&server, "myapp").await;

    let id = publish(&server, "myapp", "1.0.0", None, &[], &default_files("u1")).await;
    release(&server, &id).await;

    let mut headers = device_headers("myapp", "ios", "1.0.0");
    headers.push(("x-eas-client-id", "device-42"));
    headers.push(("x-app-current-update-id", "embedded-update"));
    let (status, _, _) = device_poll(&server, &headers).await;
    assert_eq!(status, StatusCode::OK);

    // The upsert runs off the response path; poll for it.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let devices = server
            .metadata()
            .list_devices("myapp", Some("ios"), None)
            .await
            .unwrap();
        if let Some(device) = devices.first() {
            assert_eq!(device.id, "device-42");
            assert_eq!(device.current_update_id.as_deref(), Some("embedded-update"));
            break;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("device record did not appear in time");
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
