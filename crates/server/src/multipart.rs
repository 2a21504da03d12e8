//! Multipart/mixed response encoding for the manifest endpoint.
//!
//! The client parser is strict about part framing: CRLF line endings, exact
//! part headers, and a manifest part whose bytes must not be touched after
//! signing. The encoder therefore works on byte buffers, never on parsed
//! JSON.

use uuid::Uuid;

/// Body of the extensions part.
const EXTENSIONS_BODY: &str = r#"{"assetRequestHeaders": {}}"#;

/// An encoded manifest response body with its boundary token.
pub struct ManifestBody {
    pub boundary: String,
    pub body: Vec<u8>,
}

impl ManifestBody {
    /// Content-Type header value for this body.
    pub fn content_type(&self) -> String {
        format!("multipart/mixed; boundary={}", self.boundary)
    }
}

/// Encode the two-part manifest response.
///
/// `manifest` is emitted byte-for-byte as the first part; `signature`, when
/// present, is added as an `expo-signature` header inside that part.
pub fn encode_manifest_body(manifest: &[u8], signature: Option<&str>) -> ManifestBody {
    let boundary = format!("hangar-{}", Uuid::new_v4().simple());

    let mut body = Vec::with_capacity(manifest.len() + EXTENSIONS_BODY.len() + 512);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=utf-8\r\n");
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"manifest\"\r\n");
    if let Some(signature) = signature {
        body.extend_from_slice(format!("expo-signature: {signature}\r\n").as_bytes());
    }
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(manifest);
    body.extend_from_slice(b"\r\n");

    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json\r\n");
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"extensions\"\r\n");
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(EXTENSIONS_BODY.as_bytes());
    body.extend_from_slice(b"\r\n");

    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    ManifestBody { boundary, body }
}
