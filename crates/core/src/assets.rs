//! Publisher export metadata and the server-computed assets manifest.
//!
//! A publish request carries the exporter's `metadata.json`, which declares
//! per-platform bundle paths and asset lists. At ingestion time the server
//! walks that document once, hashes every referenced file, and stores the
//! result as the assets manifest. The manifest endpoint then composes
//! responses from this cache without touching the object store.

use crate::error::{Error, Result};
use crate::hash::{md5_hex, sha256_b64url};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Content type of the launch bundle.
pub const BUNDLE_CONTENT_TYPE: &str = "application/javascript";

/// File extension reported for the launch bundle.
pub const BUNDLE_EXTENSION: &str = ".bundle";

/// Map a publisher-declared file extension to a served content type.
///
/// The table is fixed by the wire protocol; unknown extensions fall back to
/// `application/octet-stream`.
pub fn content_type_for_extension(ext: &str) -> &'static str {
    match ext.trim_start_matches('.') {
        "js" => "application/javascript",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

/// One asset entry in the exporter's `metadata.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportAsset {
    pub path: String,
    pub ext: String,
}

/// Per-platform section of the exporter's `metadata.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportPlatformMetadata {
    pub bundle: String,
    #[serde(default)]
    pub assets: Vec<ExportAsset>,
}

/// Per-platform file listing inside `metadata.json`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExportFileMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ios: Option<ExportPlatformMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub android: Option<ExportPlatformMetadata>,
}

/// The exporter's `metadata.json` document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportMetadata {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub bundler: Option<String>,
    #[serde(rename = "fileMetadata")]
    pub file_metadata: ExportFileMetadata,
}

impl ExportMetadata {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::InvalidMetadata(format!("metadata.json: {e}")))
    }
}

/// Content address of one served file: hash, client-side key, extension and
/// content type. `path` is the publisher-relative path under the blob prefix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    pub hash: String,
    pub key: String,
    #[serde(rename = "fileExtension")]
    pub file_extension: String,
    #[serde(rename = "contentType")]
    pub content_type: String,
    pub path: String,
}

impl AssetDescriptor {
    fn for_bundle(path: &str, data: &[u8]) -> Self {
        Self {
            hash: sha256_b64url(data),
            key: md5_hex(data),
            file_extension: BUNDLE_EXTENSION.to_string(),
            content_type: BUNDLE_CONTENT_TYPE.to_string(),
            path: path.to_string(),
        }
    }

    fn for_asset(path: &str, ext: &str, data: &[u8]) -> Self {
        let bare = ext.trim_start_matches('.');
        Self {
            hash: sha256_b64url(data),
            key: md5_hex(data),
            file_extension: format!(".{bare}"),
            content_type: content_type_for_extension(bare).to_string(),
            path: path.to_string(),
        }
    }
}

/// Pre-computed addresses for one platform: the launch bundle plus assets.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlatformAssets {
    #[serde(rename = "launchAsset")]
    pub launch_asset: AssetDescriptor,
    pub assets: Vec<AssetDescriptor>,
}

/// The server-computed assets manifest, keyed by platform name.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AssetsManifest(pub BTreeMap<String, PlatformAssets>);

impl AssetsManifest {
    /// Hash every file `metadata` declares, for every platform present.
    ///
    /// `files` maps publisher-relative paths to buffered contents. A bundle
    /// or asset path that was declared but not uploaded fails the whole
    /// computation; an inconsistent export must not be accepted.
    pub fn compute<B: AsRef<[u8]>>(
        metadata: &ExportMetadata,
        files: &HashMap<String, B>,
    ) -> Result<Self> {
        let mut platforms = BTreeMap::new();

        let sections = [
            ("ios", metadata.file_metadata.ios.as_ref()),
            ("android", metadata.file_metadata.android.as_ref()),
        ];
        for (platform, section) in sections {
            let Some(section) = section else { continue };

            let bundle = files
                .get(&section.bundle)
                .ok_or_else(|| Error::MissingBundle {
                    platform: platform.to_string(),
                    path: section.bundle.clone(),
                })?;
            let launch_asset = AssetDescriptor::for_bundle(&section.bundle, bundle.as_ref());

            let mut assets = Vec::with_capacity(section.assets.len());
            for asset in &section.assets {
                let data = files.get(&asset.path).ok_or_else(|| Error::MissingAsset {
                    platform: platform.to_string(),
                    path: asset.path.clone(),
                })?;
                assets.push(AssetDescriptor::for_asset(
                    &asset.path,
                    &asset.ext,
                    data.as_ref(),
                ));
            }

            platforms.insert(
                platform.to_string(),
                PlatformAssets {
                    launch_asset,
                    assets,
                },
            );
        }

        Ok(Self(platforms))
    }

    pub fn platform(&self, platform: &str) -> Option<&PlatformAssets> {
        self.0.get(platform)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::InvalidMetadata(format!("assets manifest: {e}")))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
