//! Platform and upload status enums.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target platform of an upload.
///
/// Device requests only ever carry `ios` or `android`; `all` appears on
/// uploads that serve both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    All,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
            Self::All => "all",
        }
    }

    /// Parse a device-supplied platform, which must be `ios` or `android`.
    pub fn parse_device(s: &str) -> crate::Result<Platform> {
        match s {
            "ios" => Ok(Self::Ios),
            "android" => Ok(Self::Android),
            other => Err(Error::InvalidPlatform(other.to_string())),
        }
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ios" => Ok(Self::Ios),
            "android" => Ok(Self::Android),
            "all" => Ok(Self::All),
            other => Err(Error::InvalidPlatform(other.to_string())),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of an upload.
///
/// `ready` rows are publishable candidates, at most one row per coordinate
/// is `released`, and superseded rows become `obsolete`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Ready,
    Released,
    Obsolete,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Released => "released",
            Self::Obsolete => "obsolete",
        }
    }
}

impl FromStr for UploadStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ready" => Ok(Self::Ready),
            "released" => Ok(Self::Released),
            "obsolete" => Ok(Self::Obsolete),
            other => Err(Error::InvalidStatus(other.to_string())),
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_platform_rejects_all() {
        assert!(Platform::parse_device("ios").is_ok());
        assert!(Platform::parse_device("android").is_ok());
        assert!(Platform::parse_device("all").is_err());
        assert!(Platform::parse_device("web").is_err());
    }

    #[test]
    fn status_round_trips() {
        for s in ["ready", "released", "obsolete"] {
            assert_eq!(s.parse::<UploadStatus>().unwrap().as_str(), s);
        }
        assert!("live".parse::<UploadStatus>().is_err());
    }
}
