//! Errors produced while handling RSA keys and signing manifests.

use thiserror::Error;

/// Failures from key handling and manifest signing.
#[derive(Debug, Error)]
pub enum SignerError {
    /// RSA key pair generation did not complete.
    #[error("could not generate RSA key pair: {0}")]
    Generate(String),

    /// A PEM document could not be decoded as an RSA private key, in
    /// either PKCS#8 or PKCS#1 framing.
    #[error("unreadable private key PEM: {0}")]
    BadPrivateKey(String),

    /// A key could not be rendered as PEM.
    #[error("could not encode key as PEM: {0}")]
    PemEncode(String),

    /// Producing the RSA-SHA256 signature failed.
    #[error("manifest signing failed: {0}")]
    Sign(String),

    /// A signature's base64 framing was malformed.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// The signature does not match the bytes and public key.
    #[error("signature does not verify")]
    BadSignature,
}

/// Result alias used throughout this crate.
pub type SignerResult<T> = std::result::Result<T, SignerError>;
