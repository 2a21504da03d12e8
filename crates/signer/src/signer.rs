//! RSA-SHA256 manifest signing.
//!
//! The signature covers the exact manifest bytes put on the wire, so the
//! signer never re-serializes anything: callers hand it the byte slice they
//! are about to transmit.

use crate::error::{SignerError, SignerResult};
use crate::key::KeyPair;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rsa::Pkcs1v15Sign;
use rsa::sha2::{Digest, Sha256};

/// Signs manifest bytes with an application's RSA key.
pub struct ManifestSigner {
    keypair: KeyPair,
}

impl ManifestSigner {
    /// Create a signer from a key pair.
    pub fn new(keypair: KeyPair) -> Self {
        Self { keypair }
    }

    /// Create a signer from a private-key PEM document.
    pub fn from_private_key_pem(pem: &str) -> SignerResult<Self> {
        Ok(Self::new(KeyPair::from_private_key_pem(pem)?))
    }

    /// Sign `bytes` with RSA-SHA256 (PKCS#1 v1.5), returning base64.
    pub fn sign(&self, bytes: &[u8]) -> SignerResult<String> {
        let digest = Sha256::digest(bytes);
        let signature = self
            .keypair
            .private
            .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
            .map_err(|e| SignerError::Sign(e.to_string()))?;
        Ok(STANDARD.encode(signature))
    }

    /// Sign `bytes` and format the result as the signature header value.
    pub fn sign_to_header(&self, bytes: &[u8]) -> SignerResult<String> {
        Ok(signature_header(&self.sign(bytes)?))
    }

    /// Get the key pair backing this signer.
    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }
}

/// Format a base64 signature as a Structured-Headers dictionary:
/// `sig="<base64>", keyid="main"`.
pub fn signature_header(sig_b64: &str) -> String {
    format!("sig=\"{sig_b64}\", keyid=\"main\"")
}

/// Verify a base64 RSA-SHA256 signature over `bytes`.
pub fn verify_signature(keypair: &KeyPair, bytes: &[u8], sig_b64: &str) -> SignerResult<()> {
    let signature = STANDARD
        .decode(sig_b64)
        .map_err(|e| SignerError::MalformedSignature(format!("invalid base64: {e}")))?;
    let digest = Sha256::digest(bytes);
    keypair
        .public
        .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, &signature)
        .map_err(|_| SignerError::BadSignature)
}
