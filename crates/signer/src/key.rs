//! RSA key pair generation and PEM handling.

use crate::error::{SignerError, SignerResult};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};

/// RSA modulus size used for generated signing keys.
const KEY_BITS: usize = 2048;

/// An RSA signing key pair.
#[derive(Clone)]
pub struct KeyPair {
    pub private: RsaPrivateKey,
    pub public: RsaPublicKey,
}

impl KeyPair {
    /// Generate a fresh 2048-bit key pair.
    pub fn generate() -> SignerResult<Self> {
        let mut rng = rand::rngs::OsRng;
        let private = RsaPrivateKey::new(&mut rng, KEY_BITS)
            .map_err(|e| SignerError::Generate(e.to_string()))?;
        let public = RsaPublicKey::from(&private);
        Ok(Self { private, public })
    }

    /// Parse a key pair from a private-key PEM document.
    ///
    /// Accepts PKCS#8 (`PRIVATE KEY`) with a PKCS#1 (`RSA PRIVATE KEY`)
    /// fallback, since publishers hand over keys in either framing.
    pub fn from_private_key_pem(pem: &str) -> SignerResult<Self> {
        let private = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| SignerError::BadPrivateKey(e.to_string()))?;
        let public = RsaPublicKey::from(&private);
        Ok(Self { private, public })
    }

    /// Encode the private key as PKCS#8 PEM.
    pub fn private_key_pem(&self) -> SignerResult<String> {
        let pem = self
            .private
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| SignerError::PemEncode(e.to_string()))?;
        Ok(pem.to_string())
    }

    /// Encode the public key as SPKI PEM.
    pub fn public_key_pem(&self) -> SignerResult<String> {
        self.public
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| SignerError::PemEncode(e.to_string()))
    }
}
