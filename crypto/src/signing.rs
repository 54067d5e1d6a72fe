//! Ed25519 keys for certification, signing and authentication.

use ed25519_dalek::{
    Signer, SigningKey as Ed25519SigningKey, Verifier, VerifyingKey as Ed25519VerifyingKey,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::{serde_hex, CryptoError, Result};

/// Algorithm name used in fingerprints and listings.
pub const ALGORITHM: &str = "ed25519";

/// A signing key (private key) for creating signatures.
pub struct SigningKey {
    inner: Ed25519SigningKey,
}

impl SigningKey {
    /// Generate a new random signing key.
    pub fn generate() -> Self {
        let mut csprng = OsRng;
        Self {
            inner: Ed25519SigningKey::generate(&mut csprng),
        }
    }

    /// Create from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKey("Invalid key length".to_string()))?;

        Ok(Self {
            inner: Ed25519SigningKey::from_bytes(&bytes),
        })
    }

    /// Get the corresponding verifying key.
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey {
            inner: self.inner.verifying_key(),
        }
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        let sig = self.inner.sign(message);
        Signature {
            bytes: sig.to_bytes().to_vec(),
        }
    }

    /// Get raw key bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes()
    }
}

/// A verifying key (public key) for verifying signatures.
#[derive(Clone)]
pub struct VerifyingKey {
    inner: Ed25519VerifyingKey,
}

impl VerifyingKey {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKey("Invalid key length".to_string()))?;

        let inner = Ed25519VerifyingKey::from_bytes(&bytes)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

        Ok(Self { inner })
    }

    /// Verify a signature.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<()> {
        let sig_bytes: [u8; 64] = signature
            .bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidSignature)?;

        let sig = ed25519_dalek::Signature::from_bytes(&sig_bytes);

        self.inner
            .verify(message, &sig)
            .map_err(|_| CryptoError::InvalidSignature)
    }

    /// Get raw key bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes()
    }
}

/// A detached Ed25519 signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Raw signature bytes, hex encoded when serialized.
    #[serde(with = "serde_hex")]
    pub bytes: Vec<u8>,
}
