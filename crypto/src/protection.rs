//! Passphrase protection of secret key material (HKDF-SHA256 + AES-256-GCM).

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::{serde_hex, CryptoError, Result};

const ALGORITHM: &str = "HKDF-SHA256+AES-256-GCM";
const INFO: &[u8] = b"pgpkit secret key protection";

/// Secret key material encrypted under a passphrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedSecret {
    /// Algorithm identifier.
    pub algorithm: String,
    /// Random salt for key derivation.
    #[serde(with = "serde_hex")]
    pub salt: Vec<u8>,
    /// Nonce (12 bytes for AES-GCM).
    #[serde(with = "serde_hex")]
    pub nonce: Vec<u8>,
    /// Ciphertext.
    #[serde(with = "serde_hex")]
    pub ciphertext: Vec<u8>,
}

/// Encrypt `secret` under `passphrase`.
///
/// `aad` binds the ciphertext to its key, usually the fingerprint.
pub fn protect(secret: &[u8], passphrase: &str, aad: &[u8]) -> Result<ProtectedSecret> {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let key = derive_key(passphrase.as_bytes(), &salt)?;

    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut nonce_bytes = [0u8; 12];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, Payload { msg: secret, aad })
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    Ok(ProtectedSecret {
        algorithm: ALGORITHM.to_string(),
        salt: salt.to_vec(),
        nonce: nonce_bytes.to_vec(),
        ciphertext,
    })
}

/// Decrypt a protected secret. Fails for a wrong passphrase or `aad`.
pub fn unprotect(protected: &ProtectedSecret, passphrase: &str, aad: &[u8]) -> Result<Vec<u8>> {
    if protected.algorithm != ALGORITHM {
        return Err(CryptoError::DecryptionFailed(format!(
            "Unsupported algorithm: {}",
            protected.algorithm
        )));
    }

    let key = derive_key(passphrase.as_bytes(), &protected.salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;

    let nonce_bytes: [u8; 12] = protected
        .nonce
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::DecryptionFailed("Invalid nonce length".to_string()))?;
    let nonce = Nonce::from_slice(&nonce_bytes);

    cipher
        .decrypt(
            nonce,
            Payload {
                msg: protected.ciphertext.as_slice(),
                aad,
            },
        )
        .map_err(|_| CryptoError::DecryptionFailed("Decryption failed".to_string()))
}

fn derive_key(passphrase: &[u8], salt: &[u8]) -> Result<[u8; 32]> {
    use hkdf::Hkdf;
    use sha2::Sha256;

    let hk = Hkdf::<Sha256>::new(Some(salt), passphrase);
    let mut key = [0u8; 32];
    hk.expand(INFO, &mut key)
        .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protect_unprotect() {
        let secret = [42u8; 32];
        let protected = protect(&secret, "correct horse", b"FPR").unwrap();
        let restored = unprotect(&protected, "correct horse", b"FPR").unwrap();

        assert_eq!(restored, secret);
    }

    #[test]
    fn test_fresh_salt_and_nonce() {
        let secret = [1u8; 32];
        let first = protect(&secret, "pass", b"").unwrap();
        let second = protect(&secret, "pass", b"").unwrap();

        assert_ne!(first.salt, second.salt);
        assert_ne!(first.nonce, second.nonce);
        assert_ne!(first.ciphertext, second.ciphertext);
    }

    #[test]
    fn test_wrong_passphrase() {
        let protected = protect(&[7u8; 32], "right", b"FPR").unwrap();
        assert!(unprotect(&protected, "wrong", b"FPR").is_err());
        assert!(unprotect(&protected, "right", b"OTHER").is_err());
    }

    #[test]
    fn test_serialization() {
        let protected = protect(&[9u8; 32], "pass", b"").unwrap();
        let json = serde_json::to_string(&protected).unwrap();
        let restored: ProtectedSecret = serde_json::from_str(&json).unwrap();
        assert_eq!(unprotect(&restored, "pass", b"").unwrap(), vec![9u8; 32]);
    }
}
