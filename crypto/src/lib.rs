//! pgpkit Cryptographic Primitives
//!
//! Key material for the software engine: Ed25519 keys for certification,
//! signing and authentication, X25519 keys for encryption, fingerprints,
//! passphrase protection of secret keys and random output.

pub mod agreement;
pub mod hash;
pub mod protection;
pub mod random;
pub mod serde_hex;
pub mod signing;
pub mod zbase32;

pub use agreement::EncryptionKey;
pub use hash::fingerprint;
pub use protection::{protect, unprotect, ProtectedSecret};
pub use signing::{Signature, SigningKey, VerifyingKey};

/// Errors from cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
