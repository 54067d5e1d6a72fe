//! X25519 keys for encryption subkeys.

use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};

/// Algorithm name used in fingerprints and listings.
pub const ALGORITHM: &str = "cv25519";

/// A static X25519 secret.
pub struct EncryptionKey {
    secret: StaticSecret,
}

impl EncryptionKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        Self {
            secret: StaticSecret::random_from_rng(OsRng),
        }
    }

    /// Public key bytes.
    pub fn public_bytes(&self) -> [u8; 32] {
        PublicKey::from(&self.secret).to_bytes()
    }

    /// Raw secret bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }
}
