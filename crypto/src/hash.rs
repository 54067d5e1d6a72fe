//! Hashing and key fingerprints.

use sha2::{Digest, Sha256};

/// Length of a fingerprint in bytes.
pub const FINGERPRINT_LEN: usize = 20;

/// Fingerprint of a public key as 40 upper-case hex digits.
///
/// Covers the algorithm name, the creation time and the public key bytes,
/// so the same key material created at another time gets another
/// fingerprint.
pub fn fingerprint(algorithm: &str, created: i64, public: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update([0x99]);
    hasher.update((algorithm.len() as u32).to_be_bytes());
    hasher.update(algorithm.as_bytes());
    hasher.update(created.to_be_bytes());
    hasher.update(public);
    let digest = hasher.finalize();
    hex::encode_upper(&digest[..FINGERPRINT_LEN])
}
