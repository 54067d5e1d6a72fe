//! Results of engine operations.

use serde::{Deserialize, Serialize};

/// Outcome of a successful key or subkey creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyGenerationResult {
    /// Fingerprint of the created key or subkey.
    pub fingerprint: String,
    /// Whether a primary key was created.
    pub primary: bool,
    /// Whether a subkey was created.
    pub sub: bool,
}

impl KeyGenerationResult {
    /// Result of creating a primary key, possibly with subkeys.
    pub fn primary(fingerprint: impl Into<String>, with_subkey: bool) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            primary: true,
            sub: with_subkey,
        }
    }

    /// Result of adding a subkey.
    pub fn subkey(fingerprint: impl Into<String>) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            primary: false,
            sub: true,
        }
    }
}
