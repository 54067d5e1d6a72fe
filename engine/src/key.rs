//! Public description of keys held by the engine.

use std::fmt;

use chrono::{DateTime, Utc};
use pgpkit_common::{
    format_date, is_expired, usage_string, Capabilities, Capability, Error, Result,
};
use pgpkit_crypto::{agreement, fingerprint, serde_hex, signing, Signature, VerifyingKey};
use serde::{Deserialize, Serialize};

/// A user ID bound to a primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserId {
    /// The user ID string, e.g. `Alice <alice@example.org>`.
    pub id: String,
    /// Primary key signature over the user ID.
    pub certification: Signature,
}

/// A primary key or subkey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subkey {
    /// 40 upper-case hex digits.
    pub fingerprint: String,
    /// `ed25519` or `cv25519`.
    pub algorithm: String,
    pub capabilities: Capabilities,
    pub created: DateTime<Utc>,
    pub expires: Option<DateTime<Utc>>,
    #[serde(with = "serde_hex")]
    pub public: Vec<u8>,
    /// Whether the keyring holds the secret part.
    pub has_secret: bool,
    /// Primary key signature binding this subkey. `None` on the primary.
    pub binding: Option<Signature>,
}

impl Subkey {
    /// Whether the subkey has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        is_expired(self.expires, now)
    }

    /// Check that the capabilities fit the algorithm: Ed25519 never
    /// encrypts, X25519 only encrypts.
    fn check_usage(&self) -> Result<()> {
        let fits = match self.algorithm.as_str() {
            signing::ALGORITHM => !self.capabilities.test(Capability::Encrypt),
            agreement::ALGORITHM => {
                self.capabilities == Capabilities::from_flag(Capability::Encrypt)
            }
            other => return Err(Error::NotSupported(format!("{} key", other))),
        };
        if !fits {
            return Err(Error::InvalidValue(format!(
                "{}: {} key cannot have usage {}",
                self.fingerprint,
                self.algorithm,
                usage_string(self.capabilities)
            )));
        }
        Ok(())
    }

    /// Recompute the fingerprint from the public material.
    pub fn computed_fingerprint(&self) -> String {
        fingerprint(&self.algorithm, self.created.timestamp(), &self.public)
    }
}

impl fmt::Display for Subkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.algorithm,
            format_date(self.created),
            usage_string(self.capabilities)
        )?;
        if let Some(expires) = self.expires {
            let label = if self.is_expired(Utc::now()) {
                "expired"
            } else {
                "expires"
            };
            write!(f, " [{}: {}]", label, format_date(expires))?;
        }
        Ok(())
    }
}

/// An OpenPGP key: a primary key, its user IDs and its subkeys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    /// Fingerprint of the primary key.
    pub fingerprint: String,
    pub user_ids: Vec<UserId>,
    /// The primary key comes first.
    pub subkeys: Vec<Subkey>,
    #[serde(default)]
    pub is_group: bool,
}

impl Key {
    /// The primary key.
    pub fn primary(&self) -> Option<&Subkey> {
        self.subkeys.first()
    }

    /// Whether the secret part of the primary key is available.
    pub fn has_secret(&self) -> bool {
        self.primary().map_or(false, |primary| primary.has_secret)
    }

    /// Whether the key has no usable subkeys.
    pub fn is_null(&self) -> bool {
        self.subkeys.is_empty()
    }

    /// Whether `pattern` names this key: a primary or subkey fingerprint
    /// (case-insensitive) or an exact user ID.
    pub fn matches(&self, pattern: &str) -> bool {
        self.subkeys
            .iter()
            .any(|subkey| subkey.fingerprint.eq_ignore_ascii_case(pattern))
            || self.user_ids.iter().any(|uid| uid.id == pattern)
    }

    /// Check fingerprints, capabilities, user ID certifications and subkey
    /// bindings.
    pub fn verify(&self) -> Result<()> {
        let primary = self
            .primary()
            .ok_or_else(|| Error::InvalidValue(format!("{} has no primary key", self.fingerprint)))?;

        if primary.fingerprint != self.fingerprint {
            return Err(Error::InvalidValue(format!(
                "{}: primary fingerprint mismatch",
                self.fingerprint
            )));
        }
        if primary.algorithm != signing::ALGORITHM {
            return Err(Error::NotSupported(format!(
                "{} primary key",
                primary.algorithm
            )));
        }

        if !primary.capabilities.test(Capability::Certify) {
            return Err(Error::InvalidValue(format!(
                "{}: primary key cannot certify",
                self.fingerprint
            )));
        }

        let verifying = VerifyingKey::from_bytes(&primary.public)
            .map_err(|e| Error::Crypto(e.to_string()))?;

        for (index, subkey) in self.subkeys.iter().enumerate() {
            if subkey.computed_fingerprint() != subkey.fingerprint {
                return Err(Error::InvalidValue(format!(
                    "{}: fingerprint does not match key material",
                    subkey.fingerprint
                )));
            }
            subkey.check_usage()?;
            if index > 0 && subkey.capabilities.test(Capability::Certify) {
                return Err(Error::InvalidValue(format!(
                    "{}: subkeys cannot certify",
                    subkey.fingerprint
                )));
            }
        }

        for uid in &self.user_ids {
            verifying
                .verify(
                    &certification_message(&self.fingerprint, &uid.id),
                    &uid.certification,
                )
                .map_err(|_| {
                    Error::Crypto(format!("bad certification on user ID {:?}", uid.id))
                })?;
        }

        for subkey in self.subkeys.iter().skip(1) {
            let binding = subkey.binding.as_ref().ok_or_else(|| {
                Error::Crypto(format!("subkey {} is not bound", subkey.fingerprint))
            })?;
            verifying
                .verify(
                    &binding_message(&self.fingerprint, &subkey.fingerprint),
                    binding,
                )
                .map_err(|_| {
                    Error::Crypto(format!("bad binding on subkey {}", subkey.fingerprint))
                })?;
        }

        Ok(())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(primary) = self.primary() else {
            return write!(f, "{} (no key material)", self.fingerprint);
        };

        let tag = if primary.has_secret { "sec" } else { "pub" };
        writeln!(f, "{}   {}", tag, primary)?;
        writeln!(f, "      {}", self.fingerprint)?;
        for uid in &self.user_ids {
            writeln!(f, "uid           {}", uid.id)?;
        }
        for subkey in self.subkeys.iter().skip(1) {
            let tag = if subkey.has_secret { "ssb" } else { "sub" };
            writeln!(f, "{}   {}", tag, subkey)?;
        }
        Ok(())
    }
}

/// Message signed by the primary key to certify a user ID.
pub(crate) fn certification_message(primary_fpr: &str, user_id: &str) -> Vec<u8> {
    let mut message = Vec::with_capacity(primary_fpr.len() + 1 + user_id.len());
    message.extend_from_slice(primary_fpr.as_bytes());
    message.push(0x00);
    message.extend_from_slice(user_id.as_bytes());
    message
}

/// Message signed by the primary key to bind a subkey.
pub(crate) fn binding_message(primary_fpr: &str, subkey_fpr: &str) -> Vec<u8> {
    let mut message = Vec::with_capacity(primary_fpr.len() + 1 + subkey_fpr.len());
    message.extend_from_slice(primary_fpr.as_bytes());
    message.push(0x01);
    message.extend_from_slice(subkey_fpr.as_bytes());
    message
}
