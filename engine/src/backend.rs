//! The engine boundary and its in-process implementation.
//!
//! Flags cross the [`Backend`] trait as plain integers, the form an engine
//! behind a C interface expects. [`SoftwareEngine`] turns them back into
//! typed flag sets on the other side.

use std::collections::BTreeMap;

use chrono::{DateTime, SubsecRound, Utc};
use pgpkit_common::{
    expiration, requested_usage, Capabilities, Capability, CreationFlag, CreationFlags,
    DeletionFlag, DeletionFlags, Error, KeyGenerationResult, RandomMode, Result,
};
use pgpkit_crypto::{
    agreement, fingerprint, protect, random, signing, unprotect, CryptoError, EncryptionKey,
    SigningKey,
};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::key::{binding_message, certification_message, Key, Subkey, UserId};
use crate::keyring::{KeyRecord, Keyring, SecretMaterial};
use crate::pinentry::Pinentry;

/// Characters in a z-base-32 random string.
pub const ZBASE32_CHARS: usize = 30;

/// Buffer size for a z-base-32 random string, including the terminating NUL.
pub const ZBASE32_BUFFER_LEN: usize = ZBASE32_CHARS + 1;

/// Operations of an OpenPGP engine, with flags passed as raw integers.
pub trait Backend: Send + Sync {
    /// Create a primary key for `user_id`. `flags` holds [`CreationFlag`] bits.
    fn create_key(
        &self,
        user_id: &str,
        algorithm: &str,
        expires: u64,
        flags: u32,
        pinentry: Option<&dyn Pinentry>,
    ) -> Result<KeyGenerationResult>;

    /// Add a subkey to the key with primary fingerprint `fingerprint`.
    fn create_subkey(
        &self,
        fingerprint: &str,
        algorithm: &str,
        expires: u64,
        flags: u32,
        pinentry: Option<&dyn Pinentry>,
    ) -> Result<KeyGenerationResult>;

    /// Delete a key. `flags` holds [`DeletionFlag`] bits.
    fn delete_key(
        &self,
        fingerprint: &str,
        flags: u32,
        pinentry: Option<&dyn Pinentry>,
    ) -> Result<()>;

    /// The single key matching `pattern`.
    fn key(&self, pattern: &str, secret_only: bool) -> Result<Key>;

    /// All keys, sorted by fingerprint.
    fn keys(&self) -> Result<Vec<Key>>;

    /// Fill `buffer` with random data. `mode` is a [`RandomMode`] value.
    fn random(&self, mode: u32, buffer: &mut [u8]) -> Result<()>;

    /// A uniformly distributed value in `[0, limit)`.
    fn random_value(&self, limit: u32) -> Result<u32>;
}

fn crypto_error(e: CryptoError) -> Error {
    Error::Crypto(e.to_string())
}

/// The in-process engine.
pub struct SoftwareEngine {
    config: EngineConfig,
    keyring: Keyring,
}

impl SoftwareEngine {
    /// Create an engine, loading the keyring from the configured home directory.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let keyring = match config.keyring_path() {
            Some(path) => Keyring::open(path)?,
            None => Keyring::in_memory(),
        };

        info!(
            home = ?config.home_dir,
            keys = keyring.len(),
            "Software engine started"
        );

        Ok(Self { config, keyring })
    }

    pub fn keyring(&self) -> &Keyring {
        &self.keyring
    }

    fn expiration(
        &self,
        created: DateTime<Utc>,
        expires: u64,
        flags: CreationFlags,
    ) -> Result<Option<DateTime<Utc>>> {
        if flags.test(CreationFlag::NoExpire) {
            return Ok(None);
        }
        let seconds = if expires == 0 {
            self.config.default_expiration
        } else {
            expires
        };
        match expiration(created, seconds) {
            None if seconds != 0 => Err(Error::InvalidValue(format!(
                "expiration of {} seconds is out of range",
                seconds
            ))),
            expires => Ok(expires),
        }
    }
}

/// Reject flags this engine cannot honour for OpenPGP keys.
fn check_supported(flags: CreationFlags) -> Result<()> {
    for flag in [
        CreationFlag::SelfSigned,
        CreationFlag::WantPublic,
        CreationFlag::WantSecret,
    ] {
        if flags.test(flag) {
            return Err(Error::NotSupported(format!("{:?} for OpenPGP keys", flag)));
        }
    }
    Ok(())
}

/// Passphrase for a new key, `None` for unprotected storage.
fn new_passphrase(
    flags: CreationFlags,
    user_id: &str,
    pinentry: Option<&dyn Pinentry>,
) -> Result<Option<String>> {
    if flags.test(CreationFlag::NoPassword) {
        return Ok(None);
    }
    let pinentry = pinentry.ok_or(Error::NoPinentry)?;
    let description = format!("Enter a passphrase to protect the new key for {}", user_id);
    match pinentry.passphrase(&description) {
        None => Err(Error::Canceled),
        Some(passphrase) if passphrase.is_empty() => Ok(None),
        Some(passphrase) => Ok(Some(passphrase)),
    }
}

fn seal(secret: &[u8], passphrase: Option<&str>, fingerprint: &str) -> Result<SecretMaterial> {
    match passphrase {
        None => Ok(SecretMaterial::Plain {
            bytes: secret.to_vec(),
        }),
        Some(passphrase) => protect(secret, passphrase, fingerprint.as_bytes())
            .map(SecretMaterial::Protected)
            .map_err(crypto_error),
    }
}

/// Secret material of `fingerprint` in clear, with the passphrase that unlocked it.
fn unlock(
    record: &KeyRecord,
    fingerprint: &str,
    pinentry: Option<&dyn Pinentry>,
) -> Result<(Vec<u8>, Option<String>)> {
    let material = record
        .secrets
        .get(fingerprint)
        .ok_or_else(|| Error::NoSecretKey(fingerprint.to_string()))?;

    match material {
        SecretMaterial::Plain { bytes } => Ok((bytes.clone(), None)),
        SecretMaterial::Protected(protected) => {
            let pinentry = pinentry.ok_or(Error::NoPinentry)?;
            let description = format!("Enter the passphrase to unlock key {}", fingerprint);
            let passphrase = pinentry.passphrase(&description).ok_or(Error::Canceled)?;
            let secret = unprotect(protected, &passphrase, fingerprint.as_bytes())
                .map_err(|_| Error::BadPassphrase)?;
            Ok((secret, Some(passphrase)))
        }
    }
}

/// Usage of a new primary key and whether an encryption subkey is added.
fn primary_usage(algorithm: &str, usage: Capabilities) -> Result<(Capabilities, bool)> {
    let (usage, with_subkey) = match algorithm {
        "" | "default" | "future-default" if usage.none() => {
            (Capability::Certify | Capability::Sign, true)
        }
        "" | "default" | "future-default" | signing::ALGORITHM => {
            if usage.none() {
                (Capability::Certify | Capability::Sign, false)
            } else {
                (usage | Capability::Certify, false)
            }
        }
        agreement::ALGORITHM => {
            return Err(Error::InvalidValue(format!(
                "{} cannot be used for a primary key",
                algorithm
            )))
        }
        other => return Err(Error::InvalidValue(format!("unknown algorithm {:?}", other))),
    };

    if usage.test(Capability::Encrypt) {
        return Err(Error::InvalidValue(format!(
            "{} keys cannot encrypt",
            signing::ALGORITHM
        )));
    }
    Ok((usage, with_subkey))
}

/// Algorithm and usage of a new subkey.
fn subkey_usage(algorithm: &str, usage: Capabilities) -> Result<(&'static str, Capabilities)> {
    if usage.test(Capability::Certify) {
        return Err(Error::InvalidValue(
            "subkeys cannot certify".to_string(),
        ));
    }
    let encrypt_only = usage.none() || usage == Capabilities::from_flag(Capability::Encrypt);

    match algorithm {
        "" | "default" | "future-default" if encrypt_only => {
            Ok((agreement::ALGORITHM, Capability::Encrypt.into()))
        }
        "" | "default" | "future-default" if usage.test(Capability::Encrypt) => {
            Err(Error::InvalidValue(
                "encryption cannot be combined with other capabilities".to_string(),
            ))
        }
        "" | "default" | "future-default" => Ok((signing::ALGORITHM, usage)),
        signing::ALGORITHM if usage.test(Capability::Encrypt) => Err(Error::InvalidValue(
            format!("{} keys cannot encrypt", signing::ALGORITHM),
        )),
        signing::ALGORITHM if usage.none() => {
            Ok((signing::ALGORITHM, Capability::Sign.into()))
        }
        signing::ALGORITHM => Ok((signing::ALGORITHM, usage)),
        agreement::ALGORITHM if encrypt_only => {
            Ok((agreement::ALGORITHM, Capability::Encrypt.into()))
        }
        agreement::ALGORITHM => Err(Error::InvalidValue(format!(
            "{} keys can only encrypt",
            agreement::ALGORITHM
        ))),
        other => Err(Error::InvalidValue(format!("unknown algorithm {:?}", other))),
    }
}

/// Fresh key material: (algorithm, public, secret).
fn generate(algorithm: &'static str) -> (&'static str, Vec<u8>, Vec<u8>) {
    if algorithm == agreement::ALGORITHM {
        let key = EncryptionKey::generate();
        (algorithm, key.public_bytes().to_vec(), key.to_bytes().to_vec())
    } else {
        let key = SigningKey::generate();
        (
            signing::ALGORITHM,
            key.verifying_key().to_bytes().to_vec(),
            key.to_bytes().to_vec(),
        )
    }
}

impl Backend for SoftwareEngine {
    fn create_key(
        &self,
        user_id: &str,
        algorithm: &str,
        expires: u64,
        flags: u32,
        pinentry: Option<&dyn Pinentry>,
    ) -> Result<KeyGenerationResult> {
        let flags = CreationFlags::from_underlying_type(flags);
        debug!(user_id, algorithm, expires, flags = %flags, "Creating key");

        if user_id.is_empty() {
            return Err(Error::InvalidValue("user ID cannot be empty".to_string()));
        }
        check_supported(flags)?;
        let unique = !flags.test(CreationFlag::Force);
        if unique && self.keyring.has_user_id(user_id) {
            return Err(Error::Conflict(format!(
                "a key for {:?} already exists",
                user_id
            )));
        }

        let (usage, with_subkey) = primary_usage(algorithm, requested_usage(flags))?;
        let created = Utc::now().trunc_subsecs(0);
        let expires = self.expiration(created, expires, flags)?;
        let passphrase = new_passphrase(flags, user_id, pinentry)?;

        let primary_key = SigningKey::generate();
        let public = primary_key.verifying_key().to_bytes().to_vec();
        let fpr = fingerprint(signing::ALGORITHM, created.timestamp(), &public);

        let mut secrets = BTreeMap::new();
        secrets.insert(
            fpr.clone(),
            seal(&primary_key.to_bytes(), passphrase.as_deref(), &fpr)?,
        );

        let mut subkeys = vec![Subkey {
            fingerprint: fpr.clone(),
            algorithm: signing::ALGORITHM.to_string(),
            capabilities: usage,
            created,
            expires,
            public,
            has_secret: true,
            binding: None,
        }];

        if with_subkey {
            let (sub_algorithm, sub_public, sub_secret) = generate(agreement::ALGORITHM);
            let sub_fpr = fingerprint(sub_algorithm, created.timestamp(), &sub_public);
            secrets.insert(
                sub_fpr.clone(),
                seal(&sub_secret, passphrase.as_deref(), &sub_fpr)?,
            );
            subkeys.push(Subkey {
                fingerprint: sub_fpr.clone(),
                algorithm: sub_algorithm.to_string(),
                capabilities: Capability::Encrypt.into(),
                created,
                expires,
                public: sub_public,
                has_secret: true,
                binding: Some(primary_key.sign(&binding_message(&fpr, &sub_fpr))),
            });
        }

        let key = Key {
            fingerprint: fpr.clone(),
            user_ids: vec![UserId {
                id: user_id.to_string(),
                certification: primary_key.sign(&certification_message(&fpr, user_id)),
            }],
            subkeys,
            is_group: flags.test(CreationFlag::Group),
        };

        if flags.test(CreationFlag::NoStore) {
            debug!(fingerprint = %fpr, "Key not stored");
        } else if unique {
            self.keyring.insert_unique(KeyRecord { key, secrets })?;
        } else {
            self.keyring.insert(KeyRecord { key, secrets })?;
        }

        info!(
            fingerprint = %fpr,
            protected = passphrase.is_some(),
            "Key created"
        );
        Ok(KeyGenerationResult::primary(fpr, with_subkey))
    }

    fn create_subkey(
        &self,
        fingerprint: &str,
        algorithm: &str,
        expires: u64,
        flags: u32,
        pinentry: Option<&dyn Pinentry>,
    ) -> Result<KeyGenerationResult> {
        let flags = CreationFlags::from_underlying_type(flags);
        debug!(fingerprint, algorithm, expires, flags = %flags, "Creating subkey");

        check_supported(flags)?;
        let (sub_algorithm, usage) = subkey_usage(algorithm, requested_usage(flags))?;
        let created = Utc::now().trunc_subsecs(0);
        let expires = self.expiration(created, expires, flags)?;

        let add = |record: &mut KeyRecord| -> Result<String> {
            if !record.key.has_secret() {
                return Err(Error::NoSecretKey(record.key.fingerprint.clone()));
            }
            let primary_fpr = record.key.fingerprint.clone();
            let (primary_secret, passphrase) = unlock(record, &primary_fpr, pinentry)?;
            let primary_key = SigningKey::from_bytes(&primary_secret).map_err(crypto_error)?;

            let (sub_algorithm, sub_public, sub_secret) = generate(sub_algorithm);
            let sub_fpr =
                pgpkit_crypto::fingerprint(sub_algorithm, created.timestamp(), &sub_public);
            let sub_passphrase = if flags.test(CreationFlag::NoPassword) {
                None
            } else {
                passphrase
            };

            record.secrets.insert(
                sub_fpr.clone(),
                seal(&sub_secret, sub_passphrase.as_deref(), &sub_fpr)?,
            );
            record.key.subkeys.push(Subkey {
                fingerprint: sub_fpr.clone(),
                algorithm: sub_algorithm.to_string(),
                capabilities: usage,
                created,
                expires,
                public: sub_public,
                has_secret: true,
                binding: Some(primary_key.sign(&binding_message(&primary_fpr, &sub_fpr))),
            });
            Ok(sub_fpr)
        };

        let sub_fpr = if flags.test(CreationFlag::NoStore) {
            let mut record = self
                .keyring
                .get(fingerprint)
                .ok_or_else(|| Error::NotFound(fingerprint.to_string()))?;
            add(&mut record)?
        } else {
            self.keyring.update(fingerprint, add)?
        };

        info!(fingerprint, subkey = %sub_fpr, "Subkey created");
        Ok(KeyGenerationResult::subkey(sub_fpr))
    }

    fn delete_key(
        &self,
        fingerprint: &str,
        flags: u32,
        pinentry: Option<&dyn Pinentry>,
    ) -> Result<()> {
        let flags = DeletionFlags::from_underlying_type(flags);
        let record = self.keyring.remove(fingerprint, |record| {
            if !record.key.has_secret() {
                return Ok(());
            }
            if !flags.test(DeletionFlag::AllowSecret) {
                return Err(Error::Conflict(format!(
                    "{} has a secret key",
                    record.key.fingerprint
                )));
            }
            if !flags.test(DeletionFlag::Force) {
                let pinentry = pinentry.ok_or(Error::NoPinentry)?;
                let description = format!(
                    "Delete the secret key {} from the keyring?",
                    record.key.fingerprint
                );
                if !pinentry.confirm(&description) {
                    return Err(Error::Canceled);
                }
            }
            Ok(())
        })?;

        info!(fingerprint = %record.key.fingerprint, "Key deleted");
        Ok(())
    }

    fn key(&self, pattern: &str, secret_only: bool) -> Result<Key> {
        if pattern.is_empty() {
            return Err(Error::InvalidValue("empty key pattern".to_string()));
        }

        let matches = self.keyring.find(pattern);
        if matches.is_empty() {
            return Err(Error::NotFound(pattern.to_string()));
        }

        let mut candidates: Vec<Key> = matches
            .into_iter()
            .map(|record| record.key)
            .filter(|key| !secret_only || key.has_secret())
            .collect();

        match candidates.len() {
            0 => Err(Error::NoSecretKey(pattern.to_string())),
            1 => Ok(candidates.remove(0)),
            n => Err(Error::Conflict(format!(
                "{:?} matches {} keys",
                pattern, n
            ))),
        }
    }

    fn keys(&self) -> Result<Vec<Key>> {
        Ok(self.keyring.keys())
    }

    fn random(&self, mode: u32, buffer: &mut [u8]) -> Result<()> {
        if buffer.len() > self.config.max_random_bytes {
            return Err(Error::InvalidValue(format!(
                "{} random bytes requested, limit is {}",
                buffer.len(),
                self.config.max_random_bytes
            )));
        }

        if mode == RandomMode::Normal as u32 {
            buffer.copy_from_slice(&random::random_bytes(buffer.len()));
        } else if mode == RandomMode::ZBase32 as u32 {
            if buffer.len() < ZBASE32_BUFFER_LEN {
                return Err(Error::InvalidValue(format!(
                    "z-base-32 output needs {} bytes",
                    ZBASE32_BUFFER_LEN
                )));
            }
            let text = random::random_zbase32(ZBASE32_CHARS);
            buffer[..ZBASE32_CHARS].copy_from_slice(text.as_bytes());
            buffer[ZBASE32_CHARS] = 0;
        } else {
            warn!(mode, "Unknown random mode");
            return Err(Error::InvalidValue(format!("unknown random mode {}", mode)));
        }
        Ok(())
    }

    fn random_value(&self, limit: u32) -> Result<u32> {
        if limit == 0 {
            return Err(Error::InvalidValue("limit cannot be 0".to_string()));
        }
        Ok(random::random_value(limit))
    }
}
