//! Key storage indexed by primary fingerprint.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;

use dashmap::DashMap;
use parking_lot::Mutex;
use pgpkit_common::{Error, Result};
use pgpkit_crypto::{serde_hex, ProtectedSecret};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::key::Key;

const KEYRING_VERSION: u32 = 1;

/// Secret part of a primary key or subkey.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SecretMaterial {
    /// Stored without passphrase protection.
    Plain {
        #[serde(with = "serde_hex")]
        bytes: Vec<u8>,
    },
    /// Encrypted under the key's passphrase.
    Protected(ProtectedSecret),
}

impl SecretMaterial {
    pub fn is_protected(&self) -> bool {
        matches!(self, SecretMaterial::Protected(_))
    }
}

impl fmt::Debug for SecretMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretMaterial::Plain { .. } => f.write_str("Plain(<redacted>)"),
            SecretMaterial::Protected(_) => f.write_str("Protected(<redacted>)"),
        }
    }
}

/// A key together with the secret material of its subkeys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyRecord {
    pub key: Key,
    /// Secret material keyed by subkey fingerprint.
    #[serde(default)]
    pub secrets: BTreeMap<String, SecretMaterial>,
}

impl KeyRecord {
    /// Secret material of the primary key.
    pub fn primary_secret(&self) -> Option<&SecretMaterial> {
        self.secrets.get(&self.key.fingerprint)
    }
}

#[derive(Serialize, Deserialize)]
struct KeyringFile {
    version: u32,
    keys: Vec<KeyRecord>,
}

/// The set of keys known to an engine.
///
/// Reads go straight to the map. Every change runs under `writer` and is
/// applied to the map only after the file on disk has been replaced.
pub struct Keyring {
    path: Option<PathBuf>,
    records: DashMap<String, KeyRecord>,
    writer: Mutex<()>,
}

impl Keyring {
    /// A keyring that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            records: DashMap::new(),
            writer: Mutex::new(()),
        }
    }

    /// Open the keyring stored at `path`, starting empty if the file is missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let keyring = Self {
            path: Some(path.clone()),
            records: DashMap::new(),
            writer: Mutex::new(()),
        };

        if !path.exists() {
            debug!(path = %path.display(), "No keyring file, starting empty");
            return Ok(keyring);
        }

        let data = fs::read_to_string(&path)?;
        let file: KeyringFile = serde_json::from_str(&data)
            .map_err(|e| Error::Keyring(format!("{}: {}", path.display(), e)))?;
        if file.version != KEYRING_VERSION {
            return Err(Error::Keyring(format!(
                "{}: unsupported keyring version {}",
                path.display(),
                file.version
            )));
        }

        for record in file.keys {
            record.key.verify().map_err(|e| {
                Error::Keyring(format!("{}: {}", record.key.fingerprint, e))
            })?;
            keyring
                .records
                .insert(record.key.fingerprint.clone(), record);
        }

        info!(path = %path.display(), keys = keyring.len(), "Keyring loaded");
        Ok(keyring)
    }

    /// Add or replace a key.
    pub fn insert(&self, record: KeyRecord) -> Result<()> {
        let _writer = self.writer.lock();
        self.commit(record)
    }

    /// Add a key unless another key already carries one of its user IDs.
    pub fn insert_unique(&self, record: KeyRecord) -> Result<()> {
        let _writer = self.writer.lock();
        if let Some(uid) = record
            .key
            .user_ids
            .iter()
            .find(|uid| self.has_user_id(&uid.id))
        {
            return Err(Error::Conflict(format!(
                "a key for {:?} already exists",
                uid.id
            )));
        }
        self.commit(record)
    }

    /// Change the key with primary fingerprint `fingerprint` in place.
    ///
    /// `change` works on a copy; the copy replaces the stored record only
    /// when `change` succeeds and the keyring has been saved. Concurrent
    /// updates of the same key are applied one after the other.
    pub fn update<T>(
        &self,
        fingerprint: &str,
        change: impl FnOnce(&mut KeyRecord) -> Result<T>,
    ) -> Result<T> {
        let _writer = self.writer.lock();
        let mut record = self
            .get(fingerprint)
            .ok_or_else(|| Error::NotFound(fingerprint.to_string()))?;
        let value = change(&mut record)?;
        self.commit(record)?;
        Ok(value)
    }

    /// Look up a key by primary fingerprint.
    pub fn get(&self, fingerprint: &str) -> Option<KeyRecord> {
        self.records
            .get(&fingerprint.to_ascii_uppercase())
            .map(|entry| entry.value().clone())
    }

    /// All keys matching `pattern` (see [`Key::matches`]).
    pub fn find(&self, pattern: &str) -> Vec<KeyRecord> {
        let mut found: Vec<KeyRecord> = self
            .records
            .iter()
            .filter(|entry| entry.value().key.matches(pattern))
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by(|a, b| a.key.fingerprint.cmp(&b.key.fingerprint));
        found
    }

    /// Remove a key by primary fingerprint once `check` accepts it.
    pub fn remove(
        &self,
        fingerprint: &str,
        check: impl FnOnce(&KeyRecord) -> Result<()>,
    ) -> Result<KeyRecord> {
        let _writer = self.writer.lock();
        let fingerprint = fingerprint.to_ascii_uppercase();
        let record = self
            .get(&fingerprint)
            .ok_or_else(|| Error::NotFound(fingerprint.clone()))?;
        check(&record)?;

        self.save(self.snapshot(|fpr| fpr != fingerprint))?;
        self.records.remove(&fingerprint);
        Ok(record)
    }

    /// Whether any key carries exactly this user ID.
    pub fn has_user_id(&self, user_id: &str) -> bool {
        self.records
            .iter()
            .any(|entry| entry.value().key.user_ids.iter().any(|uid| uid.id == user_id))
    }

    /// All keys, sorted by fingerprint.
    pub fn keys(&self) -> Vec<Key> {
        let mut keys: Vec<Key> = self
            .records
            .iter()
            .map(|entry| entry.value().key.clone())
            .collect();
        keys.sort_by(|a, b| a.fingerprint.cmp(&b.fingerprint));
        keys
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Save the keyring with `record` in it, then store it in the map.
    /// The caller holds `writer`.
    fn commit(&self, record: KeyRecord) -> Result<()> {
        let fingerprint = record.key.fingerprint.clone();
        let mut keys = self.snapshot(|fpr| fpr != fingerprint);
        keys.push(record.clone());
        self.save(keys)?;
        self.records.insert(fingerprint, record);
        Ok(())
    }

    /// Records whose fingerprint passes `keep`.
    fn snapshot(&self, keep: impl Fn(&str) -> bool) -> Vec<KeyRecord> {
        self.records
            .iter()
            .filter(|entry| keep(entry.key().as_str()))
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn save(&self, mut keys: Vec<KeyRecord>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        keys.sort_by(|a, b| a.key.fingerprint.cmp(&b.key.fingerprint));

        let file = KeyringFile {
            version: KEYRING_VERSION,
            keys,
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| Error::Keyring(e.to_string()))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        if let Err(e) = fs::rename(&tmp, path) {
            warn!(path = %path.display(), error = %e, "Failed to replace keyring file");
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        debug!(path = %path.display(), keys = file.keys.len(), "Keyring saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{certification_message, Subkey, UserId};
    use chrono::Utc;
    use pgpkit_common::Capability;
    use pgpkit_crypto::{fingerprint, signing, SigningKey};

    fn record(user_id: &str) -> KeyRecord {
        let secret = SigningKey::generate();
        let created = Utc::now();
        let public = secret.verifying_key().to_bytes().to_vec();
        let fpr = fingerprint(signing::ALGORITHM, created.timestamp(), &public);

        let key = Key {
            fingerprint: fpr.clone(),
            user_ids: vec![UserId {
                id: user_id.to_string(),
                certification: secret.sign(&certification_message(&fpr, user_id)),
            }],
            subkeys: vec![Subkey {
                fingerprint: fpr.clone(),
                algorithm: signing::ALGORITHM.to_string(),
                capabilities: Capability::Certify | Capability::Sign,
                created,
                expires: None,
                public,
                has_secret: true,
                binding: None,
            }],
            is_group: false,
        };

        let mut secrets = BTreeMap::new();
        secrets.insert(
            fpr,
            SecretMaterial::Plain {
                bytes: secret.to_bytes().to_vec(),
            },
        );
        KeyRecord { key, secrets }
    }

    #[test]
    fn test_insert_get_remove() {
        let keyring = Keyring::in_memory();
        let alice = record("alice");
        let fpr = alice.key.fingerprint.clone();

        keyring.insert(alice).unwrap();
        assert_eq!(keyring.len(), 1);
        assert!(keyring.get(&fpr.to_lowercase()).is_some());
        assert!(keyring.has_user_id("alice"));
        assert!(!keyring.has_user_id("bob"));

        assert!(matches!(
            keyring.remove(&fpr, |_| Err(Error::Canceled)),
            Err(Error::Canceled)
        ));
        assert_eq!(keyring.len(), 1);

        let removed = keyring.remove(&fpr.to_lowercase(), |_| Ok(())).unwrap();
        assert_eq!(removed.key.fingerprint, fpr);
        assert!(matches!(keyring.remove(&fpr, |_| Ok(())), Err(Error::NotFound(_))));
        assert!(keyring.is_empty());
    }

    #[test]
    fn test_find() {
        let keyring = Keyring::in_memory();
        keyring.insert(record("alice")).unwrap();
        keyring.insert(record("alice")).unwrap();
        keyring.insert(record("bob")).unwrap();

        assert_eq!(keyring.find("alice").len(), 2);
        assert_eq!(keyring.find("bob").len(), 1);
        assert!(keyring.find("carol").is_empty());
        assert_eq!(keyring.keys().len(), 3);
    }

    #[test]
    fn test_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyring.json");

        let alice = record("alice");
        let fpr = alice.key.fingerprint.clone();
        {
            let keyring = Keyring::open(&path).unwrap();
            assert!(keyring.is_empty());
            keyring.insert(alice).unwrap();
        }

        let keyring = Keyring::open(&path).unwrap();
        let restored = keyring.get(&fpr).unwrap();
        assert_eq!(restored.key.user_ids[0].id, "alice");
        assert!(!restored.primary_secret().unwrap().is_protected());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_tampered_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyring.json");
        Keyring::open(&path)
            .unwrap()
            .insert(record("alice"))
            .unwrap();

        let data = fs::read_to_string(&path).unwrap();
        fs::write(&path, data.replace("alice", "mallory")).unwrap();

        assert!(matches!(Keyring::open(&path), Err(Error::Keyring(_))));
    }

    #[test]
    fn test_garbage_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyring.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(Keyring::open(&path), Err(Error::Keyring(_))));
    }

    #[test]
    fn test_insert_unique() {
        let keyring = Keyring::in_memory();
        keyring.insert_unique(record("alice")).unwrap();
        assert!(matches!(
            keyring.insert_unique(record("alice")),
            Err(Error::Conflict(_))
        ));
        keyring.insert(record("alice")).unwrap();
        assert_eq!(keyring.find("alice").len(), 2);
    }

    #[test]
    fn test_update() {
        let keyring = Keyring::in_memory();
        let alice = record("alice");
        let fpr = alice.key.fingerprint.clone();
        keyring.insert(alice).unwrap();

        let result: Result<()> = keyring.update(&fpr, |record| {
            record.key.is_group = true;
            Err(Error::Canceled)
        });
        assert!(matches!(result, Err(Error::Canceled)));
        assert!(!keyring.get(&fpr).unwrap().key.is_group);

        keyring
            .update(&fpr, |record| {
                record.key.is_group = true;
                Ok(())
            })
            .unwrap();
        assert!(keyring.get(&fpr).unwrap().key.is_group);

        assert!(matches!(
            keyring.update("0000", |_| Ok(())),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_failed_save_leaves_keyring_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyring.json");
        let keyring = Keyring::open(&path).unwrap();
        let alice = record("alice");
        let fpr = alice.key.fingerprint.clone();
        keyring.insert(alice).unwrap();

        // A directory in place of the file makes the rename fail.
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(matches!(keyring.insert_unique(record("bob")), Err(Error::Io(_))));
        assert!(!keyring.has_user_id("bob"));
        assert!(matches!(keyring.remove(&fpr, |_| Ok(())), Err(Error::Io(_))));
        assert!(keyring.get(&fpr).is_some());
        let result = keyring.update(&fpr, |record| {
            record.key.is_group = true;
            Ok(())
        });
        assert!(matches!(result, Err(Error::Io(_))));
        assert!(!keyring.get(&fpr).unwrap().key.is_group);
        assert!(!path.with_extension("json.tmp").exists());

        fs::remove_dir(&path).unwrap();
        keyring.insert_unique(record("bob")).unwrap();
        assert_eq!(Keyring::open(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_concurrent_updates_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyring.json");
        let keyring = Keyring::open(&path).unwrap();
        let alice = record("alice");
        let fpr = alice.key.fingerprint.clone();
        keyring.insert(alice).unwrap();

        std::thread::scope(|scope| {
            for thread in 0..8 {
                let keyring = &keyring;
                let fpr = &fpr;
                scope.spawn(move || {
                    for round in 0..10 {
                        keyring
                            .update(fpr, |record| {
                                record.secrets.insert(
                                    format!("{}-{}", thread, round),
                                    SecretMaterial::Plain { bytes: vec![0; 32] },
                                );
                                Ok(())
                            })
                            .unwrap();
                    }
                });
            }
        });

        assert_eq!(keyring.get(&fpr).unwrap().secrets.len(), 1 + 80);
        let reloaded = Keyring::open(&path).unwrap();
        assert_eq!(reloaded.get(&fpr).unwrap().secrets.len(), 1 + 80);
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = SecretMaterial::Plain {
            bytes: vec![0xAB; 32],
        };
        assert_eq!(format!("{:?}", secret), "Plain(<redacted>)");
    }
}
