//! The typed entry point for engine operations.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use pgpkit_common::{
    CreationFlags, DeletionFlags, Error, KeyGenerationResult, Protocol, RandomMode, Result,
};
use tracing::{debug, info, instrument, warn};

use crate::backend::{Backend, SoftwareEngine, ZBASE32_BUFFER_LEN};
use crate::config::EngineConfig;
use crate::key::Key;
use crate::pinentry::Pinentry;

/// A session with an engine for one protocol.
pub struct Context {
    protocol: Protocol,
    backend: Arc<dyn Backend>,
    pinentry: RwLock<Option<Arc<dyn Pinentry>>>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("protocol", &self.protocol)
            .field("has_pinentry", &self.pinentry.read().is_some())
            .finish()
    }
}

impl Context {
    /// Create a context backed by the software engine.
    pub fn create(protocol: Protocol, config: EngineConfig) -> Result<Self> {
        match protocol {
            Protocol::OpenPgp => {}
            Protocol::Cms => {
                warn!(%protocol, "Protocol not supported");
                return Err(Error::NotSupported(protocol.to_string()));
            }
            Protocol::Unknown => {
                return Err(Error::InvalidValue(protocol.to_string()));
            }
        }

        let backend = SoftwareEngine::new(config)?;
        Ok(Self::with_backend(protocol, Arc::new(backend)))
    }

    /// Create a context on top of an existing engine.
    pub fn with_backend(protocol: Protocol, backend: Arc<dyn Backend>) -> Self {
        debug!(%protocol, "Context created");
        Self {
            protocol,
            backend,
            pinentry: RwLock::new(None),
        }
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Use `pinentry` for passphrases and confirmations.
    pub fn set_pinentry(&self, pinentry: Arc<dyn Pinentry>) {
        *self.pinentry.write() = Some(pinentry);
    }

    /// Stop asking for passphrases; operations that need one fail with
    /// [`Error::NoPinentry`].
    pub fn clear_pinentry(&self) {
        *self.pinentry.write() = None;
    }

    fn pinentry(&self) -> Option<Arc<dyn Pinentry>> {
        self.pinentry.read().clone()
    }

    /// Create a new primary key for `user_id`.
    ///
    /// `expires` is the lifetime in seconds; 0 selects the configured default.
    #[instrument(skip(self, flags), fields(flags = %flags))]
    pub fn create_key(
        &self,
        user_id: &str,
        algorithm: &str,
        expires: u64,
        flags: CreationFlags,
    ) -> Result<KeyGenerationResult> {
        let pinentry = self.pinentry();
        let result = self.backend.create_key(
            user_id,
            algorithm,
            expires,
            flags.to_underlying_type(),
            pinentry.as_deref(),
        )?;
        info!(fingerprint = %result.fingerprint, "Created key");
        Ok(result)
    }

    /// Add a subkey to `key`.
    #[instrument(skip(self, key, flags), fields(fingerprint = %key.fingerprint, flags = %flags))]
    pub fn create_subkey(
        &self,
        key: &Key,
        algorithm: &str,
        expires: u64,
        flags: CreationFlags,
    ) -> Result<KeyGenerationResult> {
        if key.is_null() {
            return Err(Error::InvalidValue("null key".to_string()));
        }
        let pinentry = self.pinentry();
        let result = self.backend.create_subkey(
            &key.fingerprint,
            algorithm,
            expires,
            flags.to_underlying_type(),
            pinentry.as_deref(),
        )?;
        info!(subkey = %result.fingerprint, "Created subkey");
        Ok(result)
    }

    /// The key identified by a fingerprint or an exact user ID.
    pub fn key(&self, pattern: &str, secret_only: bool) -> Result<Key> {
        self.backend.key(pattern, secret_only)
    }

    /// All keys in the keyring.
    pub fn keys(&self) -> Result<Vec<Key>> {
        self.backend.keys()
    }

    /// Delete `key` from the keyring.
    #[instrument(skip(self, key, flags), fields(fingerprint = %key.fingerprint, flags = %flags))]
    pub fn delete_key(&self, key: &Key, flags: DeletionFlags) -> Result<()> {
        let pinentry = self.pinentry();
        self.backend
            .delete_key(&key.fingerprint, flags.to_underlying_type(), pinentry.as_deref())
    }

    /// `count` random bytes.
    pub fn generate_random_bytes(&self, count: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; count];
        self.backend
            .random(RandomMode::Normal as u32, &mut buffer)?;
        Ok(buffer)
    }

    /// A uniformly distributed value in `[0, limit)`.
    pub fn generate_random_value(&self, limit: u32) -> Result<u32> {
        self.backend.random_value(limit)
    }

    /// A random string of 30 z-base-32 characters.
    pub fn generate_random_zbase32_string(&self) -> Result<String> {
        let mut buffer = [0u8; ZBASE32_BUFFER_LEN];
        self.backend
            .random(RandomMode::ZBase32 as u32, &mut buffer)?;

        let end = buffer
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(buffer.len());
        String::from_utf8(buffer[..end].to_vec())
            .map_err(|e| Error::General(format!("engine returned invalid text: {}", e)))
    }
}
