//! Engine configuration.

use std::path::PathBuf;

use pgpkit_common::{Error, Result};

/// Main engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory holding `keyring.json`. `None` keeps the keyring in memory.
    pub home_dir: Option<PathBuf>,
    /// Lifetime in seconds of new keys created with `expires == 0`.
    /// Zero means such keys never expire.
    pub default_expiration: u64,
    /// Largest buffer a single random request may fill.
    pub max_random_bytes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            home_dir: None,
            default_expiration: 0,
            max_random_bytes: 64 * 1024,
        }
    }
}

impl EngineConfig {
    /// Configuration for a keyring stored under `home_dir`.
    pub fn with_home(home_dir: impl Into<PathBuf>) -> Self {
        Self {
            home_dir: Some(home_dir.into()),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(home) = std::env::var("PGPKIT_HOME") {
            if !home.is_empty() {
                config.home_dir = Some(PathBuf::from(home));
            }
        }

        if let Ok(seconds) = std::env::var("PGPKIT_DEFAULT_EXPIRATION") {
            if let Ok(seconds) = seconds.parse() {
                config.default_expiration = seconds;
            }
        }

        if let Ok(max) = std::env::var("PGPKIT_MAX_RANDOM_BYTES") {
            if let Ok(max) = max.parse() {
                config.max_random_bytes = max;
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_random_bytes == 0 {
            return Err(Error::InvalidValue(
                "max_random_bytes cannot be 0".to_string(),
            ));
        }

        if let Some(home) = &self.home_dir {
            if home.as_os_str().is_empty() {
                return Err(Error::InvalidValue(
                    "home directory cannot be empty".to_string(),
                ));
            }
            if home.exists() && !home.is_dir() {
                return Err(Error::InvalidValue(format!(
                    "{} is not a directory",
                    home.display()
                )));
            }
        }

        Ok(())
    }

    /// Path of the keyring file, if the keyring is persistent.
    pub fn keyring_path(&self) -> Option<PathBuf> {
        self.home_dir.as_ref().map(|home| home.join("keyring.json"))
    }
}
