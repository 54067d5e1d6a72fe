//! pgpkit Engine
//!
//! An in-process OpenPGP engine: key and subkey creation, key lookup and
//! deletion over a JSON keyring, and random data. [`Context`] is the typed
//! entry point; it hands flags to the [`Backend`] as raw integers.
//!
//! ```
//! use pgpkit_common::{CreationFlag, Protocol};
//! use pgpkit_engine::{Context, EngineConfig};
//!
//! let ctx = Context::create(Protocol::OpenPgp, EngineConfig::default()).unwrap();
//! let result = ctx
//!     .create_key("alice@example.org", "default", 0, CreationFlag::NoPassword.into())
//!     .unwrap();
//! assert!(result.primary && result.sub);
//! ```

pub mod backend;
pub mod config;
pub mod context;
pub mod key;
pub mod keyring;
pub mod pinentry;

pub use backend::{Backend, SoftwareEngine};
pub use config::EngineConfig;
pub use context::Context;
pub use key::{Key, Subkey, UserId};
pub use keyring::{KeyRecord, Keyring, SecretMaterial};
pub use pinentry::{FixedPinentry, Pinentry};
