//! Flag enumerations passed to engine operations.

use pgpkit_flags::{define_enum_flag_operators, impl_flag_enum, Flags};
use serde::{Deserialize, Serialize};

/// Options for deleting a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum DeletionFlag {
    /// Also delete the secret part.
    AllowSecret = 1 << 0,
    /// Do not ask for confirmation.
    Force = 1 << 1,
}
impl_flag_enum!(DeletionFlag: u32);

/// A combination of [`DeletionFlag`]s.
pub type DeletionFlags = Flags<DeletionFlag>;
define_enum_flag_operators!(DeletionFlag => DeletionFlags);

/// Options for creating keys and subkeys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum CreationFlag {
    Sign = 1 << 0,
    Encrypt = 1 << 1,
    Certify = 1 << 2,
    Authenticate = 1 << 3,
    /// Store the secret key without passphrase protection.
    NoPassword = 1 << 7,
    SelfSigned = 1 << 8,
    /// Generate the key but do not add it to the keyring.
    NoStore = 1 << 9,
    WantPublic = 1 << 10,
    WantSecret = 1 << 11,
    /// Skip the duplicate user ID check.
    Force = 1 << 12,
    NoExpire = 1 << 13,
    /// Mark the key as a group key.
    Group = 1 << 15,
}
impl_flag_enum!(CreationFlag: u32);

/// A combination of [`CreationFlag`]s. The empty set means "use defaults".
pub type CreationFlags = Flags<CreationFlag>;
define_enum_flag_operators!(CreationFlag => CreationFlags);

/// What a key or subkey may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Capability {
    Sign = 1 << 0,
    Encrypt = 1 << 1,
    Certify = 1 << 2,
    Authenticate = 1 << 3,
}
impl_flag_enum!(Capability: u8);

/// A combination of [`Capability`] values.
pub type Capabilities = Flags<Capability, 4>;
define_enum_flag_operators!(Capability => Capabilities);

impl Capability {
    /// All capabilities in display order.
    pub const ALL: [Capability; 4] = [
        Capability::Sign,
        Capability::Certify,
        Capability::Encrypt,
        Capability::Authenticate,
    ];

    /// Single-letter abbreviation.
    pub fn letter(self) -> char {
        match self {
            Capability::Sign => 'S',
            Capability::Certify => 'C',
            Capability::Encrypt => 'E',
            Capability::Authenticate => 'A',
        }
    }
}

/// The capabilities requested by a set of creation flags.
pub fn requested_usage(flags: CreationFlags) -> Capabilities {
    Capability::ALL
        .into_iter()
        .filter(|capability| flags.test(CreationFlag::from(*capability)))
        .collect()
}

/// Render capabilities in the bracketed letter style, e.g. `[SC]`.
pub fn usage_string(capabilities: Capabilities) -> String {
    let letters: String = Capability::ALL
        .into_iter()
        .filter(|capability| capabilities.test(*capability))
        .map(Capability::letter)
        .collect();
    format!("[{}]", letters)
}

impl From<Capability> for CreationFlag {
    fn from(capability: Capability) -> Self {
        match capability {
            Capability::Sign => CreationFlag::Sign,
            Capability::Encrypt => CreationFlag::Encrypt,
            Capability::Certify => CreationFlag::Certify,
            Capability::Authenticate => CreationFlag::Authenticate,
        }
    }
}

/// Output format of random data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum RandomMode {
    Normal = 0,
    ZBase32 = 1,
}
