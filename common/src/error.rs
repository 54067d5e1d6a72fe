//! Error types for pgpkit engine operations.

use thiserror::Error;

/// Numeric error codes as used by the engine's C interface.
pub mod codes {
    pub const NO_ERROR: u32 = 0;
    pub const GENERAL: u32 = 1;
    pub const NO_PUBKEY: u32 = 9;
    pub const BAD_PASSPHRASE: u32 = 11;
    pub const NO_SECKEY: u32 = 17;
    pub const NO_VALUE: u32 = 26;
    pub const NOT_FOUND: u32 = 27;
    pub const INV_VALUE: u32 = 55;
    pub const NOT_SUPPORTED: u32 = 60;
    pub const CONFLICT: u32 = 70;
    pub const NO_PIN_ENTRY: u32 = 85;
    pub const CANCELED: u32 = 99;
    pub const FULLY_CANCELED: u32 = 198;
}

/// Error source identifier of this library.
pub const ERROR_SOURCE: u32 = 7;

/// Main error type for engine operations.
///
/// Success is never an `Error`; it is the `Ok` side of [`Result`].
#[derive(Error, Debug)]
pub enum Error {
    /// Unspecific failure.
    #[error("General error: {0}")]
    General(String),

    /// An argument was rejected.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// The operation produced no value.
    #[error("No value")]
    NoValue,

    /// A key or other object was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The public part of a key is missing.
    #[error("No public key: {0}")]
    NoPublicKey(String),

    /// The secret part of a key is missing.
    #[error("No secret key: {0}")]
    NoSecretKey(String),

    /// The passphrase did not unlock the secret key.
    #[error("Bad passphrase")]
    BadPassphrase,

    /// The requested protocol or algorithm is not supported.
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// The operation conflicts with existing state.
    #[error("Conflicting use: {0}")]
    Conflict(String),

    /// A passphrase or confirmation was needed but nobody can be asked.
    #[error("No pinentry")]
    NoPinentry,

    /// The user aborted the operation.
    #[error("Operation cancelled")]
    Canceled,

    /// The user aborted the operation and every pending one.
    #[error("Operation fully cancelled")]
    FullyCanceled,

    /// Key material could not be generated or processed.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// The keyring file could not be read or written.
    #[error("Keyring error: {0}")]
    Keyring(String),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A code this library has no dedicated variant for.
    #[error("Unknown error code {code}")]
    Unknown { code: u32 },
}

/// The three outcome classes of an engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The operation succeeded.
    Success,
    /// The user aborted the operation; not a failure.
    Canceled,
    /// Anything else.
    Error,
}

impl Error {
    /// Build an error from a numeric code. Returns `None` for success.
    pub fn from_code(code: u32) -> Option<Self> {
        let err = match code {
            codes::NO_ERROR => return None,
            codes::GENERAL => Error::General(String::new()),
            codes::NO_PUBKEY => Error::NoPublicKey(String::new()),
            codes::BAD_PASSPHRASE => Error::BadPassphrase,
            codes::NO_SECKEY => Error::NoSecretKey(String::new()),
            codes::NO_VALUE => Error::NoValue,
            codes::NOT_FOUND => Error::NotFound(String::new()),
            codes::INV_VALUE => Error::InvalidValue(String::new()),
            codes::NOT_SUPPORTED => Error::NotSupported(String::new()),
            codes::CONFLICT => Error::Conflict(String::new()),
            codes::NO_PIN_ENTRY => Error::NoPinentry,
            codes::CANCELED => Error::Canceled,
            codes::FULLY_CANCELED => Error::FullyCanceled,
            code => Error::Unknown { code },
        };
        Some(err)
    }

    /// Decode an encoded error value into a `Result`.
    pub fn check(encoded: u32) -> Result<()> {
        match Self::from_code(encoded & 0xffff) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Numeric error code.
    pub fn code(&self) -> u32 {
        match self {
            Error::General(_) | Error::Crypto(_) | Error::Keyring(_) | Error::Io(_) => {
                codes::GENERAL
            }
            Error::InvalidValue(_) => codes::INV_VALUE,
            Error::NoValue => codes::NO_VALUE,
            Error::NotFound(_) => codes::NOT_FOUND,
            Error::NoPublicKey(_) => codes::NO_PUBKEY,
            Error::NoSecretKey(_) => codes::NO_SECKEY,
            Error::BadPassphrase => codes::BAD_PASSPHRASE,
            Error::NotSupported(_) => codes::NOT_SUPPORTED,
            Error::Conflict(_) => codes::CONFLICT,
            Error::NoPinentry => codes::NO_PIN_ENTRY,
            Error::Canceled => codes::CANCELED,
            Error::FullyCanceled => codes::FULLY_CANCELED,
            Error::Unknown { code } => *code,
        }
    }

    /// Error source identifier.
    pub fn source_id(&self) -> u32 {
        ERROR_SOURCE
    }

    /// Source and code packed into one value, as the C interface reports them.
    pub fn encoded(&self) -> u32 {
        ((self.source_id() & 0x7f) << 24) | (self.code() & 0xffff)
    }

    /// Get a stable name for the error code.
    pub fn name(&self) -> &'static str {
        match self.code() {
            codes::GENERAL => "GENERAL",
            codes::NO_PUBKEY => "NO_PUBKEY",
            codes::BAD_PASSPHRASE => "BAD_PASSPHRASE",
            codes::NO_SECKEY => "NO_SECKEY",
            codes::NO_VALUE => "NO_VALUE",
            codes::NOT_FOUND => "NOT_FOUND",
            codes::INV_VALUE => "INV_VALUE",
            codes::NOT_SUPPORTED => "NOT_SUPPORTED",
            codes::CONFLICT => "CONFLICT",
            codes::NO_PIN_ENTRY => "NO_PIN_ENTRY",
            codes::CANCELED => "CANCELED",
            codes::FULLY_CANCELED => "FULLY_CANCELED",
            _ => "UNKNOWN",
        }
    }

    /// Whether the user aborted the operation.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Canceled | Error::FullyCanceled)
    }

    /// Whether this is a genuine failure rather than a cancellation.
    pub fn is_error(&self) -> bool {
        !self.is_canceled()
    }

    /// Outcome class of this error.
    pub fn class(&self) -> ErrorClass {
        if self.is_canceled() {
            ErrorClass::Canceled
        } else {
            ErrorClass::Error
        }
    }

    /// Diagnostic rendering with the encoded value, e.g. for logs.
    pub fn describe(&self) -> String {
        format!("Error({} ({}))", self.encoded(), self)
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of engine results.
pub trait ResultExt {
    /// Outcome class; `Ok` is always [`ErrorClass::Success`].
    fn class(&self) -> ErrorClass;

    /// Whether the result is a cancellation.
    fn is_canceled(&self) -> bool {
        self.class() == ErrorClass::Canceled
    }
}

impl<T> ResultExt for Result<T> {
    fn class(&self) -> ErrorClass {
        match self {
            Ok(_) => ErrorClass::Success,
            Err(err) => err.class(),
        }
    }
}
