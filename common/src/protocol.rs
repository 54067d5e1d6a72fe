//! Cryptographic protocols understood by the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The protocol a context operates with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// OpenPGP.
    OpenPgp,
    /// CMS (S/MIME).
    Cms,
    /// Anything else.
    Unknown,
}

impl Protocol {
    /// Parse a protocol name, case-insensitively.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "openpgp" | "pgp" => Protocol::OpenPgp,
            "cms" | "smime" => Protocol::Cms,
            _ => Protocol::Unknown,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Protocol::OpenPgp => "OpenPGP",
            Protocol::Cms => "CMS",
            Protocol::Unknown => "UnknownProtocol",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_names() {
        assert_eq!(Protocol::from_name("OpenPGP"), Protocol::OpenPgp);
        assert_eq!(Protocol::from_name("cms"), Protocol::Cms);
        assert_eq!(Protocol::from_name("x509"), Protocol::Unknown);
        assert_eq!(Protocol::OpenPgp.to_string(), "OpenPGP");
        assert_eq!(Protocol::Unknown.to_string(), "UnknownProtocol");
    }
}
