//! pgpkit Common Types
//!
//! This crate contains the types shared between the engine and its callers:
//! the error taxonomy, protocol and flag enumerations, operation results and
//! small string and time helpers.

pub mod error;
pub mod options;
pub mod protocol;
pub mod results;
pub mod time;
pub mod util;

pub use error::*;
pub use options::*;
pub use protocol::*;
pub use results::*;
pub use time::*;
pub use util::*;
