//! pgpkit Flags
//!
//! Type-safe bit-flag sets for enumerations whose enumerators are bit values.
//!
//! A [`Flags`] value holds any combination of enumerators of one enumeration,
//! so the enumeration itself keeps representing a single value. Sets of
//! unrelated enumerations cannot be mixed, and the raw integer is only
//! reachable through [`Flags::to_underlying_type`] and
//! [`Flags::from_underlying_type`], which is what crosses the engine boundary.
//!
//! # Example
//!
//! ```rust
//! use pgpkit_flags::{define_enum_flag_operators, impl_flag_enum, Flags};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! #[repr(u32)]
//! enum DeletionFlag {
//!     AllowSecret = 1 << 0,
//!     Force = 1 << 1,
//! }
//! impl_flag_enum!(DeletionFlag: u32);
//!
//! type DeletionFlags = Flags<DeletionFlag>;
//! define_enum_flag_operators!(DeletionFlag => DeletionFlags);
//!
//! let mut flags = DeletionFlags::from_flags([DeletionFlag::AllowSecret, DeletionFlag::Force]);
//! flags.reset(DeletionFlag::Force);
//! assert!(flags.test(DeletionFlag::AllowSecret));
//! flags |= DeletionFlag::Force;
//!
//! let force_delete_of_secret = DeletionFlag::AllowSecret | DeletionFlag::Force;
//! assert_eq!(flags, force_delete_of_secret);
//! ```

pub mod bits;
pub mod flags;
mod macros;

pub use bits::FlagBits;
pub use flags::{FlagEnum, Flags, NATIVE_WIDTH};
