//! Storage integers for flag sets.

use std::fmt::Debug;
use std::hash::Hash;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Not};

mod sealed {
    pub trait Sealed {}
}

/// An unsigned integer that can back a [`Flags`](crate::Flags) value.
///
/// Implemented for `u8`, `u16`, `u32`, `u64` and `u128`.
pub trait FlagBits:
    Copy
    + Eq
    + Hash
    + Debug
    + Not<Output = Self>
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + BitXor<Output = Self>
    + BitAndAssign
    + BitOrAssign
    + BitXorAssign
    + sealed::Sealed
{
    /// No bit set.
    const ZERO: Self;
    /// Every bit set.
    const ONES: Self;
    /// Width of the integer in bits.
    const BITS: u32;

    /// The lowest `n` bits set, saturating at the full width.
    fn low_mask(n: u32) -> Self;

    /// Whether bit `index` is set. Out-of-range indices read as clear.
    fn bit(self, index: u32) -> bool;

    /// Whether no bit at or above position `n` is set.
    fn fits_in(self, n: u32) -> bool {
        self & !Self::low_mask(n) == Self::ZERO
    }
}

macro_rules! impl_flag_bits {
    ($($t:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $t {}

            impl FlagBits for $t {
                const ZERO: Self = 0;
                const ONES: Self = <$t>::MAX;
                const BITS: u32 = <$t>::BITS;

                #[inline]
                fn low_mask(n: u32) -> Self {
                    if n >= Self::BITS {
                        Self::ONES
                    } else {
                        (1 << n) - 1
                    }
                }

                #[inline]
                fn bit(self, index: u32) -> bool {
                    index < Self::BITS && (self >> index) & 1 == 1
                }
            }
        )*
    };
}

impl_flag_bits!(u8, u16, u32, u64, u128);
