//! Per-enumeration operator generation.

/// Implement [`FlagEnum`](crate::FlagEnum) for a field-less enumeration.
///
/// Also provides `|`, `&` and `^` with the enumerator on the left and a
/// [`Flags`](crate::Flags) of any width on the right. Two bare enumerators
/// still cannot be combined; opt into that with
/// [`define_enum_flag_operators!`](crate::define_enum_flag_operators).
///
/// ```rust
/// use pgpkit_flags::{impl_flag_enum, Flags};
///
/// #[derive(Debug, Clone, Copy)]
/// #[repr(u8)]
/// enum Usage {
///     Sign = 1 << 0,
///     Encrypt = 1 << 1,
/// }
/// impl_flag_enum!(Usage: u8);
///
/// let flags = Usage::Sign | Flags::<Usage>::from_flag(Usage::Encrypt);
/// assert_eq!(flags.to_underlying_type(), 0b11);
/// ```
#[macro_export]
macro_rules! impl_flag_enum {
    ($enum:ty : $repr:ty) => {
        impl $crate::FlagEnum for $enum {
            type Repr = $repr;

            #[inline]
            fn to_repr(self) -> $repr {
                self as $repr
            }
        }

        impl<const N: u32> ::std::ops::BitOr<$crate::Flags<$enum, N>> for $enum {
            type Output = $crate::Flags<$enum, N>;

            fn bitor(self, rhs: $crate::Flags<$enum, N>) -> Self::Output {
                rhs | self
            }
        }

        impl<const N: u32> ::std::ops::BitAnd<$crate::Flags<$enum, N>> for $enum {
            type Output = $crate::Flags<$enum, N>;

            fn bitand(self, rhs: $crate::Flags<$enum, N>) -> Self::Output {
                rhs & self
            }
        }

        impl<const N: u32> ::std::ops::BitXor<$crate::Flags<$enum, N>> for $enum {
            type Output = $crate::Flags<$enum, N>;

            fn bitxor(self, rhs: $crate::Flags<$enum, N>) -> Self::Output {
                rhs ^ self
            }
        }
    };
}

/// Allow `|`, `&` and `^` between two bare enumerators, yielding `$flags`.
///
/// Only enumerations that opt in get these operators, so bitwise arithmetic
/// on enumerations that were never meant to be combined does not compile.
#[macro_export]
macro_rules! define_enum_flag_operators {
    ($enum:ty => $flags:ty) => {
        impl ::std::ops::BitOr for $enum {
            type Output = $flags;

            fn bitor(self, rhs: $enum) -> $flags {
                <$flags>::from_flag(self) | rhs
            }
        }

        impl ::std::ops::BitAnd for $enum {
            type Output = $flags;

            fn bitand(self, rhs: $enum) -> $flags {
                <$flags>::from_flag(self) & rhs
            }
        }

        impl ::std::ops::BitXor for $enum {
            type Output = $flags;

            fn bitxor(self, rhs: $enum) -> $flags {
                <$flags>::from_flag(self) ^ rhs
            }
        }
    };
}
