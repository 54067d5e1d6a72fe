//! The flag-set container.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FromIterator;
use std::marker::PhantomData;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Not};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::bits::FlagBits;

/// Width sentinel meaning "every bit of the representation".
pub const NATIVE_WIDTH: u32 = u32::MAX;

/// An enumeration whose enumerators are bit values.
///
/// Implement it with [`impl_flag_enum!`](crate::impl_flag_enum), which also
/// provides the operators with the enumerator on the left-hand side.
pub trait FlagEnum: Copy {
    /// The integer behind each enumerator.
    type Repr: FlagBits;

    /// The enumerator's bit pattern.
    fn to_repr(self) -> Self::Repr;
}

/// A fixed-width set of flags from the enumeration `E`.
///
/// `N` is the number of significant bits and defaults to the width of
/// `E::Repr`. Storage never holds bits at or above `N` unless the caller put
/// them there through [`Flags::from_underlying_type`] or an enumerator wider
/// than `N`; both are caller errors that are only asserted in debug builds.
/// Complement always masks to `N` bits.
pub struct Flags<E: FlagEnum, const N: u32 = NATIVE_WIDTH> {
    bits: E::Repr,
    _marker: PhantomData<E>,
}

impl<E: FlagEnum, const N: u32> Flags<E, N> {
    /// An empty set.
    pub fn new() -> Self {
        Self::with_bits(E::Repr::ZERO)
    }

    /// A set holding exactly `flag`.
    pub fn from_flag(flag: E) -> Self {
        Self::with_bits(flag.to_repr())
    }

    /// The union of all `flags`. Order and repetition do not matter.
    pub fn from_flags<I>(flags: I) -> Self
    where
        I: IntoIterator<Item = E>,
    {
        flags.into_iter().collect()
    }

    /// Wrap a raw bitmask as handed out by the engine.
    ///
    /// The value is stored as is; it must not have bits at or above `N`.
    pub fn from_underlying_type(bits: E::Repr) -> Self {
        debug_assert!(
            bits.fits_in(Self::width()),
            "{:?} does not fit into {} bits",
            bits,
            Self::width()
        );
        Self::with_bits(bits)
    }

    /// Every one of the `N` bits set.
    pub fn all() -> Self {
        Self::with_bits(Self::mask())
    }

    /// The raw bitmask, exactly as the engine expects it.
    pub fn to_underlying_type(self) -> E::Repr {
        self.bits
    }

    /// Number of significant bits.
    pub fn width() -> u32 {
        if N == NATIVE_WIDTH {
            E::Repr::BITS
        } else {
            debug_assert!(
                N <= E::Repr::BITS,
                "width {} exceeds the {}-bit representation",
                N,
                E::Repr::BITS
            );
            N
        }
    }

    /// Whether every bit of `flag` is set.
    ///
    /// For a multi-bit enumerator the whole group must be present. A
    /// zero-valued enumerator is always reported as set.
    pub fn test(&self, flag: E) -> bool {
        let bits = flag.to_repr();
        self.bits & bits == bits
    }

    /// Whether any flag is set.
    pub fn any(&self) -> bool {
        self.bits != E::Repr::ZERO
    }

    /// Whether no flag is set.
    pub fn none(&self) -> bool {
        !self.any()
    }

    /// Alias of [`Flags::none`].
    pub fn is_empty(&self) -> bool {
        self.none()
    }

    /// Set `flag`.
    pub fn set(&mut self, flag: E) -> &mut Self {
        self.set_to(flag, true)
    }

    /// Set `flag` if `value` is `true`, otherwise reset it.
    pub fn set_to(&mut self, flag: E, value: bool) -> &mut Self {
        if value {
            self.bits |= flag.to_repr();
            self
        } else {
            self.reset(flag)
        }
    }

    /// Reset `flag`.
    pub fn reset(&mut self, flag: E) -> &mut Self {
        *self &= !Self::from_flag(flag);
        self
    }

    /// Reset every flag.
    pub fn reset_all(&mut self) -> &mut Self {
        self.bits = E::Repr::ZERO;
        self
    }

    fn with_bits(bits: E::Repr) -> Self {
        Self {
            bits,
            _marker: PhantomData,
        }
    }

    fn mask() -> E::Repr {
        E::Repr::low_mask(Self::width())
    }
}

impl<E: FlagEnum, const N: u32> Clone for Flags<E, N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: FlagEnum, const N: u32> Copy for Flags<E, N> {}

impl<E: FlagEnum, const N: u32> Default for Flags<E, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: FlagEnum, const N: u32> PartialEq for Flags<E, N> {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl<E: FlagEnum, const N: u32> Eq for Flags<E, N> {}

impl<E: FlagEnum, const N: u32> Hash for Flags<E, N> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits.hash(state);
    }
}

impl<E: FlagEnum, const N: u32> From<E> for Flags<E, N> {
    fn from(flag: E) -> Self {
        Self::from_flag(flag)
    }
}

impl<E: FlagEnum, const N: u32> FromIterator<E> for Flags<E, N> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        let mut flags = Self::new();
        flags.extend(iter);
        flags
    }
}

impl<E: FlagEnum, const N: u32> Extend<E> for Flags<E, N> {
    fn extend<I: IntoIterator<Item = E>>(&mut self, iter: I) {
        for flag in iter {
            self.bits |= flag.to_repr();
        }
    }
}

impl<E: FlagEnum, const N: u32, B: Into<Flags<E, N>>> BitOr<B> for Flags<E, N> {
    type Output = Self;

    fn bitor(self, rhs: B) -> Self {
        Self::with_bits(self.bits | rhs.into().bits)
    }
}

impl<E: FlagEnum, const N: u32, B: Into<Flags<E, N>>> BitAnd<B> for Flags<E, N> {
    type Output = Self;

    fn bitand(self, rhs: B) -> Self {
        Self::with_bits(self.bits & rhs.into().bits)
    }
}

impl<E: FlagEnum, const N: u32, B: Into<Flags<E, N>>> BitXor<B> for Flags<E, N> {
    type Output = Self;

    fn bitxor(self, rhs: B) -> Self {
        Self::with_bits(self.bits ^ rhs.into().bits)
    }
}

impl<E: FlagEnum, const N: u32, B: Into<Flags<E, N>>> BitOrAssign<B> for Flags<E, N> {
    fn bitor_assign(&mut self, rhs: B) {
        self.bits |= rhs.into().bits;
    }
}

impl<E: FlagEnum, const N: u32, B: Into<Flags<E, N>>> BitAndAssign<B> for Flags<E, N> {
    fn bitand_assign(&mut self, rhs: B) {
        self.bits &= rhs.into().bits;
    }
}

impl<E: FlagEnum, const N: u32, B: Into<Flags<E, N>>> BitXorAssign<B> for Flags<E, N> {
    fn bitxor_assign(&mut self, rhs: B) {
        self.bits ^= rhs.into().bits;
    }
}

impl<E: FlagEnum, const N: u32> Not for Flags<E, N> {
    type Output = Self;

    fn not(self) -> Self {
        Self::with_bits(!self.bits & Self::mask())
    }
}

/// `N` binary digits, most significant first.
impl<E: FlagEnum, const N: u32> fmt::Display for Flags<E, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits: String = (0..Self::width())
            .rev()
            .map(|i| if self.bits.bit(i) { '1' } else { '0' })
            .collect();
        f.pad(&digits)
    }
}

impl<E: FlagEnum, const N: u32> fmt::Binary for Flags<E, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<E: FlagEnum, const N: u32> fmt::Debug for Flags<E, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Flags({})", self)
    }
}

impl<E, const N: u32> Serialize for Flags<E, N>
where
    E: FlagEnum,
    E::Repr: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.bits.serialize(serializer)
    }
}

impl<'de, E, const N: u32> Deserialize<'de> for Flags<E, N>
where
    E: FlagEnum,
    E::Repr: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bits = E::Repr::deserialize(deserializer)?;
        if !bits.fits_in(Self::width()) {
            return Err(de::Error::custom(format!(
                "flag value {:?} does not fit into {} bits",
                bits,
                Self::width()
            )));
        }
        Ok(Self::with_bits(bits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[repr(u32)]
    enum TestFlag {
        A = 1 << 0,
        B = 1 << 1,
        C = 1 << 2,
    }
    crate::impl_flag_enum!(TestFlag: u32);

    type TestFlags = Flags<TestFlag, 3>;
    crate::define_enum_flag_operators!(TestFlag => TestFlags);

    #[derive(Debug, Clone, Copy)]
    #[repr(u8)]
    enum Mode {
        Off = 0,
        Low = 0b0011,
        High = 0b1100,
    }
    crate::impl_flag_enum!(Mode: u8);

    fn set_of(flags: &[TestFlag]) -> TestFlags {
        TestFlags::from_flags(flags.iter().copied())
    }

    #[test]
    fn test_default_construction() {
        let flags = TestFlags::new();
        assert_eq!(flags.to_underlying_type(), 0);
        assert!(!flags.any());
        assert!(!flags.test(TestFlag::A));
        assert!(!flags.test(TestFlag::B));
        assert!(!flags.test(TestFlag::C));
        assert_eq!(flags, TestFlags::default());
    }

    #[test]
    fn test_single_flag_construction() {
        let flags = TestFlags::from_flag(TestFlag::A);
        assert_eq!(flags.to_underlying_type(), 1);
        assert!(flags.any());
        assert!(flags.test(TestFlag::A));
        assert!(!flags.test(TestFlag::B));
        assert!(!flags.test(TestFlag::C));
    }

    #[test]
    fn test_list_construction() {
        let flags = set_of(&[TestFlag::B, TestFlag::C]);
        assert_eq!(flags.to_underlying_type(), 6);
        assert!(!flags.test(TestFlag::A));
        assert!(flags.test(TestFlag::B));
        assert!(flags.test(TestFlag::C));
        assert_eq!(flags, set_of(&[TestFlag::C, TestFlag::B]));
        assert_eq!(flags, set_of(&[TestFlag::B, TestFlag::C, TestFlag::B]));
    }

    #[test]
    fn test_underlying_type_construction() {
        let flags = TestFlags::from_underlying_type(3);
        assert_eq!(flags.to_underlying_type(), 3);
        assert!(flags.test(TestFlag::A));
        assert!(flags.test(TestFlag::B));
        assert!(!flags.test(TestFlag::C));
        assert_eq!(flags, set_of(&[TestFlag::A, TestFlag::B]));
    }

    #[test]
    fn test_set_and_reset() {
        let mut flags = TestFlags::new();
        flags.set(TestFlag::A);
        assert_eq!(flags, set_of(&[TestFlag::A]));
        flags.set(TestFlag::C);
        assert_eq!(flags, set_of(&[TestFlag::A, TestFlag::C]));
        flags.set(TestFlag::B);
        assert_eq!(flags, TestFlags::all());
        flags.set_to(TestFlag::A, false);
        assert_eq!(flags, set_of(&[TestFlag::B, TestFlag::C]));
        flags.reset(TestFlag::B);
        assert_eq!(flags, set_of(&[TestFlag::C]));
        flags.reset_all();
        assert!(flags.none());
    }

    #[test]
    fn test_chained_mutation() {
        let mut flags = TestFlags::new();
        flags
            .set(TestFlag::A)
            .set(TestFlag::B)
            .reset(TestFlag::A)
            .set_to(TestFlag::B, false)
            .set(TestFlag::C);
        assert_eq!(flags, set_of(&[TestFlag::C]));

        let mut flags = TestFlags::new();
        flags.set(TestFlag::A).set(TestFlag::B).reset_all().set(TestFlag::C);
        assert_eq!(flags, set_of(&[TestFlag::C]));
    }

    #[test]
    fn test_set_is_idempotent() {
        let mut once = TestFlags::new();
        once.set(TestFlag::A);
        let mut twice = TestFlags::new();
        twice.set(TestFlag::A).set(TestFlag::A);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_or() {
        let a = TestFlags::from_flag(TestFlag::A);
        let b = TestFlags::from_flag(TestFlag::B);
        let ab = set_of(&[TestFlag::A, TestFlag::B]);

        assert_eq!(a | b, ab);
        assert_eq!(a | TestFlag::B, ab);
        assert_eq!(TestFlag::A | b, ab);

        let mut flags = a;
        flags |= b;
        assert_eq!(flags, ab);
        flags |= TestFlag::C;
        assert_eq!(flags, TestFlags::all());
    }

    #[test]
    fn test_and() {
        let b = TestFlags::from_flag(TestFlag::B);
        let c = TestFlags::from_flag(TestFlag::C);
        let ab = set_of(&[TestFlag::A, TestFlag::B]);
        let bc = set_of(&[TestFlag::B, TestFlag::C]);

        assert_eq!(ab & b, b);
        assert_eq!(ab & TestFlag::B, b);
        assert_eq!(TestFlag::B & ab, b);

        let mut flags = TestFlags::all();
        flags &= bc;
        assert_eq!(flags, bc);
        flags &= TestFlag::C;
        assert_eq!(flags, c);
    }

    #[test]
    fn test_xor() {
        let a = TestFlags::from_flag(TestFlag::A);
        let b = TestFlags::from_flag(TestFlag::B);
        let ab = set_of(&[TestFlag::A, TestFlag::B]);
        let ac = set_of(&[TestFlag::A, TestFlag::C]);
        let bc = set_of(&[TestFlag::B, TestFlag::C]);

        assert_eq!(ab ^ ac, bc);
        assert_eq!(ab ^ TestFlag::B, a);
        assert_eq!(TestFlag::B ^ ab, a);

        let mut flags = ab;
        flags ^= ac;
        assert_eq!(flags, bc);
        flags ^= TestFlag::C;
        assert_eq!(flags, b);
    }

    #[test]
    fn test_complement_masks_to_width() {
        let flags = !set_of(&[TestFlag::A, TestFlag::B]);
        assert!(!flags.test(TestFlag::A));
        assert!(!flags.test(TestFlag::B));
        assert!(flags.test(TestFlag::C));
        assert_eq!(flags.to_underlying_type(), 0b100);

        let flags = !TestFlags::all();
        assert!(!flags.any());
        assert_eq!(!TestFlags::new(), TestFlags::all());
    }

    #[test]
    fn test_native_width_complement() {
        type ModeFlags = Flags<Mode>;
        assert_eq!(ModeFlags::width(), 8);
        assert_eq!((!ModeFlags::from_flag(Mode::Low)).to_underlying_type(), 0b1111_1100);
    }

    #[test]
    fn test_equality() {
        let ab = set_of(&[TestFlag::A, TestFlag::B]);
        let bc = set_of(&[TestFlag::B, TestFlag::C]);
        assert_ne!(ab, bc);
        assert_eq!(ab, ab);
        assert_eq!(TestFlags::from_underlying_type(3), ab);
    }

    #[test]
    fn test_multi_bit_enumerator() {
        let flags = Flags::<Mode, 4>::from_underlying_type(0b0110);
        assert!(!flags.test(Mode::Low));
        assert!(!flags.test(Mode::High));
        assert!(flags.test(Mode::Off));

        let flags = Flags::<Mode, 4>::from_underlying_type(0b0111);
        assert!(flags.test(Mode::Low));
        assert_eq!((!flags).to_underlying_type(), 0b1000);
    }

    #[test]
    fn test_reset_masks_to_width() {
        let mut flags = Flags::<Mode, 4>::from_flag(Mode::High);
        flags.reset(Mode::Low);
        assert_eq!(flags.to_underlying_type(), 0b1100);
    }

    #[test]
    fn test_enumerator_operators() {
        let a = TestFlags::from_flag(TestFlag::A);
        let ab = set_of(&[TestFlag::A, TestFlag::B]);
        assert_eq!(TestFlag::A | TestFlag::A, a);
        assert_eq!(TestFlag::A | TestFlag::B, ab);
        assert_eq!(TestFlag::A & TestFlag::A, a);
        assert_eq!(TestFlag::A & TestFlag::B, TestFlags::new());
        assert_eq!(TestFlag::A ^ TestFlag::A, TestFlags::new());
        assert_eq!(TestFlag::A ^ TestFlag::B, ab);
    }

    #[test]
    fn test_display() {
        assert_eq!(TestFlags::new().to_string(), "000");
        assert_eq!(TestFlags::from_flag(TestFlag::A).to_string(), "001");
        assert_eq!(set_of(&[TestFlag::B, TestFlag::C]).to_string(), "110");
        assert_eq!(format!("{:?}", TestFlags::all()), "Flags(111)");
        assert_eq!(format!("{:>5}", TestFlags::from_flag(TestFlag::B)), "  010");
        assert_eq!(Flags::<Mode>::from_flag(Mode::High).to_string(), "00001100");
    }

    #[test]
    fn test_serde() {
        let flags = set_of(&[TestFlag::A, TestFlag::C]);
        let json = serde_json::to_string(&flags).unwrap();
        assert_eq!(json, "5");

        let restored: TestFlags = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, flags);

        assert!(serde_json::from_str::<TestFlags>("8").is_err());
    }
}
