// Copyright 2026 the Yesod VM Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The condition flag byte.
//!
//! Flags are sticky: operations only ever OR bits in. The byte returns to zero only when the
//! machine is reset or a program is loaded.

use core::fmt;

use crate::isa::Cond;

/// The machine's flag byte.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Flags(u8);

impl core::ops::BitOr for Flags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl core::ops::BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl Flags {
    /// No flags.
    pub const NONE: Self = Self(0);
    /// Result was zero.
    pub const ZERO: Self = Self(1 << 0);
    /// Unsigned carry (approximate, see [`crate::exec`]).
    pub const CARRY: Self = Self(1 << 1);
    /// Result had its high bit set.
    pub const SIGN: Self = Self(1 << 2);
    /// Signed overflow.
    pub const OVERFLOW: Self = Self(1 << 3);

    /// Builds flags from a raw byte. Bits 4–7 are reserved and kept as given.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Returns the raw byte.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns `true` if every bit in `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// ORs in `other`.
    pub fn raise(&mut self, other: Self) {
        *self |= other;
    }

    /// Evaluates `cond` against these flags.
    #[must_use]
    pub const fn check(self, cond: Cond) -> bool {
        match cond {
            Cond::Always | Cond::Unassigned => true,
            Cond::NotEqual => self.contains(Self::ZERO),
            Cond::Equal => !self.contains(Self::ZERO),
            Cond::LessUnsigned => self.contains(Self::CARRY),
            Cond::GreaterEqualUnsigned => !self.contains(Self::CARRY),
            Cond::LessSigned => !self.contains(Self::OVERFLOW),
            Cond::GreaterEqualSigned => self.contains(Self::OVERFLOW),
        }
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, letter) in [
            (Self::ZERO, 'Z'),
            (Self::CARRY, 'C'),
            (Self::SIGN, 'S'),
            (Self::OVERFLOW, 'O'),
        ] {
            let c = if self.contains(flag) { letter } else { '-' };
            fmt::Write::write_char(f, c)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_positions_match_the_encoding() {
        assert_eq!(Flags::ZERO.bits(), 0b0001);
        assert_eq!(Flags::CARRY.bits(), 0b0010);
        assert_eq!(Flags::SIGN.bits(), 0b0100);
        assert_eq!(Flags::OVERFLOW.bits(), 0b1000);
    }

    #[test]
    fn equality_conditions_are_inverted() {
        let zero = Flags::ZERO;
        assert!(zero.check(Cond::NotEqual));
        assert!(!zero.check(Cond::Equal));
        assert!(!Flags::NONE.check(Cond::NotEqual));
        assert!(Flags::NONE.check(Cond::Equal));
    }

    #[test]
    fn each_condition_reads_one_flag() {
        let none = Flags::NONE;
        let all = Flags::ZERO | Flags::CARRY | Flags::SIGN | Flags::OVERFLOW;
        assert!(none.check(Cond::Always) && all.check(Cond::Always));
        assert!(none.check(Cond::Unassigned) && all.check(Cond::Unassigned));
        assert!(Flags::CARRY.check(Cond::LessUnsigned));
        assert!(!none.check(Cond::LessUnsigned));
        assert!(none.check(Cond::GreaterEqualUnsigned));
        assert!(!Flags::CARRY.check(Cond::GreaterEqualUnsigned));
        assert!(none.check(Cond::LessSigned));
        assert!(!Flags::OVERFLOW.check(Cond::LessSigned));
        assert!(Flags::OVERFLOW.check(Cond::GreaterEqualSigned));
        // The sign flag gates nothing.
        assert!(!Flags::SIGN.check(Cond::GreaterEqualSigned));
    }

    #[test]
    fn raise_never_clears() {
        let mut f = Flags::SIGN;
        f.raise(Flags::CARRY);
        f.raise(Flags::NONE);
        assert!(f.contains(Flags::SIGN | Flags::CARRY));
    }

    #[test]
    fn display_letters() {
        assert_eq!(alloc::format!("{}", Flags::ZERO | Flags::OVERFLOW), "Z--O");
        assert_eq!(alloc::format!("{}", Flags::NONE), "----");
    }
}
