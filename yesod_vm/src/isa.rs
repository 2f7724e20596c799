// Copyright 2026 the Yesod VM Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Architectural constants and field enumerations for the Yesod instruction set.
//!
//! Every enumeration here that mirrors a bit field is total over its field width: any bit
//! pattern maps to some variant. Opcodes are the exception; the 6-bit opcode field leaves most
//! patterns unassigned, so [`Opcode::from_u8`] is partial and the execution engine rejects the
//! rest.

#![allow(
    clippy::cast_possible_truncation,
    reason = "bit fields are masked to their width before narrowing"
)]

use core::fmt;

/// Number of architectural registers.
pub const REG_COUNT: usize = 16;

/// Image/engine version this crate implements.
pub const VERSION: u8 = 0;

/// A 4-bit register index (`x0..x15`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reg(u8);

impl Reg {
    /// Scratch register, reset to zero at the start of every cycle.
    pub const ZERO: Self = Self(0);
    /// Program counter.
    pub const PC: Self = Self(14);
    /// Stack pointer.
    pub const SP: Self = Self(15);

    /// Returns the register with index `index`, or `None` if it is not in `0..16`.
    #[must_use]
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < REG_COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Builds a register from a 4-bit field, ignoring higher bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self((bits & 0xF) as u8)
    }

    /// Returns the register index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the 4-bit field value.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0 as u32
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::PC => f.write_str("pc"),
            Self::SP => f.write_str("sp"),
            Self(n) => write!(f, "x{n}"),
        }
    }
}

/// The four instruction encodings, selected by bits 0–1 of the word.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Class {
    /// Register-sourced ALU and memory instructions.
    General = 0b00,
    /// ALU and memory instructions with a 16-bit immediate.
    Immediate = 0b01,
    /// Register-sourced branches.
    Branch = 0b10,
    /// Branches to `(page << 16) | imm`.
    ImmediateBranch = 0b11,
}

impl Class {
    /// Decodes the two class bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0b00 => Self::General,
            0b01 => Self::Immediate,
            0b10 => Self::Branch,
            _ => Self::ImmediateBranch,
        }
    }

    /// Returns the class number used in documentation (1 through 4).
    #[must_use]
    pub const fn number(self) -> u8 {
        self as u8 + 1
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class {}", self.number())
    }
}

/// Opcode values for the 6-bit opcode field.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// No operation.
    Nop = 0x00,
    /// Register move.
    Mov = 0x01,
    /// Addition.
    Add = 0x02,
    /// Subtraction.
    Sub = 0x03,
    /// Bitwise and.
    And = 0x04,
    /// Bitwise or.
    Or = 0x05,
    /// Bitwise exclusive or.
    Xor = 0x06,
    /// Byte load from `x`.
    Car = 0x07,
    /// Byte load from `x + 4`.
    Cdr = 0x08,
    /// Byte store to the address in the destination register.
    Str = 0x09,
    /// Absolute jump.
    Ja = 0x0A,
    /// Relative jump.
    Jr = 0x0B,
    /// Halt with an exit code.
    Hlt = 0x0C,
    /// Compare (subtract into `x0`).
    Cmp = 0x0D,
}

impl Opcode {
    /// Width of the opcode field in bits.
    pub const BITS: u32 = 6;

    /// Returns the opcode byte value.
    #[must_use]
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Parses an opcode from its field value.
    #[must_use]
    pub const fn from_u8(b: u8) -> Option<Self> {
        Some(match b {
            0x00 => Self::Nop,
            0x01 => Self::Mov,
            0x02 => Self::Add,
            0x03 => Self::Sub,
            0x04 => Self::And,
            0x05 => Self::Or,
            0x06 => Self::Xor,
            0x07 => Self::Car,
            0x08 => Self::Cdr,
            0x09 => Self::Str,
            0x0A => Self::Ja,
            0x0B => Self::Jr,
            0x0C => Self::Hlt,
            0x0D => Self::Cmp,
            _ => return None,
        })
    }

    /// Lowercase assembly mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Nop => "nop",
            Self::Mov => "mov",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::Car => "car",
            Self::Cdr => "cdr",
            Self::Str => "str",
            Self::Ja => "ja",
            Self::Jr => "jr",
            Self::Hlt => "hlt",
            Self::Cmp => "cmp",
        }
    }

    /// Returns `true` if `class` defines this opcode.
    #[must_use]
    pub const fn is_valid_for(self, class: Class) -> bool {
        match class {
            Class::General => !matches!(self, Self::Ja | Self::Jr),
            Class::Immediate => !matches!(self, Self::Nop | Self::Hlt | Self::Ja | Self::Jr),
            Class::Branch | Class::ImmediateBranch => matches!(self, Self::Ja | Self::Jr),
        }
    }
}

/// Shift applied to the source operand of class 1 and class 3 instructions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ShiftKind {
    /// No shift.
    None = 0b00,
    /// Logical shift left.
    Lsl = 0b01,
    /// Logical shift right.
    Lsr = 0b10,
    /// Arithmetic (sign-extending) shift right.
    Asr = 0b11,
}

impl ShiftKind {
    /// Decodes a 2-bit shift field.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0b00 => Self::None,
            0b01 => Self::Lsl,
            0b10 => Self::Lsr,
            _ => Self::Asr,
        }
    }

    /// Lowercase assembly spelling.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Lsl => "lsl",
            Self::Lsr => "lsr",
            Self::Asr => "asr",
        }
    }
}

/// Operand truncation size.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpSize {
    /// 32 bits.
    Word = 0b00,
    /// 24 bits.
    Day = 0b01,
    /// 16 bits.
    Half = 0b10,
    /// 8 bits.
    Byte = 0b11,
}

impl OpSize {
    /// Decodes a 2-bit size field.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0b00 => Self::Word,
            0b01 => Self::Day,
            0b10 => Self::Half,
            _ => Self::Byte,
        }
    }

    /// Mask retaining the low bits of this size.
    #[must_use]
    pub const fn mask(self) -> u32 {
        match self {
            Self::Word => 0xFFFF_FFFF,
            Self::Day => 0x00FF_FFFF,
            Self::Half => 0x0000_FFFF,
            Self::Byte => 0x0000_00FF,
        }
    }

    /// Mnemonic suffix (empty for words).
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Word => "",
            Self::Day => ".d",
            Self::Half => ".h",
            Self::Byte => ".b",
        }
    }
}

/// Condition gating an instruction's execution.
///
/// The names are historical; note that [`Cond::NotEqual`] holds when the zero
/// flag is *set* and [`Cond::Equal`] when it is clear.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Cond {
    /// Always execute.
    Always = 0b000,
    /// Zero flag set.
    NotEqual = 0b001,
    /// Carry flag set.
    LessUnsigned = 0b010,
    /// Carry flag clear.
    GreaterEqualUnsigned = 0b011,
    /// Zero flag clear.
    Equal = 0b100,
    /// Unassigned pattern; executes unconditionally.
    Unassigned = 0b101,
    /// Overflow flag clear.
    LessSigned = 0b110,
    /// Overflow flag set.
    GreaterEqualSigned = 0b111,
}

impl Cond {
    /// Decodes a 3-bit condition field.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0b111 {
            0b000 => Self::Always,
            0b001 => Self::NotEqual,
            0b010 => Self::LessUnsigned,
            0b011 => Self::GreaterEqualUnsigned,
            0b100 => Self::Equal,
            0b101 => Self::Unassigned,
            0b110 => Self::LessSigned,
            _ => Self::GreaterEqualSigned,
        }
    }

    /// Mnemonic suffix (empty for unconditional patterns).
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Always | Self::Unassigned => "",
            Self::NotEqual => ".ne",
            Self::LessUnsigned => ".ltu",
            Self::GreaterEqualUnsigned => ".geu",
            Self::Equal => ".eq",
            Self::LessSigned => ".lts",
            Self::GreaterEqualSigned => ".ges",
        }
    }
}
