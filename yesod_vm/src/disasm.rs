// Copyright 2026 the Yesod VM Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Textual rendering of decoded instructions.
//!
//! The format is `mnemonic[.size][.cond][.push] operands`, for example
//! `add.b.ltu x1, x2, lsl #3` or `ja.push x0, #0x0ff0`. Opcode fields with no assigned
//! instruction render as `.op(0xNN)` in place of the mnemonic.

use core::fmt;

use crate::decode::{Branch, General, Immediate, ImmediateBranch, Instruction, ShiftAmount};
use crate::isa::{Cond, OpSize, Opcode, ShiftKind};

struct Mnemonic {
    opcode: u8,
    size: OpSize,
    cond: Cond,
    push: bool,
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Opcode::from_u8(self.opcode) {
            Some(op) => f.write_str(op.mnemonic())?,
            None => write!(f, ".op({:#04x})", self.opcode)?,
        }
        f.write_str(self.size.suffix())?;
        f.write_str(self.cond.suffix())?;
        if self.push {
            f.write_str(".push")?;
        }
        Ok(())
    }
}

fn write_shift(f: &mut fmt::Formatter<'_>, kind: ShiftKind, amount: ShiftAmount) -> fmt::Result {
    if kind == ShiftKind::None {
        return Ok(());
    }
    match amount {
        ShiftAmount::Imm(n) => write!(f, ", {} #{n}", kind.mnemonic()),
        ShiftAmount::Reg(r) => write!(f, ", {} {r}", kind.mnemonic()),
    }
}

impl fmt::Display for General {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = Mnemonic {
            opcode: self.opcode,
            size: self.size,
            cond: self.cond,
            push: false,
        };
        match Opcode::from_u8(self.opcode) {
            Some(Opcode::Nop) => return write!(f, "{m}"),
            Some(Opcode::Hlt) => write!(f, "{m} {}", self.rs)?,
            _ => write!(f, "{m} {}, {}", self.rd, self.rs)?,
        }
        write_shift(f, self.shift, self.amount)
    }
}

impl fmt::Display for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = Mnemonic {
            opcode: self.opcode,
            size: OpSize::Word,
            cond: self.cond,
            push: false,
        };
        write!(f, "{m} {}, #{:#06x}", self.rd, self.imm)?;
        if self.upper {
            f.write_str(", lsl #16")?;
        }
        Ok(())
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = Mnemonic {
            opcode: self.opcode,
            size: self.size,
            cond: self.cond,
            push: self.push,
        };
        write!(f, "{m} {}", self.rs)?;
        write_shift(f, self.shift, self.amount)
    }
}

impl fmt::Display for ImmediateBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = Mnemonic {
            opcode: self.opcode,
            size: OpSize::Word,
            cond: self.cond,
            push: self.push,
        };
        write!(f, "{m} {}, #{:#06x}", self.page, self.imm)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::General(i) => fmt::Display::fmt(i, f),
            Self::Immediate(i) => fmt::Display::fmt(i, f),
            Self::Branch(i) => fmt::Display::fmt(i, f),
            Self::ImmediateBranch(i) => fmt::Display::fmt(i, f),
        }
    }
}
