// Copyright 2026 the Yesod VM Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Instruction word decoding and encoding.
//!
//! Every instruction is one little-endian 32-bit word. Bits 0–1 select the [`Class`] and bits
//! 2–7 hold the opcode; the remaining fields depend on the class:
//!
//! ```text
//! class 1 (00) | rd 8..11 | shift 12..13 | size 14..15 | rs 16..19 | cond 20..22 | shifti 23 | imm 24..28 / reg 24..27
//! class 2 (01) | rd 8..11 | cond 12..14  | uplo 15     | imm 16..31
//! class 3 (10) | rs 8..11 | shift 12..13 | size 14..15 | cond 16..18 | push 19 | shifti 20 | imm 21..25 / reg 21..24
//! class 4 (11) | rp 8..11 | cond 12..14  | push 15     | imm 16..31
//! ```
//!
//! [`decode`] is total: opcode validity is checked at execution time, not here.

#![allow(
    clippy::cast_possible_truncation,
    reason = "bit fields are masked to their width before narrowing"
)]

use crate::isa::{Class, Cond, OpSize, Opcode, Reg, ShiftKind};

/// A bit field: offset of the lowest bit and width.
#[derive(Copy, Clone, Debug)]
struct Field {
    lo: u32,
    len: u32,
}

impl Field {
    const fn new(lo: u32, len: u32) -> Self {
        Self { lo, len }
    }

    const fn mask(self) -> u32 {
        if self.len >= 32 {
            u32::MAX
        } else {
            (1 << self.len) - 1
        }
    }

    const fn get(self, word: u32) -> u32 {
        (word >> self.lo) & self.mask()
    }

    const fn put(self, word: u32, value: u32) -> u32 {
        word | ((value & self.mask()) << self.lo)
    }
}

const CLASS: Field = Field::new(0, 2);
const OPCODE: Field = Field::new(2, 6);
const REG_A: Field = Field::new(8, 4);
const SHIFT: Field = Field::new(12, 2);
const SIZE: Field = Field::new(14, 2);
const IMM16: Field = Field::new(16, 16);

const G_RS: Field = Field::new(16, 4);
const G_COND: Field = Field::new(20, 3);
const G_SHIFTI: Field = Field::new(23, 1);
const G_AMOUNT_IMM: Field = Field::new(24, 5);
const G_AMOUNT_REG: Field = Field::new(24, 4);

const I_COND: Field = Field::new(12, 3);
const I_FLAG: Field = Field::new(15, 1);

const B_COND: Field = Field::new(16, 3);
const B_PUSH: Field = Field::new(19, 1);
const B_SHIFTI: Field = Field::new(20, 1);
const B_AMOUNT_IMM: Field = Field::new(21, 5);
const B_AMOUNT_REG: Field = Field::new(21, 4);

/// Source of a shift amount.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ShiftAmount {
    /// A 5-bit immediate.
    Imm(u8),
    /// The low byte of a register.
    Reg(Reg),
}

impl ShiftAmount {
    fn decode(word: u32, shifti: Field, imm: Field, reg: Field) -> Self {
        if shifti.get(word) != 0 {
            Self::Imm(imm.get(word) as u8)
        } else {
            Self::Reg(Reg::from_bits(reg.get(word)))
        }
    }

    fn encode(self, word: u32, shifti: Field, imm: Field, reg: Field) -> u32 {
        match self {
            Self::Imm(v) => imm.put(shifti.put(word, 1), u32::from(v)),
            Self::Reg(r) => reg.put(word, r.bits()),
        }
    }
}

/// Class 1: `op rd, rs[, shift amount]`, operand truncated to `size`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct General {
    /// Raw 6-bit opcode field.
    pub opcode: u8,
    /// Destination register.
    pub rd: Reg,
    /// Shift applied to `rs`.
    pub shift: ShiftKind,
    /// Truncation applied after the shift.
    pub size: OpSize,
    /// Source register.
    pub rs: Reg,
    /// Execution condition.
    pub cond: Cond,
    /// Shift amount.
    pub amount: ShiftAmount,
}

/// Class 2: `op rd, #imm`, with `imm` optionally moved to the upper half.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Immediate {
    /// Raw 6-bit opcode field.
    pub opcode: u8,
    /// Destination register.
    pub rd: Reg,
    /// Execution condition.
    pub cond: Cond,
    /// When set, the operand is `imm << 16`.
    pub upper: bool,
    /// 16-bit immediate.
    pub imm: u16,
}

/// Class 3: branch to a shaped register value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Branch {
    /// Raw 6-bit opcode field.
    pub opcode: u8,
    /// Source register holding the target.
    pub rs: Reg,
    /// Shift applied to `rs`.
    pub shift: ShiftKind,
    /// Truncation applied after the shift.
    pub size: OpSize,
    /// Execution condition.
    pub cond: Cond,
    /// Push the return address before jumping.
    pub push: bool,
    /// Shift amount.
    pub amount: ShiftAmount,
}

/// Class 4: branch to `(page << 16) | imm`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImmediateBranch {
    /// Raw 6-bit opcode field.
    pub opcode: u8,
    /// Register supplying the upper 16 bits of the target.
    pub page: Reg,
    /// Execution condition.
    pub cond: Cond,
    /// Push the return address before jumping.
    pub push: bool,
    /// Lower 16 bits of the target.
    pub imm: u16,
}

/// A decoded instruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// Class 1.
    General(General),
    /// Class 2.
    Immediate(Immediate),
    /// Class 3.
    Branch(Branch),
    /// Class 4.
    ImmediateBranch(ImmediateBranch),
}

/// Decodes an instruction word.
#[must_use]
pub fn decode(word: u32) -> Instruction {
    let opcode = OPCODE.get(word) as u8;
    let reg_a = Reg::from_bits(REG_A.get(word));
    match Class::from_bits(CLASS.get(word)) {
        Class::General => Instruction::General(General {
            opcode,
            rd: reg_a,
            shift: ShiftKind::from_bits(SHIFT.get(word)),
            size: OpSize::from_bits(SIZE.get(word)),
            rs: Reg::from_bits(G_RS.get(word)),
            cond: Cond::from_bits(G_COND.get(word)),
            amount: ShiftAmount::decode(word, G_SHIFTI, G_AMOUNT_IMM, G_AMOUNT_REG),
        }),
        Class::Immediate => Instruction::Immediate(Immediate {
            opcode,
            rd: reg_a,
            cond: Cond::from_bits(I_COND.get(word)),
            upper: I_FLAG.get(word) != 0,
            imm: IMM16.get(word) as u16,
        }),
        Class::Branch => Instruction::Branch(Branch {
            opcode,
            rs: reg_a,
            shift: ShiftKind::from_bits(SHIFT.get(word)),
            size: OpSize::from_bits(SIZE.get(word)),
            cond: Cond::from_bits(B_COND.get(word)),
            push: B_PUSH.get(word) != 0,
            amount: ShiftAmount::decode(word, B_SHIFTI, B_AMOUNT_IMM, B_AMOUNT_REG),
        }),
        Class::ImmediateBranch => Instruction::ImmediateBranch(ImmediateBranch {
            opcode,
            page: reg_a,
            cond: Cond::from_bits(I_COND.get(word)),
            push: I_FLAG.get(word) != 0,
            imm: IMM16.get(word) as u16,
        }),
    }
}

impl Instruction {
    /// Returns the encoding class.
    #[must_use]
    pub const fn class(&self) -> Class {
        match self {
            Self::General(_) => Class::General,
            Self::Immediate(_) => Class::Immediate,
            Self::Branch(_) => Class::Branch,
            Self::ImmediateBranch(_) => Class::ImmediateBranch,
        }
    }

    /// Returns the raw opcode field.
    #[must_use]
    pub const fn opcode_bits(&self) -> u8 {
        match self {
            Self::General(i) => i.opcode,
            Self::Immediate(i) => i.opcode,
            Self::Branch(i) => i.opcode,
            Self::ImmediateBranch(i) => i.opcode,
        }
    }

    /// Returns the opcode, if the field holds an assigned value.
    #[must_use]
    pub const fn opcode(&self) -> Option<Opcode> {
        Opcode::from_u8(self.opcode_bits())
    }

    /// Returns the execution condition.
    #[must_use]
    pub const fn cond(&self) -> Cond {
        match self {
            Self::General(i) => i.cond,
            Self::Immediate(i) => i.cond,
            Self::Branch(i) => i.cond,
            Self::ImmediateBranch(i) => i.cond,
        }
    }

    /// Returns `true` for branches that push the return address.
    #[must_use]
    pub const fn pushes(&self) -> bool {
        match self {
            Self::Branch(i) => i.push,
            Self::ImmediateBranch(i) => i.push,
            Self::General(_) | Self::Immediate(_) => false,
        }
    }

    /// Packs the instruction into its word.
    ///
    /// Fields wider than their slot are masked. Decoding the result yields `self` for any
    /// instruction whose opcode fits in 6 bits; the unused high bits are always zero.
    #[must_use]
    pub fn encode(&self) -> u32 {
        let head = |class: Class, opcode: u8, reg_a: Reg| {
            let w = CLASS.put(0, class as u32);
            let w = OPCODE.put(w, u32::from(opcode));
            REG_A.put(w, reg_a.bits())
        };
        match *self {
            Self::General(i) => {
                let w = head(Class::General, i.opcode, i.rd);
                let w = SHIFT.put(w, i.shift as u32);
                let w = SIZE.put(w, i.size as u32);
                let w = G_RS.put(w, i.rs.bits());
                let w = G_COND.put(w, i.cond as u32);
                i.amount.encode(w, G_SHIFTI, G_AMOUNT_IMM, G_AMOUNT_REG)
            }
            Self::Immediate(i) => {
                let w = head(Class::Immediate, i.opcode, i.rd);
                let w = I_COND.put(w, i.cond as u32);
                let w = I_FLAG.put(w, u32::from(i.upper));
                IMM16.put(w, u32::from(i.imm))
            }
            Self::Branch(i) => {
                let w = head(Class::Branch, i.opcode, i.rs);
                let w = SHIFT.put(w, i.shift as u32);
                let w = SIZE.put(w, i.size as u32);
                let w = B_COND.put(w, i.cond as u32);
                let w = B_PUSH.put(w, u32::from(i.push));
                i.amount.encode(w, B_SHIFTI, B_AMOUNT_IMM, B_AMOUNT_REG)
            }
            Self::ImmediateBranch(i) => {
                let w = head(Class::ImmediateBranch, i.opcode, i.page);
                let w = I_COND.put(w, i.cond as u32);
                let w = I_FLAG.put(w, u32::from(i.push));
                IMM16.put(w, u32::from(i.imm))
            }
        }
    }
}

impl General {
    /// An unconditional, unshifted, word-sized instruction.
    #[must_use]
    pub const fn new(opcode: Opcode, rd: Reg, rs: Reg) -> Self {
        Self {
            opcode: opcode.byte(),
            rd,
            shift: ShiftKind::None,
            size: OpSize::Word,
            rs,
            cond: Cond::Always,
            amount: ShiftAmount::Imm(0),
        }
    }
}

impl Immediate {
    /// An unconditional lower-half immediate instruction.
    #[must_use]
    pub const fn new(opcode: Opcode, rd: Reg, imm: u16) -> Self {
        Self {
            opcode: opcode.byte(),
            rd,
            cond: Cond::Always,
            upper: false,
            imm,
        }
    }
}

impl Branch {
    /// An unconditional, non-pushing branch to the word in `rs`.
    #[must_use]
    pub const fn new(opcode: Opcode, rs: Reg) -> Self {
        Self {
            opcode: opcode.byte(),
            rs,
            shift: ShiftKind::None,
            size: OpSize::Word,
            cond: Cond::Always,
            push: false,
            amount: ShiftAmount::Imm(0),
        }
    }
}

impl ImmediateBranch {
    /// An unconditional, non-pushing branch to `(page << 16) | imm`.
    #[must_use]
    pub const fn new(opcode: Opcode, page: Reg, imm: u16) -> Self {
        Self {
            opcode: opcode.byte(),
            page,
            cond: Cond::Always,
            push: false,
            imm,
        }
    }
}

impl From<General> for Instruction {
    fn from(i: General) -> Self {
        Self::General(i)
    }
}

impl From<Immediate> for Instruction {
    fn from(i: Immediate) -> Self {
        Self::Immediate(i)
    }
}

impl From<Branch> for Instruction {
    fn from(i: Branch) -> Self {
        Self::Branch(i)
    }
}

impl From<ImmediateBranch> for Instruction {
    fn from(i: ImmediateBranch) -> Self {
        Self::ImmediateBranch(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(n: u8) -> Reg {
        Reg::new(n).unwrap()
    }

    #[test]
    fn class_is_selected_by_low_bits() {
        assert_eq!(decode(0x0000_0000).class(), Class::General);
        assert_eq!(decode(0x0000_0001).class(), Class::Immediate);
        assert_eq!(decode(0xFFFF_FFFE).class(), Class::Branch);
        assert_eq!(decode(0xFFFF_FFFF).class(), Class::ImmediateBranch);
    }

    #[test]
    fn general_fields_at_fixed_offsets() {
        // add.b.ltu x3, x9, lsr #17
        let word = 0b00
            | (0x02 << 2)
            | (3 << 8)
            | (0b10 << 12)
            | (0b11 << 14)
            | (9 << 16)
            | (0b010 << 20)
            | (1 << 23)
            | (17 << 24);
        let Instruction::General(g) = decode(word) else {
            panic!("expected class 1");
        };
        assert_eq!(g.opcode, Opcode::Add.byte());
        assert_eq!(g.rd, r(3));
        assert_eq!(g.shift, ShiftKind::Lsr);
        assert_eq!(g.size, OpSize::Byte);
        assert_eq!(g.rs, r(9));
        assert_eq!(g.cond, Cond::LessUnsigned);
        assert_eq!(g.amount, ShiftAmount::Imm(17));
    }

    #[test]
    fn shifti_selects_amount_width() {
        // Bit 28 belongs to the immediate but not to the register index.
        let base = (1 << 8) | (2 << 16) | (0b1_0101 << 24);
        let Instruction::General(reg) = decode(base) else {
            panic!("expected class 1");
        };
        assert_eq!(reg.amount, ShiftAmount::Reg(r(0b0101)));
        let Instruction::General(imm) = decode(base | (1 << 23)) else {
            panic!("expected class 1");
        };
        assert_eq!(imm.amount, ShiftAmount::Imm(0b1_0101));

        let base = 0b10 | (0b1_0011 << 21);
        let Instruction::Branch(reg) = decode(base) else {
            panic!("expected class 3");
        };
        assert_eq!(reg.amount, ShiftAmount::Reg(r(0b0011)));
        let Instruction::Branch(imm) = decode(base | (1 << 20)) else {
            panic!("expected class 3");
        };
        assert_eq!(imm.amount, ShiftAmount::Imm(0b1_0011));
    }

    #[test]
    fn immediate_fields() {
        let word = 0b01 | (0x01 << 2) | (7 << 8) | (0b111 << 12) | (1 << 15) | (0xBEEF << 16);
        assert_eq!(
            decode(word),
            Instruction::Immediate(Immediate {
                opcode: Opcode::Mov.byte(),
                rd: r(7),
                cond: Cond::GreaterEqualSigned,
                upper: true,
                imm: 0xBEEF,
            })
        );
    }

    #[test]
    fn branch_fields() {
        let word = 0b10
            | (0x0B << 2)
            | (12 << 8)
            | (0b01 << 12)
            | (0b10 << 14)
            | (0b100 << 16)
            | (1 << 19)
            | (5 << 21);
        assert_eq!(
            decode(word),
            Instruction::Branch(Branch {
                opcode: Opcode::Jr.byte(),
                rs: r(12),
                shift: ShiftKind::Lsl,
                size: OpSize::Half,
                cond: Cond::Equal,
                push: true,
                amount: ShiftAmount::Reg(r(5)),
            })
        );
    }

    #[test]
    fn immediate_branch_fields() {
        let word = 0b11 | (0x0A << 2) | (4 << 8) | (0b001 << 12) | (1 << 15) | (0x1234 << 16);
        assert_eq!(
            decode(word),
            Instruction::ImmediateBranch(ImmediateBranch {
                opcode: Opcode::Ja.byte(),
                page: r(4),
                cond: Cond::NotEqual,
                push: true,
                imm: 0x1234,
            })
        );
    }

    #[test]
    fn unassigned_opcodes_still_decode() {
        let word = 0x3F << 2;
        let instr = decode(word);
        assert_eq!(instr.opcode_bits(), 0x3F);
        assert_eq!(instr.opcode(), None);
    }

    #[test]
    fn decode_is_deterministic() {
        let mut w: u32 = 0x1234_5678;
        for _ in 0..1000 {
            assert_eq!(decode(w), decode(w));
            w = w.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        }
    }

    #[test]
    fn encode_inverts_decode_for_canonical_words() {
        // Words with the unused high bits clear are reproduced exactly.
        let samples = [
            General::new(Opcode::Hlt, r(0), r(1)).into(),
            Instruction::General(General {
                amount: ShiftAmount::Reg(r(6)),
                shift: ShiftKind::Asr,
                ..General::new(Opcode::Sub, r(2), r(3))
            }),
            Immediate::new(Opcode::Mov, r(1), 5).into(),
            Branch::new(Opcode::Ja, r(8)).into(),
            ImmediateBranch::new(Opcode::Jr, r(0), 0xFFFC).into(),
        ];
        for instr in samples {
            let instr: Instruction = instr;
            assert_eq!(decode(instr.encode()), instr);
        }
    }
}
