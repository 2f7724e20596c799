// Copyright 2026 the Yesod VM Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The execution engine.
//!
//! [`execute`] applies one decoded instruction to a [`Machine`]. It assumes the cycle driver has
//! already reset `x0` and advanced PC past the instruction (see [`crate::vm::step`]).
//!
//! Flag rules of the architecture, kept exactly:
//! - flags are only ever raised, never cleared;
//! - `add` raises carry only when both operands exceed `0x7FFF_FFFF`, which misses carries such
//!   as `0xFFFF_FFFF + 1`;
//! - `sub` raises carry when the operand is strictly below the destination.

use core::fmt;

use crate::decode::{Branch, General, Immediate, ImmediateBranch, Instruction, ShiftAmount};
use crate::flags::Flags;
use crate::isa::{Class, OpSize, Opcode, Reg, ShiftKind};
use crate::machine::Machine;
use crate::memory::OutOfBounds;

/// Lowest address of the stack region.
pub const STACK_BASE: u32 = 0;

const SIGN_BIT: u32 = 1 << 31;
const HALF_U32: u32 = u32::MAX >> 1;

/// A run-time fault. Faults stop the machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fault {
    /// The opcode is not defined for the instruction's class.
    UnsupportedOpcode {
        /// Encoding class of the instruction.
        class: Class,
        /// Raw opcode field.
        opcode: u8,
    },
    /// A push found the stack region full.
    StackOverflow {
        /// Stack pointer at the time of the push.
        sp: u32,
    },
    /// A fetch, load or store addressed memory outside the machine.
    MemoryOutOfBounds {
        /// Rejected address.
        addr: u32,
    },
    /// The run loop's cycle budget ran out.
    CycleLimitExceeded,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedOpcode { class, opcode } => {
                write!(f, "unsupported opcode {opcode:#04x} for {class}")
            }
            Self::StackOverflow { sp } => write!(f, "stack overflow (sp={sp:#010x})"),
            Self::MemoryOutOfBounds { addr } => {
                write!(f, "memory access out of bounds at {addr:#010x}")
            }
            Self::CycleLimitExceeded => write!(f, "cycle limit exceeded"),
        }
    }
}

impl core::error::Error for Fault {}

impl From<OutOfBounds> for Fault {
    fn from(e: OutOfBounds) -> Self {
        Self::MemoryOutOfBounds { addr: e.addr }
    }
}

/// Outcome of executing one instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Keep running.
    Continue,
    /// `hlt` executed with this exit code.
    Halt(u32),
    /// The instruction faulted.
    Fault(Fault),
}

impl Step {
    /// Returns the classic single-integer encoding of this outcome: `0` to
    /// continue, the exit code for a halt, `1` for any fault.
    ///
    /// The encoding is lossy: `hlt` with code 0 or 1 is indistinguishable from continuing or
    /// faulting.
    #[must_use]
    pub fn exit_code(&self) -> u32 {
        match self {
            Self::Continue => 0,
            Self::Halt(code) => *code,
            Self::Fault(_) => 1,
        }
    }

    /// Returns `true` for [`Step::Continue`].
    #[must_use]
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }
}

/// Shifts `x` by `amount` bits.
///
/// Logical shifts by 32 or more produce 0; arithmetic shifts by 32 or more produce the sign fill.
#[must_use]
pub fn shift(x: u32, kind: ShiftKind, amount: u8) -> u32 {
    let s = u32::from(amount);
    match kind {
        ShiftKind::None => x,
        ShiftKind::Lsl => x.checked_shl(s).unwrap_or(0),
        ShiftKind::Lsr => x.checked_shr(s).unwrap_or(0),
        ShiftKind::Asr => (x.cast_signed() >> s.min(31)).cast_unsigned(),
    }
}

/// Truncates `x` to `size` (masking, no sign extension).
#[must_use]
pub const fn fit(x: u32, size: OpSize) -> u32 {
    x & size.mask()
}

/// Returns `true` if `a + b` overflows as signed 32-bit arithmetic.
#[must_use]
pub fn add_overflows(a: u32, b: u32) -> bool {
    let (a, b) = (a.cast_signed(), b.cast_signed());
    i64::from(a) + i64::from(b) != i64::from(a.wrapping_add(b))
}

/// Returns `true` if `a - b` overflows as signed 32-bit arithmetic.
#[must_use]
pub fn sub_overflows(a: u32, b: u32) -> bool {
    let (a, b) = (a.cast_signed(), b.cast_signed());
    i64::from(a) - i64::from(b) != i64::from(a.wrapping_sub(b))
}

/// The machine's carry rule for `a + b`.
#[must_use]
pub const fn add_carries(a: u32, b: u32) -> bool {
    a > HALF_U32 && b > HALF_U32
}

/// The machine's carry rule for `a - b`.
#[must_use]
pub const fn sub_carries(a: u32, b: u32) -> bool {
    b < a
}

/// Zero and sign flags for a result value.
#[must_use]
pub const fn result_flags(v: u32) -> Flags {
    let zero = if v == 0 { Flags::ZERO.bits() } else { 0 };
    let sign = if v & SIGN_BIT != 0 {
        Flags::SIGN.bits()
    } else {
        0
    };
    Flags::from_bits(zero | sign)
}

/// Pushes `value` as a little-endian word at SP and advances SP by 4.
pub fn push(m: &mut Machine, value: u32) -> Result<(), Fault> {
    let sp = m.sp();
    if sp.wrapping_sub(STACK_BASE) > m.stack_size() {
        return Err(Fault::StackOverflow { sp });
    }
    m.memory_mut().write_u32_le(sp, value)?;
    m.set_reg(Reg::SP, sp.wrapping_add(4));
    Ok(())
}

/// Executes `instr` against `m`.
///
/// A false condition makes the instruction a no-op.
pub fn execute(m: &mut Machine, instr: &Instruction) -> Step {
    if !m.flags().check(instr.cond()) {
        return Step::Continue;
    }
    let outcome = match *instr {
        Instruction::General(i) => exec_general(m, i),
        Instruction::Immediate(i) => exec_immediate(m, i),
        Instruction::Branch(i) => exec_branch(m, i),
        Instruction::ImmediateBranch(i) => exec_immediate_branch(m, i),
    };
    outcome.unwrap_or_else(Step::Fault)
}

fn unsupported(class: Class, opcode: u8) -> Fault {
    Fault::UnsupportedOpcode { class, opcode }
}

/// Resolves a raw opcode field to an opcode `class` defines.
fn opcode(class: Class, raw: u8) -> Result<Opcode, Fault> {
    Opcode::from_u8(raw)
        .filter(|op| op.is_valid_for(class))
        .ok_or_else(|| unsupported(class, raw))
}

fn shaped(m: &Machine, rs: Reg, kind: ShiftKind, amount: ShiftAmount, size: OpSize) -> u32 {
    let amount = match amount {
        ShiftAmount::Imm(v) => v,
        ShiftAmount::Reg(r) => m.reg(r).to_le_bytes()[0],
    };
    fit(shift(m.reg(rs), kind, amount), size)
}

fn exec_general(m: &mut Machine, i: General) -> Result<Step, Fault> {
    let x = shaped(m, i.rs, i.shift, i.amount, i.size);
    match opcode(Class::General, i.opcode)? {
        Opcode::Nop => Ok(Step::Continue),
        Opcode::Hlt => Ok(Step::Halt(x)),
        op => {
            alu(m, op, i.rd, x)?;
            Ok(Step::Continue)
        }
    }
}

fn exec_immediate(m: &mut Machine, i: Immediate) -> Result<Step, Fault> {
    let x = if i.upper {
        u32::from(i.imm) << 16
    } else {
        u32::from(i.imm)
    };
    let op = opcode(Class::Immediate, i.opcode)?;
    alu(m, op, i.rd, x)?;
    Ok(Step::Continue)
}

fn exec_branch(m: &mut Machine, i: Branch) -> Result<Step, Fault> {
    let target = shaped(m, i.rs, i.shift, i.amount, i.size);
    jump(m, Class::Branch, i.opcode, i.push, target)
}

fn exec_immediate_branch(m: &mut Machine, i: ImmediateBranch) -> Result<Step, Fault> {
    let target = (m.reg(i.page) << 16) | u32::from(i.imm);
    jump(m, Class::ImmediateBranch, i.opcode, i.push, target)
}

fn jump(
    m: &mut Machine,
    class: Class,
    raw: u8,
    push_pc: bool,
    target: u32,
) -> Result<Step, Fault> {
    // The push precedes opcode validation.
    if push_pc {
        let pc = m.pc();
        push(m, pc)?;
    }
    if opcode(class, raw)? == Opcode::Ja {
        m.set_pc(target);
    } else {
        // Jr. PC already points past this instruction.
        m.set_pc(m.pc().wrapping_add(target).wrapping_sub(4));
    }
    Ok(Step::Continue)
}

fn write_result(m: &mut Machine, rd: Reg, v: u32) {
    m.set_reg(rd, v);
    m.raise_flags(result_flags(v));
}

fn sub_into(m: &mut Machine, rd: Reg, x: u32) {
    let cur = m.reg(rd);
    if sub_overflows(cur, x) {
        m.raise_flags(Flags::OVERFLOW);
    }
    if sub_carries(cur, x) {
        m.raise_flags(Flags::CARRY);
    }
    write_result(m, rd, cur.wrapping_sub(x));
}

/// Register/memory operations shared by classes 1 and 2.
///
/// Callers have already rejected opcodes the class leaves undefined.
fn alu(m: &mut Machine, op: Opcode, rd: Reg, x: u32) -> Result<(), Fault> {
    let cur = m.reg(rd);
    match op {
        Opcode::Mov => write_result(m, rd, x),
        Opcode::Add => {
            if add_overflows(cur, x) {
                m.raise_flags(Flags::OVERFLOW);
            }
            if add_carries(cur, x) {
                m.raise_flags(Flags::CARRY);
            }
            write_result(m, rd, cur.wrapping_add(x));
        }
        Opcode::Sub => sub_into(m, rd, x),
        Opcode::And => write_result(m, rd, cur & x),
        Opcode::Or => write_result(m, rd, cur | x),
        Opcode::Xor => write_result(m, rd, cur ^ x),
        Opcode::Car => {
            let b = m.memory().read_u8(x)?;
            write_result(m, rd, u32::from(b));
        }
        Opcode::Cdr => {
            let b = m.memory().read_u8(x.wrapping_add(4))?;
            write_result(m, rd, u32::from(b));
        }
        Opcode::Str => m.memory_mut().write_u8(cur, x.to_le_bytes()[0])?,
        Opcode::Cmp => {
            m.set_reg(Reg::ZERO, cur);
            sub_into(m, Reg::ZERO, x);
        }
        Opcode::Nop | Opcode::Hlt | Opcode::Ja | Opcode::Jr => {}
    }
    Ok(())
}
