// Copyright 2026 the Yesod VM Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Execution tracing hooks.
//!
//! A [`TraceSink`] receives callbacks from [`crate::vm::Vm::run_traced`]. The run loop asks the
//! sink for its [`TraceMask`] once per run and skips every event class the mask leaves out, so a
//! sink that only wants call scopes pays nothing per instruction.
//!
//! Call scopes are inferred from the stack: a taken branch with the push bit opens a scope, and
//! the scope closes once SP falls back to or below its value before the push. Scopes still open
//! when the run stops are closed, innermost first, before `run_end`.

use crate::decode::Instruction;
use crate::machine::Machine;
use crate::vm::FaultInfo;

/// Event classes a sink subscribes to.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TraceMask(u32);

impl TraceMask {
    /// No events.
    pub const NONE: Self = Self(0);
    /// `run_start` and `run_end`.
    pub const RUN: Self = Self(1 << 0);
    /// `instr`, once per executed instruction.
    pub const INSTR: Self = Self(1 << 1);
    /// `scope_enter` and `scope_exit` for calls.
    pub const CALL: Self = Self(1 << 2);
    /// Every event class.
    pub const ALL: Self = Self(Self::RUN.0 | Self::INSTR.0 | Self::CALL.0);

    /// Returns `true` if every bit in `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Returns `true` if no bits are set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl core::ops::BitOr for TraceMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl core::ops::BitOrAssign for TraceMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// The kind of a traced scope.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// A call made by a pushing branch.
    Call {
        /// Address jumped to.
        target: u32,
        /// Address pushed on the stack.
        return_pc: u32,
    },
}

/// Receiver of execution events.
///
/// Every method defaults to a no-op.
pub trait TraceSink {
    /// Event classes this sink wants.
    fn mask(&self) -> TraceMask {
        TraceMask::NONE
    }

    /// Called before the first instruction of a run.
    fn run_start(&mut self, _machine: &Machine) {}

    /// Called before executing the instruction `word` fetched at `pc`.
    ///
    /// `machine` is observed before the cycle's bookkeeping, so `machine.pc() == pc`.
    fn instr(&mut self, _machine: &Machine, _pc: u32, _word: u32, _instr: &Instruction) {}

    /// Called after a pushing branch is taken. `depth` is the number of enclosing open calls.
    fn scope_enter(&mut self, _machine: &Machine, _kind: ScopeKind, _depth: usize) {}

    /// Called when a scope closes, with the same `kind` and `depth` it was entered with.
    fn scope_exit(&mut self, _machine: &Machine, _kind: ScopeKind, _depth: usize) {}

    /// Called once the run stops.
    fn run_end(&mut self, _machine: &Machine, _outcome: &Result<u32, FaultInfo>) {}
}

impl TraceSink for () {}
