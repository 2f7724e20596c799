// Copyright 2026 the Yesod VM Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The fetch/decode/execute cycle and the run loop.

use alloc::vec::Vec;
use core::fmt;

use crate::decode::{Instruction, decode};
use crate::exec::{Fault, Step, execute};
use crate::image::{Image, LoadError};
use crate::isa::Reg;
use crate::machine::{Machine, MachineConfig};
use crate::trace::{ScopeKind, TraceMask, TraceSink};

/// Reads the instruction word at `pc`.
pub fn fetch(m: &Machine, pc: u32) -> Result<u32, Fault> {
    Ok(m.memory().read_u32_le(pc)?)
}

// The first half of a cycle: an instruction fetched and decoded at `pc`.
struct Fetched {
    pc: u32,
    word: u32,
    instr: Instruction,
}

fn fetch_decode(m: &Machine) -> Result<Fetched, Fault> {
    let pc = m.pc();
    let word = fetch(m, pc)?;
    Ok(Fetched {
        pc,
        word,
        instr: decode(word),
    })
}

// The second half: reset `x0`, advance PC past the instruction, execute.
fn retire(m: &mut Machine, fetched: &Fetched) -> Step {
    m.set_reg(Reg::ZERO, 0);
    m.set_pc(fetched.pc.wrapping_add(4));
    execute(m, &fetched.instr)
}

/// Runs one cycle: fetch at PC, decode, reset `x0`, advance PC by 4, execute.
///
/// A failed fetch faults before any state changes.
pub fn step(m: &mut Machine) -> Step {
    match fetch_decode(m) {
        Ok(fetched) => retire(m, &fetched),
        Err(fault) => Step::Fault(fault),
    }
}

/// Run-loop limits.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Limits {
    /// Maximum number of instructions a single run may execute. `None` is unlimited.
    pub max_cycles: Option<u64>,
}

/// A fault annotated with where it happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FaultInfo {
    /// Address of the faulting instruction.
    pub pc: u32,
    /// What went wrong.
    pub fault: Fault,
}

impl fmt::Display for FaultInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fault at pc={:#010x}: {}", self.pc, self.fault)
    }
}

impl core::error::Error for FaultInfo {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        Some(&self.fault)
    }
}

#[derive(Copy, Clone, Debug)]
struct CallFrame {
    kind: ScopeKind,
    sp_before: u32,
}

/// A machine together with its run-loop state.
#[derive(Clone, Debug)]
pub struct Vm {
    machine: Machine,
    limits: Limits,
    cycles: u64,
    calls: Vec<CallFrame>,
}

impl Vm {
    /// Wraps an already loaded machine.
    #[must_use]
    pub fn new(machine: Machine, limits: Limits) -> Self {
        Self {
            machine,
            limits,
            cycles: 0,
            calls: Vec::new(),
        }
    }

    /// Allocates a machine and loads `image` into it.
    pub fn with_image(
        config: MachineConfig,
        image: &Image,
        limits: Limits,
    ) -> Result<Self, LoadError> {
        Ok(Self::new(Machine::with_image(config, image)?, limits))
    }

    /// Returns the machine.
    #[must_use]
    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    /// Returns the machine mutably.
    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }

    /// Consumes the VM and returns its machine.
    #[must_use]
    pub fn into_machine(self) -> Machine {
        self.machine
    }

    /// Returns the run limits.
    #[must_use]
    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Total instructions executed by this VM across all runs.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Runs until `hlt` or a fault and returns the exit code.
    ///
    /// Every `hlt` stops the run, including `hlt` with code 0.
    pub fn run(&mut self) -> Result<u32, FaultInfo> {
        self.run_traced(&mut ())
    }

    /// Like [`Vm::run`], reporting events to `trace`.
    pub fn run_traced<T: TraceSink + ?Sized>(&mut self, trace: &mut T) -> Result<u32, FaultInfo> {
        let mask = trace.mask();
        if mask.contains(TraceMask::RUN) {
            trace.run_start(&self.machine);
        }

        let mut executed: u64 = 0;
        let outcome = loop {
            let pc = self.machine.pc();
            if self.limits.max_cycles.is_some_and(|max| executed >= max) {
                break Err(FaultInfo {
                    pc,
                    fault: Fault::CycleLimitExceeded,
                });
            }
            let fetched = match fetch_decode(&self.machine) {
                Ok(fetched) => fetched,
                Err(fault) => break Err(FaultInfo { pc, fault }),
            };
            if mask.contains(TraceMask::INSTR) {
                trace.instr(&self.machine, pc, fetched.word, &fetched.instr);
            }

            let sp_before = self.machine.sp();
            let step = retire(&mut self.machine, &fetched);
            executed += 1;
            self.cycles += 1;

            match step {
                Step::Continue => {
                    if mask.contains(TraceMask::CALL) {
                        self.track_calls(trace, &fetched.instr, sp_before);
                    }
                }
                Step::Halt(code) => break Ok(code),
                Step::Fault(fault) => break Err(FaultInfo { pc, fault }),
            }
        };

        if mask.contains(TraceMask::CALL) {
            while let Some(frame) = self.calls.pop() {
                trace.scope_exit(&self.machine, frame.kind, self.calls.len());
            }
        }
        if mask.contains(TraceMask::RUN) {
            trace.run_end(&self.machine, &outcome);
        }
        outcome
    }

    fn track_calls<T: TraceSink + ?Sized>(
        &mut self,
        trace: &mut T,
        instr: &Instruction,
        sp_before: u32,
    ) {
        let sp = self.machine.sp();
        while let Some(top) = self.calls.last()
            && sp <= top.sp_before
        {
            let kind = top.kind;
            self.calls.pop();
            trace.scope_exit(&self.machine, kind, self.calls.len());
        }

        // A false condition leaves SP alone, so only taken pushes open a scope.
        if instr.pushes() && sp == sp_before.wrapping_add(4) {
            let return_pc = self
                .machine
                .memory()
                .read_u32_le(sp_before)
                .unwrap_or_default();
            let kind = ScopeKind::Call {
                target: self.machine.pc(),
                return_pc,
            };
            trace.scope_enter(&self.machine, kind, self.calls.len());
            self.calls.push(CallFrame { kind, sp_before });
        }
    }
}
