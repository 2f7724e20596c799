// Copyright 2026 the Yesod VM Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Machine state: registers, flags, memory, and the region layout.
//!
//! Memory is laid out from high to low addresses:
//!
//! ```text
//! 0 ........ heap ............ rodata ...... data ...... text ...... memory_size
//! | stack -> | free             | .rodata    | .data     | .text      |
//! ```
//!
//! The stack starts at address 0 and grows upward. `heap` marks where unmanaged space begins.

use core::fmt;

use crate::flags::Flags;
use crate::image::{Image, LoadError};
use crate::isa::{REG_COUNT, Reg};
use crate::memory::Memory;

/// Sizes used to allocate a [`Machine`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MachineConfig {
    /// Total memory size in bytes.
    pub memory_size: u32,
    /// Stack region size in bytes.
    pub stack_size: u32,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            memory_size: 4096,
            stack_size: 32 * 4,
        }
    }
}

/// Region boundaries computed when a program is loaded.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Layout {
    /// End of the stack region; start of unmanaged memory.
    pub heap: u32,
    /// Start of the read-only data region.
    pub rodata: u32,
    /// Start of the data region.
    pub data: u32,
    /// Start of the code region.
    pub text: u32,
}

impl Layout {
    /// Computes region starts for `image` in `memory_size` bytes.
    ///
    /// Fails if the sections plus the stack do not fit.
    pub fn compute(image: &Image, config: MachineConfig) -> Result<Self, LoadError> {
        let sections = image.sections_len();
        if sections + u64::from(config.stack_size) > u64::from(config.memory_size) {
            return Err(LoadError::TooLarge {
                sections,
                stack: config.stack_size,
                memory: config.memory_size,
            });
        }
        // Cannot underflow: sections <= memory_size.
        let text = config.memory_size - image.text_len();
        let data = text - image.data_len();
        let rodata = data - image.rodata_len();
        Ok(Self {
            heap: config.stack_size,
            rodata,
            data,
            text,
        })
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  stack\t{:#010x}", 0)?;
        writeln!(f, "  heap\t{:#010x}", self.heap)?;
        writeln!(f, "  .data\t{:#010x}", self.data)?;
        writeln!(f, "  .rodata\t{:#010x}", self.rodata)?;
        write!(f, "  .text\t{:#010x}", self.text)
    }
}

/// Complete architectural state of one Yesod machine.
#[derive(Clone, Debug)]
pub struct Machine {
    regs: [u32; REG_COUNT],
    flags: Flags,
    memory: Memory,
    layout: Layout,
    stack_size: u32,
}

impl Machine {
    /// Creates a machine with zeroed registers, flags and memory.
    #[must_use]
    pub fn new(config: MachineConfig) -> Self {
        Self {
            regs: [0; REG_COUNT],
            flags: Flags::NONE,
            memory: Memory::new(config.memory_size),
            layout: Layout::default(),
            stack_size: config.stack_size,
        }
    }

    /// Creates a machine and loads `image` into it.
    pub fn with_image(config: MachineConfig, image: &Image) -> Result<Self, LoadError> {
        let mut m = Self::new(config);
        m.load(image)?;
        Ok(m)
    }

    /// Returns the allocation sizes of this machine.
    #[must_use]
    pub fn config(&self) -> MachineConfig {
        MachineConfig {
            memory_size: self.memory.size(),
            stack_size: self.stack_size,
        }
    }

    /// Copies `image` into memory and resets the machine to its entry state.
    ///
    /// On success PC is the text base, SP is 0 and flags are clear. If the sections and stack do
    /// not fit, the machine is left unchanged.
    pub fn load(&mut self, image: &Image) -> Result<Layout, LoadError> {
        let layout = Layout::compute(image, self.config())?;

        self.memory.clear();
        // The layout guarantees every section fits.
        let copies = [
            (layout.text, image.text()),
            (layout.rodata, image.rodata()),
            (layout.data, image.data()),
        ];
        for (base, bytes) in copies {
            self.memory
                .write_bytes(base, bytes)
                .map_err(|_| LoadError::TooLarge {
                    sections: image.sections_len(),
                    stack: self.stack_size,
                    memory: self.memory.size(),
                })?;
        }

        self.regs = [0; REG_COUNT];
        self.flags = Flags::NONE;
        self.layout = layout;
        self.regs[Reg::PC.index()] = layout.text;
        self.regs[Reg::SP.index()] = 0;
        Ok(layout)
    }

    /// Reads a register.
    #[must_use]
    pub fn reg(&self, r: Reg) -> u32 {
        self.regs[r.index()]
    }

    /// Writes a register.
    pub fn set_reg(&mut self, r: Reg, value: u32) {
        self.regs[r.index()] = value;
    }

    /// Returns the whole register file.
    #[must_use]
    pub fn regs(&self) -> &[u32; REG_COUNT] {
        &self.regs
    }

    /// Returns the program counter.
    #[must_use]
    pub fn pc(&self) -> u32 {
        self.reg(Reg::PC)
    }

    /// Sets the program counter.
    pub fn set_pc(&mut self, pc: u32) {
        self.set_reg(Reg::PC, pc);
    }

    /// Returns the stack pointer.
    #[must_use]
    pub fn sp(&self) -> u32 {
        self.reg(Reg::SP)
    }

    /// Returns the flag byte.
    #[must_use]
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// ORs `flags` into the flag byte.
    pub fn raise_flags(&mut self, flags: Flags) {
        self.flags.raise(flags);
    }

    /// Returns memory.
    #[must_use]
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Returns mutable memory.
    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    /// Returns the region layout of the loaded program.
    #[must_use]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Stack region capacity in bytes.
    #[must_use]
    pub fn stack_size(&self) -> u32 {
        self.stack_size
    }
}
