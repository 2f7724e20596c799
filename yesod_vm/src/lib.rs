// Copyright 2026 the Yesod VM Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A software CPU for the Yesod 32-bit instruction set.
//!
//! `yesod_vm` is `no_std + alloc`. It contains:
//! - [`isa`]: register, opcode and field tables
//! - [`decode`]: the total bit-field decoder and its inverse, [`decode::Instruction::encode`]
//! - [`exec`]: the execution engine for one decoded instruction
//! - [`vm`]: the fetch/decode/execute cycle and a run loop with limits and tracing
//! - [`image`]: the `YSWD` program image codec
//! - [`machine`] and [`memory`]: registers, flags, memory and the region layout
//!
//! ## Example
//! ```
//! use yesod_vm::decode::{General, Immediate, Instruction};
//! use yesod_vm::image::Image;
//! use yesod_vm::isa::{Opcode, Reg};
//! use yesod_vm::machine::MachineConfig;
//! use yesod_vm::vm::{Limits, Vm};
//!
//! let x1 = Reg::new(1).unwrap();
//! let program: [Instruction; 2] = [
//!     Immediate::new(Opcode::Mov, x1, 5).into(),
//!     General::new(Opcode::Hlt, Reg::ZERO, x1).into(),
//! ];
//! let words: Vec<u32> = program.iter().map(Instruction::encode).collect();
//! let image = Image::parse(&Image::from_words(&words).to_bytes())?;
//!
//! let mut vm = Vm::with_image(MachineConfig::default(), &image, Limits::default())?;
//! assert_eq!(vm.run()?, 5);
//! # Ok::<(), Box<dyn core::error::Error>>(())
//! ```

#![no_std]

extern crate alloc;

pub mod decode;
pub mod disasm;
pub mod exec;
pub mod flags;
pub mod format;
pub mod image;
pub mod isa;
pub mod machine;
pub mod memory;
pub mod trace;
pub mod vm;
