// Copyright 2026 the Yesod VM Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Profiling adapters for `yesod_vm` (currently Tracy).
//!
//! This crate is `std`-only and keeps `yesod_vm` itself free of profiling dependencies.
//! It listens for run and call scope callbacks and emits matching profiling zones.
//!
//! ## Backend
//! This crate currently supports the Tracy backend via `tracy-client`. When no Tracy client is
//! running, the sink still tracks scopes but emits nothing.
//!
//! ## Example
//! ```ignore
//! use yesod_vm_profiling::{ProfilingTraceSink, SymbolTableResolver};
//!
//! let mut symbols = SymbolTableResolver::new();
//! symbols.insert(layout.text + 0x40, "fib");
//! let mut sink = ProfilingTraceSink::with_resolver(symbols);
//! let code = vm.run_traced(&mut sink)?;
//! # Ok::<(), yesod_vm::vm::FaultInfo>(())
//! ```

mod resolver;
mod sink;

pub use resolver::{DefaultLabelResolver, LabelResolver, SymbolTableResolver};
pub use sink::ProfilingTraceSink;
