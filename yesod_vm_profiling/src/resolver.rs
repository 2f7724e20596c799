// Copyright 2026 the Yesod VM Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::collections::BTreeMap;
use std::string::String;
use yesod_vm::machine::Machine;

/// Optional label resolver for profiling scopes.
///
/// Return `None` to fall back to the default address-based labels.
pub trait LabelResolver {
    /// Resolve a label for the whole-run scope.
    fn run_label(&mut self, _machine: &Machine) -> Option<String> {
        None
    }

    /// Resolve a label for a call to `target`.
    fn call_label(&mut self, _target: u32, _machine: &Machine) -> Option<String> {
        None
    }
}

/// Default resolver that keeps stable address-based labels.
#[derive(Default, Debug)]
pub struct DefaultLabelResolver;

impl LabelResolver for DefaultLabelResolver {}

/// Resolver backed by a table of named addresses.
///
/// A call resolves to the nearest symbol at or below its target, with an offset suffix when the
/// target is inside the symbol rather than at its start.
#[derive(Default, Debug, Clone)]
pub struct SymbolTableResolver {
    symbols: BTreeMap<u32, String>,
}

impl SymbolTableResolver {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Name the code starting at `addr`, replacing any previous name.
    pub fn insert(&mut self, addr: u32, name: impl Into<String>) {
        self.symbols.insert(addr, name.into());
    }

    /// Number of named addresses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns `true` if no address is named.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    fn lookup(&self, addr: u32) -> Option<String> {
        let (&base, name) = self.symbols.range(..=addr).next_back()?;
        let offset = addr - base;
        Some(if offset == 0 {
            format!("call:{name}")
        } else {
            format!("call:{name}+{offset:#x}")
        })
    }
}

impl<S: Into<String>> FromIterator<(u32, S)> for SymbolTableResolver {
    fn from_iter<I: IntoIterator<Item = (u32, S)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (addr, name) in iter {
            table.insert(addr, name);
        }
        table
    }
}

impl LabelResolver for SymbolTableResolver {
    fn call_label(&mut self, target: u32, _machine: &Machine) -> Option<String> {
        self.lookup(target)
    }
}

pub(crate) fn default_run_label(machine: &Machine) -> String {
    format!("run:text={:#010x}", machine.layout().text)
}

pub(crate) fn default_call_label(target: u32) -> String {
    format!("call:{target:#010x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use yesod_vm::machine::MachineConfig;

    #[test]
    fn nearest_symbol_with_offset() {
        let machine = Machine::new(MachineConfig::default());
        let mut table: SymbolTableResolver = [(0x100_u32, "main"), (0x140, "fib")]
            .into_iter()
            .collect();
        assert_eq!(table.len(), 2);
        assert_eq!(table.call_label(0x140, &machine).as_deref(), Some("call:fib"));
        assert_eq!(
            table.call_label(0x14C, &machine).as_deref(),
            Some("call:fib+0xc")
        );
        assert_eq!(
            table.call_label(0x104, &machine).as_deref(),
            Some("call:main+0x4")
        );
        assert_eq!(table.call_label(0x40, &machine), None);
    }

    #[test]
    fn default_labels_are_address_based() {
        assert_eq!(default_call_label(0xFF0), "call:0x00000ff0");
        let mut resolver = DefaultLabelResolver;
        let machine = Machine::new(MachineConfig::default());
        assert_eq!(resolver.call_label(0, &machine), None);
        assert_eq!(resolver.run_label(&machine), None);
        assert_eq!(default_run_label(&machine), "run:text=0x00000000");
    }
}
