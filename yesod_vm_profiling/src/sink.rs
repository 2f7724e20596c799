// Copyright 2026 the Yesod VM Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::resolver::{DefaultLabelResolver, LabelResolver, default_call_label, default_run_label};
use std::string::String;
use std::vec::Vec;
use yesod_vm::machine::Machine;
use yesod_vm::trace::{ScopeKind, TraceMask, TraceSink};
use yesod_vm::vm::FaultInfo;

type BackendGuard = tracy_client::Span;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Zone {
    Run,
    Scope(ScopeKind),
}

struct ZoneEntry {
    zone: Zone,
    depth: usize,
    // Keep the label alive for backends that may borrow it.
    label: String,
    guard: Option<BackendGuard>,
}

/// A `TraceSink` that emits Tracy zones via `tracy-client`.
///
/// Each run is one zone; calls nest inside it.
pub struct ProfilingTraceSink<R = DefaultLabelResolver> {
    resolver: R,
    stack: Vec<ZoneEntry>,
}

impl ProfilingTraceSink<DefaultLabelResolver> {
    /// Create a new sink with address-based labels.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R: LabelResolver> ProfilingTraceSink<R> {
    /// Create a new sink with a custom label resolver.
    #[must_use]
    pub fn with_resolver(resolver: R) -> Self {
        Self {
            resolver,
            stack: Vec::new(),
        }
    }

    /// Returns the label resolver.
    #[must_use]
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Number of zones currently open.
    #[must_use]
    pub fn open_zones(&self) -> usize {
        self.stack.len()
    }

    /// Labels of the open zones, outermost first.
    pub fn open_labels(&self) -> impl Iterator<Item = &str> {
        self.stack.iter().map(|e| e.label.as_str())
    }

    fn enter(&mut self, machine: &Machine, zone: Zone, depth: usize) {
        let label = self.resolve_label(machine, zone);
        let guard = start_zone(zone, &label, machine.pc());
        self.stack.push(ZoneEntry {
            zone,
            depth,
            label,
            guard,
        });
    }

    fn exit(&mut self, zone: Zone, depth: usize) {
        if let Some(top) = self.stack.last()
            && top.zone == zone
            && top.depth == depth
        {
            self.stack.pop();
            return;
        }
        // If the stack got out of sync, drop any active zones to avoid leaking.
        self.drop_active_zones();
    }

    fn resolve_label(&mut self, machine: &Machine, zone: Zone) -> String {
        match zone {
            Zone::Run => self
                .resolver
                .run_label(machine)
                .unwrap_or_else(|| default_run_label(machine)),
            Zone::Scope(ScopeKind::Call { target, .. }) => self
                .resolver
                .call_label(target, machine)
                .unwrap_or_else(|| default_call_label(target)),
        }
    }

    // Drop in LIFO order so nested spans close inner-to-outer.
    fn drop_active_zones(&mut self) {
        while let Some(entry) = self.stack.pop() {
            drop(entry);
        }
    }
}

fn start_zone(zone: Zone, label: &str, pc: u32) -> Option<BackendGuard> {
    let function_name = match zone {
        Zone::Run => "yesod_vm.run",
        Zone::Scope(ScopeKind::Call { .. }) => "yesod_vm.call",
    };
    let client = tracy_client::Client::running()?;
    Some(client.span_alloc(Some(label), function_name, "yesod_vm", pc, 0))
}

// Call depths are offset by one so they nest under the run zone.
impl<R: LabelResolver> TraceSink for ProfilingTraceSink<R> {
    fn mask(&self) -> TraceMask {
        TraceMask::RUN | TraceMask::CALL
    }

    fn run_start(&mut self, machine: &Machine) {
        self.enter(machine, Zone::Run, 0);
    }

    fn scope_enter(&mut self, machine: &Machine, kind: ScopeKind, depth: usize) {
        self.enter(machine, Zone::Scope(kind), depth + 1);
    }

    fn scope_exit(&mut self, _machine: &Machine, kind: ScopeKind, depth: usize) {
        self.exit(Zone::Scope(kind), depth + 1);
    }

    fn run_end(&mut self, _machine: &Machine, _outcome: &Result<u32, FaultInfo>) {
        self.exit(Zone::Run, 0);
    }
}

impl<R> Default for ProfilingTraceSink<R>
where
    R: LabelResolver + Default,
{
    fn default() -> Self {
        Self::with_resolver(R::default())
    }
}

impl<R> std::fmt::Debug for ProfilingTraceSink<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfilingTraceSink")
            .field("stack_depth", &self.stack.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yesod_vm::machine::MachineConfig;

    #[test]
    fn start_zone_without_tracy_client_does_not_panic() {
        let _guard = start_zone(Zone::Run, "test", 0);
    }

    #[test]
    fn mismatched_exit_drops_everything() {
        let machine = Machine::new(MachineConfig::default());
        let mut sink = ProfilingTraceSink::new();
        let call = ScopeKind::Call {
            target: 0x40,
            return_pc: 0x10,
        };
        sink.run_start(&machine);
        sink.scope_enter(&machine, call, 0);
        assert_eq!(sink.open_zones(), 2);
        sink.scope_exit(&machine, call, 3);
        assert_eq!(sink.open_zones(), 0);
    }
}
