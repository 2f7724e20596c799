// Copyright 2026 the Yesod VM Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Conformance fixtures for `yesod_vm`.
//!
//! The tests live in `tests/`; this library holds the shared program builders.

use yesod_vm::decode::Instruction;
use yesod_vm::image::Image;
use yesod_vm::machine::MachineConfig;
use yesod_vm::vm::{FaultInfo, Limits, Vm};

/// Serializes `code` as a complete image with the given data sections.
#[must_use]
pub fn image_bytes(code: &[Instruction], data: &[u8], rodata: &[u8]) -> Vec<u8> {
    let text = code.iter().flat_map(|i| i.encode().to_le_bytes()).collect();
    Image::new(text, data.to_vec(), rodata.to_vec()).to_bytes()
}

/// Round-trips `code` through the image format and loads it with `config`.
///
/// # Panics
///
/// Panics if the image does not parse or does not fit.
#[must_use]
pub fn load(code: &[Instruction], config: MachineConfig, limits: Limits) -> Vm {
    let image = Image::parse(&image_bytes(code, &[], &[])).expect("fixture image parses");
    Vm::with_image(config, &image, limits).expect("fixture image fits")
}

/// Loads `code` with default sizes, a generous cycle limit, and runs it.
pub fn run(code: &[Instruction]) -> (Vm, Result<u32, FaultInfo>) {
    let mut vm = load(
        code,
        MachineConfig::default(),
        Limits {
            max_cycles: Some(100_000),
        },
    );
    let outcome = vm.run();
    (vm, outcome)
}
