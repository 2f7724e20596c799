// Copyright 2026 the Yesod VM Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use yesod_vm::decode::{
    Branch, General, Immediate, ImmediateBranch, Instruction, ShiftAmount, decode,
};
use yesod_vm::exec::{Fault, Step};
use yesod_vm::flags::Flags;
use yesod_vm::image::{Image, LoadError};
use yesod_vm::isa::{Class, Cond, OpSize, Opcode, Reg, ShiftKind};
use yesod_vm::machine::{Machine, MachineConfig};
use yesod_vm::vm::{Limits, Vm, step};
use yesod_vm_conformance::{image_bytes, load, run};

fn r(n: u8) -> Reg {
    Reg::new(n).unwrap()
}

fn imm(op: Opcode, rd: u8, value: u16) -> Instruction {
    Immediate::new(op, r(rd), value).into()
}

fn imm_upper(op: Opcode, rd: u8, value: u16) -> Instruction {
    Immediate {
        upper: true,
        ..Immediate::new(op, r(rd), value)
    }
    .into()
}

fn reg(op: Opcode, rd: u8, rs: u8) -> Instruction {
    General::new(op, r(rd), r(rs)).into()
}

fn hlt(rs: u8) -> Instruction {
    reg(Opcode::Hlt, 0, rs)
}

#[test]
fn mov_then_hlt() {
    let (_, outcome) = run(&[imm(Opcode::Mov, 1, 5), hlt(1)]);
    assert_eq!(outcome, Ok(5));
}

#[test]
fn upper_add_twice_overflows_and_keeps_sticky_flags() {
    let (vm, outcome) = run(&[
        imm_upper(Opcode::Add, 1, 0x8000),
        imm_upper(Opcode::Add, 1, 0x8000),
        hlt(1),
    ]);
    assert_eq!(outcome, Ok(0));
    let flags = vm.machine().flags();
    assert!(flags.contains(Flags::OVERFLOW));
    assert!(flags.contains(Flags::ZERO));
    assert!(flags.contains(Flags::SIGN));
}

#[test]
fn single_word_image_loads_at_text_base() {
    let bytes = image_bytes(&[hlt(0)], &[], &[]);
    assert_eq!(bytes.len(), 22 + 4 + 1);
    let image = Image::parse(&bytes).unwrap();
    let m = Machine::with_image(MachineConfig::default(), &image).unwrap();
    assert_eq!(m.layout().text, 4096 - 4);
    assert_eq!(m.pc(), m.layout().text);
    assert_eq!(m.sp(), 0);
    assert_eq!(m.layout().heap, 128);
}

#[test]
fn loader_rejections() {
    let good = image_bytes(&[hlt(0)], &[1, 2], &[3]);
    assert!(Image::parse(&good).is_ok());

    let mut bad_magic = good.clone();
    bad_magic[0] = b'Z';
    assert_eq!(Image::parse(&bad_magic), Err(LoadError::BadMagic));

    let mut bad_size = good.clone();
    bad_size[4] += 1;
    assert!(matches!(
        Image::parse(&bad_size),
        Err(LoadError::SizeMismatch { .. })
    ));

    let mut bad_version = good.clone();
    bad_version[20] = 3;
    assert!(matches!(
        Image::parse(&bad_version),
        Err(LoadError::UnsupportedVersion { found: 3, .. })
    ));

    assert_eq!(
        Image::parse(&good[..good.len() - 3]),
        Err(LoadError::Truncated)
    );
    assert_eq!(
        Image::parse(&good[..good.len() - 1]),
        Err(LoadError::MissingTerminator)
    );

    let image = Image::parse(&good).unwrap();
    let tiny = MachineConfig {
        memory_size: 64,
        stack_size: 60,
    };
    assert!(matches!(
        Machine::with_image(tiny, &image),
        Err(LoadError::TooLarge {
            sections: 7,
            stack: 60,
            memory: 64
        })
    ));
}

#[test]
fn sections_land_high_to_low() {
    let image = Image::parse(&image_bytes(&[hlt(0)], &[0xD0, 0xD1], &[0xB0, 0xB1, 0xB2])).unwrap();
    let m = Machine::with_image(MachineConfig::default(), &image).unwrap();
    let layout = m.layout();
    assert_eq!(layout.text, 4092);
    assert_eq!(layout.data, 4090);
    assert_eq!(layout.rodata, 4087);
    assert_eq!(m.memory().read_bytes(layout.rodata, 5).unwrap(), &[0xB0, 0xB1, 0xB2, 0xD0, 0xD1]);
}

#[test]
fn counting_loop_sums_one_to_ten() {
    let back: Instruction = Branch::new(Opcode::Jr, r(3)).into();
    let exit: Instruction = ImmediateBranch {
        cond: Cond::NotEqual,
        ..ImmediateBranch::new(Opcode::Jr, Reg::ZERO, 8)
    }
    .into();
    let (vm, outcome) = run(&[
        imm(Opcode::Mov, 3, 0xFFF4),       // 0: x3 = -12
        imm_upper(Opcode::Or, 3, 0xFFFF),  // 1
        imm(Opcode::Mov, 1, 10),           // 2
        reg(Opcode::Add, 2, 1),            // 3: loop
        imm(Opcode::Sub, 1, 1),            // 4
        exit,                              // 5: zero flag set once x1 hits 0
        back,                              // 6: back to 3
        hlt(2),                            // 7
    ]);
    assert_eq!(outcome, Ok(55));
    assert_eq!(vm.machine().reg(r(1)), 0);
}

#[test]
fn subroutine_returns_through_the_stack() {
    let lsl8 = General {
        shift: ShiftKind::Lsl,
        amount: ShiftAmount::Imm(8),
        ..General::new(Opcode::Mov, r(6), r(6))
    };
    let code = [
        // 0: call +12 (to 3)
        ImmediateBranch {
            push: true,
            ..ImmediateBranch::new(Opcode::Jr, Reg::ZERO, 12)
        }
        .into(),
        hlt(2),                            // 1: return lands here
        hlt(0),                            // 2: never reached
        imm(Opcode::Mov, 2, 42),           // 3: body
        imm(Opcode::Sub, 15, 4),           // 4: pop
        reg(Opcode::Car, 5, 15),           // 5: low byte
        reg(Opcode::Mov, 6, 15),           // 6
        imm(Opcode::Add, 6, 1),            // 7
        reg(Opcode::Car, 6, 6),            // 8: second byte
        lsl8.into(),                       // 9
        reg(Opcode::Or, 5, 6),             // 10
        Branch::new(Opcode::Ja, r(5)).into(), // 11: ret
    ];
    let (vm, outcome) = run(&code);
    assert_eq!(outcome, Ok(42));
    let m = vm.machine();
    assert_eq!(m.sp(), 0);
    assert_eq!(m.reg(r(5)), m.layout().text + 4);
    // The pushed word stays in memory.
    assert_eq!(m.memory().read_u32_le(0).unwrap(), m.layout().text + 4);
}

#[test]
fn byte_memory_ops_against_data_sections() {
    let code = [
        reg(Opcode::Car, 1, 10),  // x1 = data[0]
        reg(Opcode::Cdr, 2, 10),  // x2 = byte at data + 4
        reg(Opcode::Str, 11, 1),  // heap[0] = x1
        reg(Opcode::Car, 3, 11),
        reg(Opcode::Add, 3, 2),
        hlt(3),
    ];
    let image = Image::parse(&image_bytes(&code, &[7, 0, 0, 0, 30], &[])).unwrap();
    let mut vm = Vm::with_image(MachineConfig::default(), &image, Limits::default()).unwrap();
    let data = vm.machine().layout().data;
    let heap = vm.machine().layout().heap;
    vm.machine_mut().set_reg(r(10), data);
    vm.machine_mut().set_reg(r(11), heap);
    assert_eq!(vm.run(), Ok(37));
    assert_eq!(vm.machine().memory().read_u8(heap).unwrap(), 7);
}

#[test]
fn operand_shaping_truncates_after_shifting() {
    let shaped = General {
        shift: ShiftKind::Asr,
        amount: ShiftAmount::Imm(4),
        size: OpSize::Half,
        ..General::new(Opcode::Mov, r(2), r(1))
    };
    let (vm, outcome) = run(&[
        imm_upper(Opcode::Mov, 1, 0x8765),
        imm(Opcode::Or, 1, 0x4321),
        shaped.into(),
        hlt(2),
    ]);
    // 0x87654321 asr 4 = 0xF8765432, truncated to 0x5432.
    assert_eq!(outcome, Ok(0x5432));
    assert_eq!(vm.machine().reg(r(1)), 0x8765_4321);
}

#[test]
fn signed_conditions_read_overflow() {
    let skip_if_lts: Instruction = ImmediateBranch {
        cond: Cond::LessSigned,
        ..ImmediateBranch::new(Opcode::Jr, Reg::ZERO, 8)
    }
    .into();
    // No overflow yet: lts holds and the branch skips the first hlt.
    let (_, outcome) = run(&[skip_if_lts, hlt(0), imm(Opcode::Mov, 1, 1), hlt(1)]);
    assert_eq!(outcome, Ok(1));

    // After an overflow lts is false.
    let (_, outcome) = run(&[
        imm_upper(Opcode::Mov, 1, 0x7FFF),
        imm_upper(Opcode::Add, 1, 0x7FFF),
        skip_if_lts,
        hlt(0),
        hlt(1),
    ]);
    assert_eq!(outcome, Ok(0));
}

#[test]
fn runaway_pushes_overflow_the_stack() {
    // jr.push #0 pushes and branches to itself.
    let (vm, outcome) = run(&[ImmediateBranch {
        push: true,
        ..ImmediateBranch::new(Opcode::Jr, Reg::ZERO, 0)
    }
    .into()]);
    let err = outcome.unwrap_err();
    assert_eq!(err.fault, Fault::StackOverflow { sp: 132 });
    assert_eq!(err.pc, vm.machine().layout().text);
    // 33 pushes fit: SP may equal the stack size before a push.
    assert_eq!(vm.cycles(), 34);
}

#[test]
fn unsupported_opcode_reports_class_and_pc() {
    let (vm, outcome) = run(&[imm(Opcode::Mov, 1, 1), imm(Opcode::Hlt, 1, 0)]);
    let err = outcome.unwrap_err();
    assert_eq!(err.pc, vm.machine().layout().text + 4);
    assert_eq!(
        err.fault,
        Fault::UnsupportedOpcode {
            class: Class::Immediate,
            opcode: 0x0C
        }
    );
    assert_eq!(
        err.to_string(),
        "fault at pc=0x00000ffc: unsupported opcode 0x0c for class 2"
    );
}

#[test]
fn running_off_the_end_of_memory_faults() {
    let (_, outcome) = run(&[reg(Opcode::Nop, 0, 0)]);
    let err = outcome.unwrap_err();
    assert_eq!(err.pc, 4096);
    assert_eq!(err.fault, Fault::MemoryOutOfBounds { addr: 4096 });
}

#[test]
fn cycle_limit_is_a_fault() {
    let mut vm = load(
        &[ImmediateBranch::new(Opcode::Jr, Reg::ZERO, 0).into()],
        MachineConfig::default(),
        Limits {
            max_cycles: Some(10),
        },
    );
    assert_eq!(vm.run().unwrap_err().fault, Fault::CycleLimitExceeded);
    // Each run gets a fresh budget.
    assert_eq!(vm.run().unwrap_err().fault, Fault::CycleLimitExceeded);
    assert_eq!(vm.cycles(), 20);
}

#[test]
fn stepping_yields_legacy_exit_codes() {
    let vm = load(
        &[imm(Opcode::Mov, 1, 5), hlt(1)],
        MachineConfig::default(),
        Limits::default(),
    );
    let mut m = vm.into_machine();
    let first = step(&mut m);
    assert_eq!(first, Step::Continue);
    assert_eq!(first.exit_code(), 0);
    let second = step(&mut m);
    assert_eq!(second, Step::Halt(5));
    assert_eq!(second.exit_code(), 5);

    m.set_pc(4096);
    let third = step(&mut m);
    assert!(matches!(third, Step::Fault(Fault::MemoryOutOfBounds { .. })));
    assert_eq!(third.exit_code(), 1);
}

#[test]
fn x0_is_scratch_reset_each_cycle() {
    let (vm, outcome) = run(&[
        imm(Opcode::Mov, 0, 9),
        reg(Opcode::Mov, 1, 0),
        imm(Opcode::Mov, 2, 4),
        imm(Opcode::Cmp, 2, 1),
        reg(Opcode::Mov, 3, 0),
        hlt(1),
    ]);
    assert_eq!(outcome, Ok(0));
    assert_eq!(vm.machine().reg(r(3)), 0);
    assert_eq!(vm.machine().reg(r(2)), 4);
}

#[test]
fn decode_normalizes_every_word() {
    let mut w: u32 = 0x9E37_79B9;
    for _ in 0..4096 {
        let instr = decode(w);
        assert_eq!(decode(instr.encode()), instr, "{w:#010x}");
        w = w.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
    }
}

#[test]
fn disassembly_of_a_program() {
    let code = [
        imm(Opcode::Mov, 1, 5),
        ImmediateBranch {
            push: true,
            cond: Cond::GreaterEqualUnsigned,
            ..ImmediateBranch::new(Opcode::Ja, r(7), 0x10)
        }
        .into(),
        hlt(1),
    ];
    let text: Vec<String> = code.iter().map(ToString::to_string).collect();
    assert_eq!(
        text,
        ["mov x1, #0x0005", "ja.geu.push x7, #0x0010", "hlt x1"]
    );
}
