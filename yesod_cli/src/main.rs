// Copyright 2026 the Yesod VM Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `yesod`: load a `YSWD` image, run it, and dump the final machine state.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use yesod_vm::decode::Instruction;
use yesod_vm::image::Image;
use yesod_vm::isa::{REG_COUNT, Reg};
use yesod_vm::machine::{Machine, MachineConfig};
use yesod_vm::trace::{TraceMask, TraceSink};
use yesod_vm::vm::{Limits, Vm};

#[derive(Parser, Debug)]
#[command(name = "yesod", about = "Run a Yesod program image.")]
struct Args {
    /// Memory size in bytes.
    #[arg(short = 'm', long = "memory", default_value_t = MachineConfig::default().memory_size)]
    memory: u32,

    /// Stack size in bytes.
    #[arg(short = 's', long = "stack", default_value_t = MachineConfig::default().stack_size)]
    stack: u32,

    /// Stop with a fault after this many instructions.
    #[arg(long, value_name = "N")]
    max_cycles: Option<u64>,

    /// Print each executed instruction to stderr.
    #[arg(long, default_value_t = false)]
    trace: bool,

    /// Program image.
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

/// Prints one disassembled line per instruction.
struct StderrTrace<W> {
    out: W,
}

impl<W: std::io::Write> TraceSink for StderrTrace<W> {
    fn mask(&self) -> TraceMask {
        TraceMask::INSTR
    }

    fn instr(&mut self, _machine: &Machine, pc: u32, word: u32, instr: &Instruction) {
        // Tracing must not abort the run.
        let _ = writeln!(self.out, "{pc:#010x}: {word:08x}  {instr}");
    }
}

fn dump(m: &Machine) -> String {
    let mut out = String::new();
    for (i, value) in m.regs().iter().enumerate() {
        let name = u8::try_from(i)
            .ok()
            .and_then(Reg::new)
            .map(|r| r.to_string())
            .unwrap_or_default();
        let sep = if (i + 1) % 4 == 0 || i + 1 == REG_COUNT {
            "\n"
        } else {
            "  "
        };
        let _ = write!(out, "{name:>3} {value:#010x}{sep}");
    }
    let _ = writeln!(out, "flags {} ({:#04x})", m.flags(), m.flags().bits());
    out
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let image = Image::parse(&bytes)
        .with_context(|| format!("failed to load {}", args.file.display()))?;

    let config = MachineConfig {
        memory_size: args.memory,
        stack_size: args.stack,
    };
    println!(
        "yesod: initialised VM with {} bytes of memory ({} bytes stack)",
        config.memory_size, config.stack_size
    );
    let limits = Limits {
        max_cycles: args.max_cycles,
    };
    let mut vm = Vm::with_image(config, &image, limits)
        .with_context(|| format!("failed to load {}", args.file.display()))?;
    println!("yesod: program initialised successfully");
    println!("{}", vm.machine().layout());

    let outcome = if args.trace {
        let mut sink = StderrTrace {
            out: std::io::stderr().lock(),
        };
        vm.run_traced(&mut sink)
    } else {
        vm.run()
    };

    let code = match outcome {
        Ok(code) => code,
        Err(info) => {
            eprintln!("yesod: {info}");
            1
        }
    };
    print!("{}", dump(vm.machine()));
    println!("cycles: {}", vm.cycles());
    println!("exit code: {code}");
    std::io::stdout().flush().context("failed to flush stdout")?;
    Ok(())
}
