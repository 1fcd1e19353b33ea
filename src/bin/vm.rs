//! CLI entry point (spec.md §6): assembles a source file and runs it.
//!
//! One positional argument, a source path; `--help`/`-h` prints usage via
//! `clap`; exit code is 0 on success, non-zero on assembly or runtime
//! failure, with diagnostics written to standard error.

use std::io::{self, BufReader};
use std::process::ExitCode;

use clap::Parser;
use log::info;

use stackvm::assembler::assemble;
use stackvm::diagnostics::{format_assemble_error, format_runtime_error};
use stackvm::vm::{Outcome, Vm};

/// Run a stack-vm assembly program.
#[derive(Parser)]
#[command(name = "vm", version, about)]
struct Args {
    /// Path to the source file to assemble and execute.
    source: std::path::PathBuf,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let source = match std::fs::read_to_string(&args.source) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: could not read {}: {e}", args.source.display());
            return ExitCode::FAILURE;
        }
    };

    let program = match assemble(&source) {
        Ok(program) => program,
        Err(failure) => {
            eprint!("{}", format_assemble_error(&source, &failure));
            return ExitCode::FAILURE;
        }
    };

    info!("assembled {} ({} bytecode bytes)", args.source.display(), program.bytecode.len());

    let stdin = BufReader::new(io::stdin());
    let mut vm = Vm::new(program.bytecode, Some(program.source_map), stdin, io::stdout());
    match vm.run() {
        Outcome::Stopped => ExitCode::SUCCESS,
        Outcome::Faulted { error, last_instruction } => {
            eprint!("{}", format_runtime_error(&source, vm.source_map(), last_instruction, &error));
            ExitCode::FAILURE
        }
    }
}
