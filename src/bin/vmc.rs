//! Compile-only companion to `vm`: assembles a source file and writes the
//! resulting bytecode to a file, without executing it. Useful for
//! inspecting what the assembler produced, or for shipping a pre-assembled
//! program without its source.

use std::process::ExitCode;

use clap::Parser;
use log::info;

use stackvm::assembler::assemble;
use stackvm::diagnostics::format_assemble_error;

/// Assemble a stack-vm source file to a bytecode file.
#[derive(Parser)]
#[command(name = "vmc", version, about)]
struct Args {
    /// Path to the source file to assemble.
    source: std::path::PathBuf,

    /// Where to write the assembled bytecode.
    #[arg(short, long, default_value = "a.out")]
    output: std::path::PathBuf,
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

    if let Err(e) = std::fs::write(&args.output, program.bytecode.as_bytes()) {
        eprintln!("error: could not write {}: {e}", args.output.display());
        return ExitCode::FAILURE;
    }

    info!("wrote {} bytes to {}", program.bytecode.len(), args.output.display());
    ExitCode::SUCCESS
}
