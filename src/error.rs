//! Error kinds produced by the assembler and the running VM.
//!
//! Mirrors the teacher's `CpuError` (a plain enum of failure reasons) but
//! adds `std::error::Error`/`Display` impls via `thiserror` instead of
//! leaving callers to `Debug`-print a bare variant.

use thiserror::Error;

/// Failures that can occur while running already-assembled bytecode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    /// Operand stack index out of range, or the bytecode reader ran past
    /// the end of the stream.
    #[error("out of bounds: {0}")]
    OutOfBounds(String),

    /// A typed pop or dereference received a value of a different tag.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// A heap/string-heap address did not resolve to any owned allocation.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// An address kind or immediate value was rejected by the opcode using it.
    #[error("invalid operand: {0}")]
    InvalidOperand(String),

    /// The `err` opcode populated the error slot; this is a user-emitted
    /// runtime error, not a structural fault.
    #[error("{0}")]
    RuntimeError(String),

    /// Underlying file/stdin/stdout failure.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for VmError {
    fn from(e: std::io::Error) -> Self {
        VmError::Io(e.to_string())
    }
}

/// Failures raised while assembling a textual program into bytecode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsmError {
    /// A numeric literal did not parse (bad digits, overflow).
    #[error("invalid number: {0}")]
    InvalidNumber(String),

    /// A string literal contained an unsupported escape sequence.
    #[error("invalid escape: {0}")]
    InvalidEscape(String),

    /// The current token is neither a label definition, a known mnemonic,
    /// nor a required operand.
    #[error("no match: {0}")]
    NoMatch(String),

    /// Pass 2 could not resolve a referenced label.
    #[error("missing label: {0}")]
    MissingLabel(String),

    /// Underlying file I/O failure.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for AsmError {
    fn from(e: std::io::Error) -> Self {
        AsmError::Io(e.to_string())
    }
}
