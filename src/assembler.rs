//! The assembler (component C4): a hand-written character-level parser
//! that tokenizes a textual program on demand, emits bytecode directly
//! (no intermediate AST), and resolves labels via two-pass back-patching.
//!
//! Pass 1 happens during emission: every label definition's bytecode
//! offset is recorded, and every address-or-label operand that isn't a
//! plain number is recorded as a placeholder (a zero-filled `usize` slot
//! plus the referenced name). Pass 2 walks just that placeholder list
//! once emission is done and patches each slot via [`Writer::begin_overwrite`].

use std::collections::HashMap;

use crate::bytecode::{Reader, Writer};
use crate::error::AsmError;
use crate::opcode::{Opcode, OperandKind};
use crate::sourcemap::{Position, SourceMap};

/// A fully assembled program: bytecode ready for the VM plus the source
/// map used to render runtime diagnostics.
#[derive(Debug)]
pub struct Program {
    pub bytecode: Reader<'static>,
    pub source_map: SourceMap,
}

/// An assembly failure paired with the position it was detected at, so a
/// caller can render `ERROR Ln L, Col C: <message>` without re-deriving
/// the position from scratch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembleFailure {
    pub error: AsmError,
    pub position: Position,
}

impl std::fmt::Display for AssembleFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for AssembleFailure {}

/// Parses `source` into a [`Program`]. Equivalent to constructing an
/// [`Assembler`] and calling [`Assembler::assemble`] — the common-case
/// entry point.
pub fn assemble(source: &str) -> Result<Program, AssembleFailure> {
    Assembler::new(source).assemble()
}

enum NumberLit {
    Integer(i32),
    Float(f64),
}

pub struct Assembler<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
    writer: Writer,
    source_map: SourceMap,
    labels: HashMap<String, usize>,
    /// (label name, bytecode offset of the zero placeholder to patch)
    placeholders: Vec<(String, usize)>,
    /// Human-readable message stashed on a `NoMatch`/lex failure, mirroring
    /// the reference assembler's "stores a diagnostic message on itself".
    error_message: Option<String>,
}

impl<'a> Assembler<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            src: source,
            bytes: source.as_bytes(),
            pos: 0,
            line: 0,
            column: 0,
            writer: Writer::new(),
            source_map: SourceMap::new(),
            labels: HashMap::new(),
            placeholders: Vec::new(),
            error_message: None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn position(&self) -> Position {
        Position { line: self.line, column: self.column, byte_offset: self.pos }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Skips whitespace and `/...\n` line comments. The comment trigger is
    /// a single `/`, not `//` — see spec.md §9.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn read_identifier(&mut self) -> Option<String> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                self.bump();
            }
            _ => return None,
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        Some(self.src[start..self.pos].to_string())
    }

    /// Scans an optional sign, a digit run, and an optional `.` followed
    /// by another digit run. Returns `None` (without consuming anything)
    /// if the position isn't the start of a number at all.
    fn scan_numeric(&mut self) -> Result<Option<NumberLit>, AsmError> {
        let start = self.pos;
        if matches!(self.peek(), Some('+') | Some('-')) {
            self.bump();
        }
        let digits_start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        if self.pos == digits_start {
            self.pos = start;
            return Ok(None);
        }

        let mut is_float = false;
        if self.peek() == Some('.') {
            is_float = true;
            self.bump();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.bump();
            }
        }

        let text = &self.src[start..self.pos];
        if is_float {
            text.parse::<f64>()
                .map(|v| Some(NumberLit::Float(v)))
                .map_err(|e| AsmError::InvalidNumber(format!("{text:?}: {e}")))
        } else {
            text.parse::<i32>()
                .map(|v| Some(NumberLit::Integer(v)))
                .map_err(|e| AsmError::InvalidNumber(format!("{text:?}: {e}")))
        }
    }

    /// Address literals are unsigned and unsigned only — a leading sign
    /// makes this not a number in address position, so the caller
    /// backtracks to try a label identifier instead.
    fn scan_unsigned(&mut self) -> Option<usize> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        if self.pos == start {
            return None;
        }
        self.src[start..self.pos].parse::<usize>().ok()
    }

    fn parse_string(&mut self) -> Result<Vec<u8>, AsmError> {
        let quote = match self.peek() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(AsmError::NoMatch("expected a string literal".into())),
        };
        self.bump();
        let mut out = Vec::new();
        loop {
            match self.bump() {
                None => return Err(AsmError::NoMatch("unterminated string literal".into())),
                Some(c) if c == quote => break,
                Some('\\') => match self.bump() {
                    Some('n') => out.push(b'\n'),
                    Some('t') => out.push(b'\t'),
                    Some('r') => out.push(b'\r'),
                    Some(other) => {
                        let mut buf = [0u8; 4];
                        out.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
                    }
                    None => return Err(AsmError::InvalidEscape("trailing backslash".into())),
                },
                Some(c) => {
                    let mut buf = [0u8; 4];
                    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                }
            }
        }
        Ok(out)
    }

    fn fail(&mut self, error: AsmError) -> AssembleFailure {
        self.error_message = Some(error.to_string());
        AssembleFailure { error, position: self.position() }
    }

    /// Runs both assembly passes and returns the finished program.
    pub fn assemble(mut self) -> Result<Program, AssembleFailure> {
        if let Err(e) = self.pass_one() {
            return Err(self.fail(e));
        }
        if let Err(e) = self.pass_two() {
            return Err(self.fail(e));
        }
        Ok(Program { bytecode: self.writer.into_reader(), source_map: self.source_map })
    }

    fn pass_one(&mut self) -> Result<(), AsmError> {
        loop {
            self.skip_trivia();
            if self.at_end() {
                return Ok(());
            }

            let start_pos = self.position();
            let ident = match self.read_identifier() {
                Some(ident) => ident,
                None => return Err(AsmError::NoMatch(format!("unexpected character {:?}", self.peek()))),
            };

            self.skip_trivia();
            if self.peek() == Some(':') {
                self.bump();
                self.labels.insert(ident, self.writer.len());
                continue;
            }

            let opcode = match Opcode::from_mnemonic(&ident) {
                Some(opcode) => opcode,
                None => {
                    self.pos = start_pos.byte_offset;
                    self.line = start_pos.line;
                    self.column = start_pos.column;
                    return Err(AsmError::NoMatch(format!("unknown mnemonic {ident:?}")));
                }
            };

            let instruction_offset = self.writer.len();
            self.source_map.begin(instruction_offset, start_pos);
            self.writer.write_instruction(opcode);
            self.skip_trivia();
            self.emit_operand(opcode)?;
            self.source_map.end(self.position());
        }
    }

    fn emit_operand(&mut self, opcode: Opcode) -> Result<(), AsmError> {
        match opcode.operand_kind() {
            OperandKind::None => Ok(()),
            OperandKind::I32 => {
                match self.scan_numeric()? {
                    Some(NumberLit::Integer(v)) => {
                        self.writer.write_i32(v);
                        Ok(())
                    }
                    Some(NumberLit::Float(_)) => {
                        Err(AsmError::InvalidNumber(format!("{} expects an integer operand", opcode.mnemonic())))
                    }
                    None => Err(AsmError::NoMatch(format!("{} expects an integer operand", opcode.mnemonic()))),
                }
            }
            OperandKind::F64 => match self.scan_numeric()? {
                Some(NumberLit::Integer(v)) => {
                    self.writer.write_f64(v as f64);
                    Ok(())
                }
                Some(NumberLit::Float(v)) => {
                    self.writer.write_f64(v);
                    Ok(())
                }
                None => Err(AsmError::NoMatch(format!("{} expects a float operand", opcode.mnemonic()))),
            },
            OperandKind::AddressOrLabel => {
                if let Some(addr) = self.scan_unsigned() {
                    self.writer.write_usize(addr);
                    return Ok(());
                }
                let name = self
                    .read_identifier()
                    .ok_or_else(|| AsmError::NoMatch(format!("{} expects an address or a label", opcode.mnemonic())))?;
                self.placeholders.push((name, self.writer.len()));
                self.writer.write_usize(0);
                Ok(())
            }
            OperandKind::Str => {
                let bytes = self.parse_string()?;
                self.writer.write_string(&bytes);
                Ok(())
            }
        }
    }

    fn pass_two(&mut self) -> Result<(), AsmError> {
        for (name, pos) in std::mem::take(&mut self.placeholders) {
            let target = self
                .labels
                .get(&name)
                .copied()
                .ok_or_else(|| AsmError::MissingLabel(name.clone()))?;
            self.writer.begin_overwrite(pos);
            self.writer.write_usize(target);
            self.writer.end_overwrite();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Reader;

    fn assemble_ok(src: &str) -> Program {
        assemble(src).unwrap_or_else(|e| panic!("assembly failed for {src:?}: {e}"))
    }

    #[test]
    fn hello_world_program_assembles() {
        let program = assemble_ok(r#"pushs "Hello\n" writes stop"#);
        assert!(!program.bytecode.is_empty());
        assert!(!program.source_map.is_empty());
    }

    #[test]
    fn label_forward_reference_resolves() {
        let program = assemble_ok("pushi 0 jz L1\npushs \"A\" writes stop\nL1: pushs \"B\" writes stop");
        let mut r: Reader = program.bytecode;
        // jump target is the offset right after `pushi 0 jz <addr>`
        let _ = r.read_instruction().unwrap(); // pushi
        let _ = r.read_i32().unwrap();
        let _ = r.read_instruction().unwrap(); // jz
        let target = r.read_usize().unwrap();
        assert!(target > 0);
    }

    #[test]
    fn unknown_mnemonic_is_no_match() {
        let err = assemble("frobnicate").unwrap_err();
        assert!(matches!(err.error, AsmError::NoMatch(_)));
    }

    #[test]
    fn unresolved_label_is_missing_label() {
        let err = assemble("jump nowhere").unwrap_err();
        assert!(matches!(err.error, AsmError::MissingLabel(_)));
    }

    #[test]
    fn storeg_mnemonic_is_spelled_normally() {
        let program = assemble_ok("start pushi 0 storeg 0 stop");
        assert!(!program.bytecode.is_empty());
    }

    #[test]
    fn deterministic_across_repeated_assembly() {
        let src = "pushi 2 pushi 3 add writelni stop";
        let a = assemble_ok(src);
        let b = assemble_ok(src);
        assert_eq!(a.bytecode.len(), b.bytecode.len());
    }

    #[test]
    fn single_slash_opens_a_line_comment() {
        let program = assemble_ok("/ this is a comment, not division\npushi 1 pop 1 stop");
        assert!(!program.bytecode.is_empty());
    }
}
