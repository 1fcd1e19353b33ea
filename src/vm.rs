//! The execution engine (component C8): fetch-decode-execute loop plus the
//! opcode handlers, operating on the register file (C7), operand stack,
//! frame stack, and the two heaps (C6).

use std::io::{BufRead, Write};

use log::{debug, trace, warn};

use crate::bytecode::Reader;
use crate::error::VmError;
use crate::memory::{CallFrame, FrameStack, Heap, Stack};
use crate::registers::Registers;
use crate::sourcemap::SourceMap;
use crate::value::{displace, Addr, Tag, Value};
use crate::opcode::Opcode;

/// The engine's terminal states (spec.md §4.8's state machine — `Running`
/// is implicit, it's just "no `Outcome` returned yet").
#[derive(Debug)]
pub enum Outcome {
    /// Reached `stop`, or ran off the end of the bytecode with no error.
    Stopped,
    /// A handler failed, or the error slot was populated by `err`.
    Faulted { error: VmError, last_instruction: usize },
}

/// The running machine. Generic over its standard input/output so that
/// tests can swap in an in-memory sink without touching real stdio.
pub struct Vm<'a, R, W> {
    reader: Reader<'a>,
    registers: Registers,
    stack: Stack,
    frames: FrameStack,
    heap: Heap<Value>,
    strings: Heap<u8>,
    source_map: Option<SourceMap>,
    stdin: R,
    stdout: W,
}

const MAX_LINE_BYTES: usize = 1 << 20;

impl<'a, R: BufRead, W: Write> Vm<'a, R, W> {
    pub fn new(bytecode: Reader<'a>, source_map: Option<SourceMap>, stdin: R, stdout: W) -> Self {
        Self {
            reader: bytecode,
            registers: Registers::new(),
            stack: Stack::new(),
            frames: FrameStack::new(),
            heap: Heap::new(),
            strings: Heap::new(),
            source_map,
            stdin,
            stdout,
        }
    }

    pub fn source_map(&self) -> Option<&SourceMap> {
        self.source_map.as_ref()
    }

    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    pub fn peek_stack(&self, index: usize) -> Result<Value, VmError> {
        self.stack.load(index)
    }

    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Result<Value, VmError> {
        self.stack.pop()
    }

    /// Derived view over the reader cursor (spec.md §4.7).
    pub fn code_pointer(&self) -> usize {
        self.reader.cursor()
    }

    pub fn set_code_pointer(&mut self, pos: usize) {
        self.reader.set_cursor(pos);
    }

    /// Derived view over the operand stack's length.
    pub fn stack_pointer(&self) -> usize {
        self.stack.len()
    }

    /// Explicitly a no-op: the stack's length can only change through
    /// push/pop, never by assigning a pointer (spec.md §4.7, §9).
    pub fn set_stack_pointer(&mut self, _ignored: usize) {}

    /// Runs until the machine stops or faults.
    pub fn run(&mut self) -> Outcome {
        loop {
            if self.registers.stop() || self.reader.end_of_file() {
                return Outcome::Stopped;
            }
            let last_instruction = self.reader.cursor();
            if let Err(error) = self.step() {
                warn!("runtime fault at {last_instruction:#06x}: {error}");
                return Outcome::Faulted { error, last_instruction };
            }
            if let Some(message) = self.registers.err().clone() {
                let error = VmError::RuntimeError(message);
                warn!("runtime error raised at {last_instruction:#06x}: {error}");
                return Outcome::Faulted { error, last_instruction };
            }
        }
    }

    fn step(&mut self) -> Result<(), VmError> {
        let opcode = self.reader.read_instruction()?;
        trace!("{:#06x}: {}", self.reader.cursor() - 1, opcode.mnemonic());
        self.execute(opcode)
    }

    fn pop_integer(&mut self) -> Result<i32, VmError> {
        Ok(self.stack.pop_as(Tag::Integer)?.as_integer().unwrap())
    }

    fn pop_float(&mut self) -> Result<f64, VmError> {
        Ok(self.stack.pop_as(Tag::Float)?.as_float().unwrap())
    }

    fn pop_address_string(&mut self) -> Result<Addr, VmError> {
        Ok(self.stack.pop_as(Tag::AddressString)?.as_addr().unwrap())
    }

    fn pop_address_heap(&mut self) -> Result<Addr, VmError> {
        Ok(self.stack.pop_as(Tag::AddressHeap)?.as_addr().unwrap())
    }

    fn pop_address_code(&mut self) -> Result<Addr, VmError> {
        Ok(self.stack.pop_as(Tag::AddressCode)?.as_addr().unwrap())
    }

    fn read_immediate_i32(&mut self) -> Result<i32, VmError> {
        self.reader.read_i32()
    }

    fn read_immediate_usize(&mut self) -> Result<usize, VmError> {
        self.reader.read_usize()
    }

    fn read_immediate_f64(&mut self) -> Result<f64, VmError> {
        self.reader.read_f64()
    }

    fn read_immediate_string(&mut self) -> Result<Vec<u8>, VmError> {
        self.reader.read_string()
    }

    fn string_equal(&self, a: Addr, b: Addr) -> Result<bool, VmError> {
        Ok(self.strings.load_all(a)? == self.strings.load_all(b)?)
    }

    /// `load`/`loadn`: dereference a stack or heap address plus offset.
    fn load_via(&self, addr: Value, offset: i32) -> Result<Value, VmError> {
        let base = addr.as_addr().ok_or_else(|| {
            VmError::TypeMismatch(format!("load expects an address, found {:?}", addr.tag()))
        })?;
        let effective = displace(base, offset);
        match addr.tag() {
            Tag::AddressHeap => self.heap.load(effective),
            Tag::AddressStack => self.stack.load(effective),
            other => Err(VmError::InvalidOperand(format!("cannot load through a {other:?} address"))),
        }
    }

    fn store_via(&mut self, addr: Value, offset: i32, value: Value) -> Result<(), VmError> {
        let base = addr.as_addr().ok_or_else(|| {
            VmError::TypeMismatch(format!("store expects an address, found {:?}", addr.tag()))
        })?;
        let effective = displace(base, offset);
        match addr.tag() {
            Tag::AddressHeap => self.heap.store(effective, value),
            Tag::AddressStack => self.stack.store(effective, value).map(|_| ()),
            other => Err(VmError::InvalidOperand(format!("cannot store through a {other:?} address"))),
        }
    }

    fn read_line_from_stdin(&mut self) -> Result<Vec<u8>, VmError> {
        let mut buf = Vec::new();
        self.stdin.read_until(b'\n', &mut buf)?;
        buf.truncate(buf.len().min(MAX_LINE_BYTES));
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        Ok(buf)
    }

    fn execute(&mut self, opcode: Opcode) -> Result<(), VmError> {
        // `Opcode::Err` is excluded from this glob import: bringing it into
        // scope unqualified would shadow `Result::Err` for every `Err(...)`
        // expression below.
        use Opcode::{
            Add, AllocN, Alloc, Atof, Atoi, Call, Concat, Div, Dup, DupN, Equal, FAdd, FCos, FDiv,
            FInf, FInfEq, FMul, FSin, FSub, FSup, FSupEq, Free, Ftoi, Inf, InfEq, Itof, Jump, Jz,
            Load, LoadN, Mod, Mul, Nop, Not, Padd, Pop, PopN, PushA, PushF, PushFP, PushG, PushGP,
            PushI, PushL, PushN, PushS, PushSP, Read, Return, Start, Stop, Store, StoreG, StoreL,
            StoreN, Strf, Stri, Sub, Sup, SupEq, Swap, WriteF, WriteI, WriteS, WritelnF, WritelnI,
            WritelnS, Debug,
        };
        match opcode {
            Nop | Debug => Ok(()),

            Stop => {
                self.registers.set_stop(true);
                Ok(())
            }

            Opcode::Err => {
                let bytes = self.read_immediate_string()?;
                let message = String::from_utf8_lossy(&bytes).into_owned();
                self.registers.set_err(message);
                Ok(())
            }

            Start => {
                self.registers.set_frame_pointer(self.stack.len());
                self.registers.set_global_pointer(self.stack.len());
                Ok(())
            }

            Call => {
                let addr = self.pop_address_code()?;
                self.frames.push(CallFrame {
                    frame_pointer: self.registers.frame_pointer(),
                    code_pointer: self.reader.cursor(),
                });
                self.registers.set_frame_pointer(self.stack.len());
                self.reader.set_cursor(addr);
                Ok(())
            }

            Return => {
                let frame = self.frames.pop()?;
                let ret = self.stack.pop()?;
                self.stack.truncate(frame.frame_pointer);
                self.stack.push(ret);
                self.registers.set_frame_pointer(frame.frame_pointer);
                self.reader.set_cursor(frame.code_pointer);
                Ok(())
            }

            Jump => {
                let addr = self.read_immediate_usize()?;
                self.reader.set_cursor(addr);
                Ok(())
            }

            Jz => {
                let addr = self.read_immediate_usize()?;
                let cond = self.pop_integer()?;
                if cond == 0 {
                    self.reader.set_cursor(addr);
                }
                Ok(())
            }

            PushA => {
                let addr = self.read_immediate_usize()?;
                self.stack.push(Value::AddressCode(addr));
                Ok(())
            }

            Dup => {
                let n = self.read_immediate_i32()? as usize;
                for v in self.stack.top_n(n)? {
                    self.stack.push(v);
                }
                Ok(())
            }

            DupN => {
                let n = self.pop_integer()? as usize;
                for v in self.stack.top_n(n)? {
                    self.stack.push(v);
                }
                Ok(())
            }

            Swap => {
                let b = self.stack.pop()?;
                let a = self.stack.pop()?;
                self.stack.push(b);
                self.stack.push(a);
                Ok(())
            }

            Pop => {
                let n = self.read_immediate_i32()?;
                for _ in 0..n {
                    self.stack.pop()?;
                }
                Ok(())
            }

            PopN => {
                let n = self.pop_integer()?;
                for _ in 0..n {
                    self.stack.pop()?;
                }
                Ok(())
            }

            PushI => {
                let v = self.read_immediate_i32()?;
                self.stack.push(Value::Integer(v));
                Ok(())
            }

            PushN => {
                let n = self.read_immediate_i32()?;
                for _ in 0..n {
                    self.stack.push(Value::Integer(0));
                }
                Ok(())
            }

            PushF => {
                let v = self.read_immediate_f64()?;
                self.stack.push(Value::Float(v));
                Ok(())
            }

            PushS => {
                let bytes = self.read_immediate_string()?;
                let addr = self.strings.adopt(bytes);
                self.stack.push(Value::AddressString(addr));
                Ok(())
            }

            PushG => {
                let offset = self.read_immediate_i32()?;
                let value = self.stack.load(displace(self.registers.global_pointer(), offset))?;
                self.stack.push(value);
                Ok(())
            }

            PushL => {
                let offset = self.read_immediate_i32()?;
                let value = self.stack.load(displace(self.registers.frame_pointer(), offset))?;
                self.stack.push(value);
                Ok(())
            }

            PushSP => {
                self.stack.push(Value::AddressStack(self.stack.len()));
                Ok(())
            }

            PushFP => {
                self.stack.push(Value::AddressStack(self.registers.frame_pointer()));
                Ok(())
            }

            PushGP => {
                self.stack.push(Value::AddressStack(self.registers.global_pointer()));
                Ok(())
            }

            Store => {
                let offset = self.read_immediate_i32()?;
                let value = self.stack.pop()?;
                let addr = self.stack.pop()?;
                self.store_via(addr, offset, value)
            }

            StoreN => {
                let value = self.stack.pop()?;
                let addr = self.stack.pop()?;
                let offset = self.pop_integer()?;
                self.store_via(addr, offset, value)
            }

            StoreL => {
                let offset = self.read_immediate_i32()?;
                let value = self.stack.pop()?;
                self.stack.store(displace(self.registers.frame_pointer(), offset), value)?;
                Ok(())
            }

            StoreG => {
                let offset = self.read_immediate_i32()?;
                let value = self.stack.pop()?;
                self.stack.store(displace(self.registers.global_pointer(), offset), value)?;
                Ok(())
            }

            Load => {
                let offset = self.read_immediate_i32()?;
                let addr = self.stack.pop()?;
                let value = self.load_via(addr, offset)?;
                self.stack.push(value);
                Ok(())
            }

            LoadN => {
                let offset = self.pop_integer()?;
                let addr = self.stack.pop()?;
                let value = self.load_via(addr, offset)?;
                self.stack.push(value);
                Ok(())
            }

            Padd => {
                let offset = self.pop_integer()?;
                let addr = self.stack.pop()?;
                let base = addr.as_addr().ok_or_else(|| {
                    VmError::TypeMismatch(format!("padd expects an address, found {:?}", addr.tag()))
                })?;
                self.stack.push(addr.with_addr(displace(base, offset)));
                Ok(())
            }

            Alloc => {
                let n = self.read_immediate_usize()?;
                let addr = self.heap.alloc(n);
                debug!("alloc {n} cells at {addr:#x}");
                self.stack.push(Value::AddressHeap(addr));
                Ok(())
            }

            AllocN => {
                let n = self.pop_integer()?;
                if n <= 0 {
                    return Err(VmError::InvalidOperand(format!("allocn requires a positive size, got {n}")));
                }
                let addr = self.heap.alloc(n as usize);
                debug!("alloc {n} cells at {addr:#x}");
                self.stack.push(Value::AddressHeap(addr));
                Ok(())
            }

            Free => {
                let addr = self.pop_address_heap()?;
                debug!("free {addr:#x}");
                self.heap.free(addr);
                Ok(())
            }

            Equal => {
                let b = self.stack.pop()?;
                let a = self.stack.pop()?;
                let equal = if a.tag() == Tag::AddressString && b.tag() == Tag::AddressString {
                    self.string_equal(a.as_addr().unwrap(), b.as_addr().unwrap())?
                } else {
                    a == b
                };
                self.stack.push(Value::Integer(equal as i32));
                Ok(())
            }

            Concat => {
                let b = self.pop_address_string()?;
                let a = self.pop_address_string()?;
                let bytes_a = self.strings.load_all(a)?;
                let bytes_b = self.strings.load_all(b)?;
                let addr = self.strings.alloc(bytes_a.len() + bytes_b.len());
                self.strings.store_many(addr, &bytes_a)?;
                self.strings.store_many(addr + bytes_a.len(), &bytes_b)?;
                self.stack.push(Value::AddressString(addr));
                Ok(())
            }

            Add => self.int_binop(i32::wrapping_add),
            Sub => self.int_binop(i32::wrapping_sub),
            Mul => self.int_binop(i32::wrapping_mul),
            Div => {
                let b = self.pop_integer()?;
                let a = self.pop_integer()?;
                let q = checked_floor_div(a, b)?;
                self.stack.push(Value::Integer(q));
                Ok(())
            }
            Mod => {
                let b = self.pop_integer()?;
                let a = self.pop_integer()?;
                if b == 0 {
                    return Err(VmError::InvalidOperand("mod by zero".into()));
                }
                let r = a % b;
                let r = if r != 0 && (r < 0) != (b < 0) { r + b } else { r };
                self.stack.push(Value::Integer(r));
                Ok(())
            }
            Inf => self.int_cmp(|a, b| a < b),
            InfEq => self.int_cmp(|a, b| a <= b),
            Sup => self.int_cmp(|a, b| a > b),
            SupEq => self.int_cmp(|a, b| a >= b),
            Not => {
                let v = self.pop_integer()?;
                self.stack.push(Value::Integer((v == 0) as i32));
                Ok(())
            }

            FAdd => self.float_binop(|a, b| a + b),
            FSub => self.float_binop(|a, b| a - b),
            FMul => self.float_binop(|a, b| a * b),
            FDiv => self.float_binop(|a, b| a / b),
            FInf => self.float_cmp(|a, b| a < b),
            FInfEq => self.float_cmp(|a, b| a <= b),
            FSup => self.float_cmp(|a, b| a > b),
            FSupEq => self.float_cmp(|a, b| a >= b),
            FCos => {
                let v = self.pop_float()?;
                self.stack.push(Value::Float(v.cos()));
                Ok(())
            }
            FSin => {
                let v = self.pop_float()?;
                self.stack.push(Value::Float(v.sin()));
                Ok(())
            }

            Atoi => {
                let addr = self.pop_address_string()?;
                let bytes = self.strings.load_all(addr)?;
                let text = std::str::from_utf8(&bytes)
                    .map_err(|e| VmError::InvalidOperand(format!("atoi: not valid utf-8: {e}")))?;
                let v: i32 = text
                    .trim()
                    .parse()
                    .map_err(|e| VmError::InvalidOperand(format!("atoi: {text:?}: {e}")))?;
                self.stack.push(Value::Integer(v));
                Ok(())
            }

            Atof => {
                let addr = self.pop_address_string()?;
                let bytes = self.strings.load_all(addr)?;
                let text = std::str::from_utf8(&bytes)
                    .map_err(|e| VmError::InvalidOperand(format!("atof: not valid utf-8: {e}")))?;
                let v: f64 = text
                    .trim()
                    .parse()
                    .map_err(|e| VmError::InvalidOperand(format!("atof: {text:?}: {e}")))?;
                self.stack.push(Value::Float(v));
                Ok(())
            }

            Itof => {
                let v = self.pop_integer()?;
                self.stack.push(Value::Float(v as f64));
                Ok(())
            }

            Ftoi => {
                let v = self.pop_float()?;
                self.stack.push(Value::Integer(v as i32));
                Ok(())
            }

            Stri => {
                let v = self.pop_integer()?;
                let addr = self.strings.adopt(v.to_string().into_bytes());
                self.stack.push(Value::AddressString(addr));
                Ok(())
            }

            Strf => {
                let v = self.pop_float()?;
                let addr = self.strings.adopt(v.to_string().into_bytes());
                self.stack.push(Value::AddressString(addr));
                Ok(())
            }

            Read => {
                let bytes = self.read_line_from_stdin()?;
                let addr = self.strings.adopt(bytes);
                self.stack.push(Value::AddressString(addr));
                Ok(())
            }

            WriteI => {
                let v = self.pop_integer()?;
                write!(self.stdout, "{v}")?;
                Ok(())
            }
            WritelnI => {
                let v = self.pop_integer()?;
                writeln!(self.stdout, "{v}")?;
                Ok(())
            }
            WriteF => {
                let v = self.pop_float()?;
                write!(self.stdout, "{v}")?;
                Ok(())
            }
            WritelnF => {
                let v = self.pop_float()?;
                writeln!(self.stdout, "{v}")?;
                Ok(())
            }
            WriteS => {
                let addr = self.pop_address_string()?;
                let bytes = self.strings.load_all(addr)?;
                self.stdout.write_all(&bytes)?;
                Ok(())
            }
            WritelnS => {
                let addr = self.pop_address_string()?;
                let bytes = self.strings.load_all(addr)?;
                self.stdout.write_all(&bytes)?;
                self.stdout.write_all(b"\n")?;
                Ok(())
            }
        }
    }

    fn int_binop(&mut self, f: impl Fn(i32, i32) -> i32) -> Result<(), VmError> {
        let b = self.pop_integer()?;
        let a = self.pop_integer()?;
        self.stack.push(Value::Integer(f(a, b)));
        Ok(())
    }

    fn int_cmp(&mut self, f: impl Fn(i32, i32) -> bool) -> Result<(), VmError> {
        let b = self.pop_integer()?;
        let a = self.pop_integer()?;
        self.stack.push(Value::Integer(f(a, b) as i32));
        Ok(())
    }

    fn float_binop(&mut self, f: impl Fn(f64, f64) -> f64) -> Result<(), VmError> {
        let b = self.pop_float()?;
        let a = self.pop_float()?;
        self.stack.push(Value::Float(f(a, b)));
        Ok(())
    }

    fn float_cmp(&mut self, f: impl Fn(f64, f64) -> bool) -> Result<(), VmError> {
        let b = self.pop_float()?;
        let a = self.pop_float()?;
        self.stack.push(Value::Integer(f(a, b) as i32));
        Ok(())
    }
}

/// Floor division: rounds the quotient toward negative infinity, matching
/// `div_floor` in languages that provide it natively (Rust's built-in `/`
/// truncates toward zero instead).
fn checked_floor_div(a: i32, b: i32) -> Result<i32, VmError> {
    if b == 0 {
        return Err(VmError::InvalidOperand("division by zero".into()));
    }
    let q = a / b;
    let r = a % b;
    Ok(if r != 0 && (r < 0) != (b < 0) { q - 1 } else { q })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble;
    use std::io::Cursor;

    fn run_program(src: &str, stdin: &str) -> (String, Outcome) {
        let program = assemble(src).unwrap_or_else(|e| panic!("{e}"));
        let mut stdout = Vec::new();
        let mut vm = Vm::new(
            program.bytecode,
            Some(program.source_map),
            Cursor::new(stdin.as_bytes().to_vec()),
            &mut stdout,
        );
        let outcome = vm.run();
        (String::from_utf8(stdout).unwrap(), outcome)
    }

    #[test]
    fn hello_world() {
        let (out, outcome) = run_program(r#"pushs "Hello\n" writes stop"#, "");
        assert_eq!(out, "Hello\n");
        assert!(matches!(outcome, Outcome::Stopped));
    }

    #[test]
    fn addition() {
        let (out, outcome) = run_program("pushi 2 pushi 3 add writelni stop", "");
        assert_eq!(out, "5\n");
        assert!(matches!(outcome, Outcome::Stopped));
    }

    #[test]
    fn labels_and_control_flow() {
        let src = "pushi 0 jz L1\npushs \"A\" writes stop\nL1: pushs \"B\" writes stop";
        let (out, _) = run_program(src, "");
        assert_eq!(out, "B");
    }

    #[test]
    fn call_return_with_locals() {
        let src = "start pushi 10 pusha F call writelni stop\nF: pushl -1 pushi 1 add return";
        let (out, outcome) = run_program(src, "");
        assert_eq!(out, "11\n");
        assert!(matches!(outcome, Outcome::Stopped));
    }

    #[test]
    fn heap_roundtrip() {
        let src = "pushi 3 allocn dup 1 pushi 42 store 1 load 1 writelni stop";
        let (out, outcome) = run_program(src, "");
        assert!(matches!(outcome, Outcome::Stopped), "{outcome:?}");
        assert_eq!(out, "42\n");
    }

    #[test]
    fn runtime_type_mismatch_faults() {
        let (_, outcome) = run_program("pushi 1 pushf 2.0 add", "");
        match outcome {
            Outcome::Faulted { error, .. } => assert!(matches!(error, VmError::TypeMismatch(_))),
            Outcome::Stopped => panic!("expected a fault"),
        }
    }

    #[test]
    fn equal_compares_string_contents_not_addresses() {
        let src = r#"pushs "hi" pushs "hi" equal writelni stop"#;
        let (out, _) = run_program(src, "");
        assert_eq!(out, "1\n");
    }

    #[test]
    fn read_strips_trailing_newline() {
        let (out, _) = run_program("read writes stop", "hello\n");
        assert_eq!(out, "hello");
    }

    #[test]
    fn floor_division_matches_spec() {
        assert_eq!(checked_floor_div(-7, 2).unwrap(), -4);
        assert_eq!(checked_floor_div(7, 2).unwrap(), 3);
        assert_eq!(checked_floor_div(7, -2).unwrap(), -4);
    }

    #[test]
    fn mod_matches_floor_division_identity() {
        // a = (a div b) * b + (a mod b), for every combination of signs.
        for (a, b) in [(7, 2), (-7, 2), (7, -2), (-7, -2)] {
            let src = format!("pushi {a} pushi {b} mod writelni stop");
            let (out, _) = run_program(&src, "");
            let r: i32 = out.trim().parse().unwrap();
            let q = checked_floor_div(a, b).unwrap();
            assert_eq!(q * b + r, a, "a={a} b={b} q={q} r={r}");
        }
    }

    #[test]
    fn start_sets_global_pointer_to_the_current_stack_length() {
        // Two values pushed before `start` must not be addressable as
        // globals: `pushg 0` should read the slot `start` reserved via
        // `pushn 1`, not slide back to stack index 0.
        let src = "pushi 1 pushi 2 start pushn 1 pushi 99 storeg 0 pushg 0 writelni stop";
        let (out, outcome) = run_program(src, "");
        assert!(matches!(outcome, Outcome::Stopped), "{outcome:?}");
        assert_eq!(out, "99\n");
    }

    #[test]
    fn concat_of_empty_strings_round_trips_as_empty() {
        let src = r#"pushs "" pushs "" concat writes stop"#;
        let (out, outcome) = run_program(src, "");
        assert!(matches!(outcome, Outcome::Stopped), "{outcome:?}");
        assert_eq!(out, "");
    }

    #[test]
    fn empty_string_literal_loads_as_empty_not_invalid_address() {
        let src = r#"pushs "" writes stop"#;
        let (out, outcome) = run_program(src, "");
        assert!(matches!(outcome, Outcome::Stopped), "{outcome:?}");
        assert_eq!(out, "");
    }

    #[test]
    fn err_opcode_terminates_with_runtime_error() {
        let (_, outcome) = run_program(r#"err "boom""#, "");
        match outcome {
            Outcome::Faulted { error, .. } => assert_eq!(error.to_string(), "boom"),
            Outcome::Stopped => panic!("expected a runtime error"),
        }
    }

    #[test]
    fn stack_pointer_tracks_stack_length() {
        let program = assemble("pushi 1 pushi 2 pushi 3 stop").unwrap();
        let mut stdout = Vec::new();
        let mut vm = Vm::new(program.bytecode, None, Cursor::new(Vec::new()), &mut stdout);
        vm.run();
        assert_eq!(vm.stack_pointer(), vm.stack_len());
        assert_eq!(vm.stack_pointer(), 3);
    }
}
