//! Register file (component C7).
//!
//! `code_pointer` and `stack_pointer` are not stored here: they are
//! derived views over the bytecode reader's cursor and the operand
//! stack's length respectively (spec.md §4.7), so they live as methods on
//! [`crate::vm::Vm`] instead of fields on this struct. What remains —
//! the frame pointer, global pointer, stop flag, and error slot — are
//! plain fields with `getset`-derived accessors, matching the teacher's
//! `RegisterSet` (`examples/boki1-Nessy/src/mos6502.rs`).

use crate::value::Addr;
use getset::{CopyGetters, Getters, MutGetters, Setters};

#[derive(Debug, Default, Getters, CopyGetters, Setters, MutGetters)]
pub struct Registers {
    /// Base of the currently executing function's locals, set by `start`
    /// (global frame) and by `call` (each new frame).
    #[getset(get_copy = "pub", set = "pub")]
    frame_pointer: Addr,

    /// Base of module-level globals, set once by `start`.
    #[getset(get_copy = "pub", set = "pub")]
    global_pointer: Addr,

    /// Set by `stop`; checked by the execution loop after every handler.
    #[getset(get_copy = "pub", set = "pub")]
    stop: bool,

    /// Owns the user-emitted runtime error message, if any. Populated by
    /// `err`; once set, the loop terminates on its next check.
    #[getset(get = "pub", get_mut = "pub")]
    err: Option<String>,
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_err(&mut self, message: String) {
        self.err = Some(message);
    }

    pub fn has_err(&self) -> bool {
        self.err.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_registers_have_no_error_and_are_not_stopped() {
        let regs = Registers::new();
        assert!(!regs.has_err());
        assert!(!regs.stop());
    }
}
