//! Source map (component C3): an ordered mapping from bytecode instruction
//! offset to the source-text span that produced it, used solely by the
//! diagnostic path — never consulted during normal execution.

use crate::index::OrderedIndex;

/// A zero-based text position; diagnostics print the one-based form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub byte_offset: usize,
}

/// The source span an emitted instruction (mnemonic plus operand) came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub instruction_offset: usize,
    pub start: Position,
    pub end: Position,
}

/// Ordered offset -> span map, populated by the assembler via
/// [`SourceMap::begin`]/[`SourceMap::end`] around each emitted instruction.
#[derive(Debug, Default)]
pub struct SourceMap {
    index: OrderedIndex<usize, Span>,
    pending: Option<(usize, Position)>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Call before emitting an instruction's bytes.
    pub fn begin(&mut self, instruction_offset: usize, start: Position) {
        self.pending = Some((instruction_offset, start));
    }

    /// Call after emitting the instruction (mnemonic and operand).
    pub fn end(&mut self, end: Position) {
        if let Some((instruction_offset, start)) = self.pending.take() {
            self.index.insert(instruction_offset, Span { instruction_offset, start, end });
        }
    }

    /// The span of the instruction currently executing: the greatest
    /// instruction offset `<= offset`. By the time a fault is raised the
    /// reader cursor points past the faulting instruction, so callers pass
    /// `last_instruction` (the cursor value recorded before decoding), not
    /// the live cursor.
    pub fn find(&self, offset: usize) -> Option<&Span> {
        self.index.closest_smaller(&offset).map(|(_, span)| span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_monotonically_non_decreasing() {
        let mut sm = SourceMap::new();
        for (off, line) in [(0, 1), (3, 2), (7, 3)] {
            sm.begin(off, Position { line, column: 0, byte_offset: off });
            sm.end(Position { line, column: 5, byte_offset: off + 4 });
        }
        assert!(!sm.is_empty());
        let offsets: Vec<usize> =
            (0..10).filter_map(|o| sm.find(o)).map(|s| s.instruction_offset).collect();
        let mut sorted = offsets.clone();
        sorted.sort();
        assert_eq!(offsets, sorted);
    }

    #[test]
    fn find_resolves_to_the_containing_instruction() {
        let mut sm = SourceMap::new();
        sm.begin(0, Position { line: 1, column: 0, byte_offset: 0 });
        sm.end(Position { line: 1, column: 5, byte_offset: 5 });
        sm.begin(5, Position { line: 2, column: 0, byte_offset: 6 });
        sm.end(Position { line: 2, column: 3, byte_offset: 9 });

        assert_eq!(sm.find(0).unwrap().instruction_offset, 0);
        assert_eq!(sm.find(4).unwrap().instruction_offset, 0);
        assert_eq!(sm.find(5).unwrap().instruction_offset, 5);
        assert_eq!(sm.find(100).unwrap().instruction_offset, 5);
    }
}
