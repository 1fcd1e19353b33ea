//! Shared diagnostic rendering (spec.md §6): the two CLI binaries format
//! assembly and runtime failures the same way, so the formatting lives here
//! once instead of being duplicated at each `main`.

use crate::assembler::AssembleFailure;
use crate::error::VmError;
use crate::sourcemap::SourceMap;

fn line_text(source: &str, line: usize) -> &str {
    source.lines().nth(line).unwrap_or("")
}

/// `ERROR Ln L, Col C: <message>\n\t<source line>\n`
pub fn format_assemble_error(source: &str, failure: &AssembleFailure) -> String {
    let line = failure.position.line + 1;
    let column = failure.position.column + 1;
    let source_line = line_text(source, failure.position.line);
    format!("ERROR Ln {line}, Col {column}: {}\n\t{source_line}\n", failure.error)
}

/// `Runtime Error in Ln L, Col C: <message>\n\t<span text>\n`
///
/// Falls back to the containing source line when the fault happened past
/// the last instruction the source map recorded (e.g. bytecode loaded
/// without its originating source).
pub fn format_runtime_error(
    source: &str,
    source_map: Option<&SourceMap>,
    last_instruction: usize,
    error: &VmError,
) -> String {
    let span = source_map.and_then(|map| map.find(last_instruction));
    match span {
        Some(span) => {
            let line = span.start.line + 1;
            let column = span.start.column + 1;
            let text = source
                .get(span.start.byte_offset..span.end.byte_offset)
                .unwrap_or_else(|| line_text(source, span.start.line))
                .trim();
            format!("Runtime Error in Ln {line}, Col {column}: {error}\n\t{text}\n")
        }
        None => format!("Runtime Error in Ln ?, Col ?: {error}\n\t<no source map entry for offset {last_instruction:#x}>\n"),
    }
}
