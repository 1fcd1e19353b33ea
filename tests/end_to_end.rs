//! End-to-end scenarios from spec.md §8, run against the public crate API:
//! assemble a textual program, run it with an in-memory stdout sink, and
//! check what came out plus how the machine terminated.

use std::io::Cursor;

use stackvm::vm::{Outcome, Vm};
use stackvm::{assemble, VmError};

fn run(src: &str, stdin: &str) -> (String, Outcome) {
    let program = assemble(src).unwrap_or_else(|e| panic!("assembly failed: {e}"));
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
    let (out, outcome) = run(r#"pushs "Hello\n" writes stop"#, "");
    assert_eq!(out, "Hello\n");
    assert!(matches!(outcome, Outcome::Stopped));
}

#[test]
fn addition() {
    let (out, outcome) = run("pushi 2 pushi 3 add writelni stop", "");
    assert_eq!(out, "5\n");
    assert!(matches!(outcome, Outcome::Stopped));
}

#[test]
fn labels_and_control_flow() {
    let src = r#"
        pushi 0 jz L1
        pushs "A" writes stop
        L1: pushs "B" writes stop
    "#;
    let (out, outcome) = run(src, "");
    assert_eq!(out, "B");
    assert!(matches!(outcome, Outcome::Stopped));
}

#[test]
fn call_return_with_locals() {
    let src = r#"
        start pushi 10 pusha F call writelni stop
        F: pushl -1 pushi 1 add return
    "#;
    let (out, outcome) = run(src, "");
    assert_eq!(out, "11\n");
    assert!(matches!(outcome, Outcome::Stopped));
}

#[test]
fn heap_round_trip() {
    let src = "pushi 3 allocn dup 1 pushi 42 store 1 load 1 writelni stop";
    let (out, outcome) = run(src, "");
    assert_eq!(out, "42\n");
    assert!(matches!(outcome, Outcome::Stopped));
}

#[test]
fn runtime_type_mismatch_faults_on_the_add_instruction() {
    let src = "pushi 1 pushf 2.0 add";
    let (_, outcome) = run(src, "");
    match outcome {
        Outcome::Faulted { error, .. } => assert!(matches!(error, VmError::TypeMismatch(_))),
        Outcome::Stopped => panic!("expected a TypeMismatch fault"),
    }
}

#[test]
fn call_balance_survives_intermediate_pushes() {
    let src = r#"
        start pushi 1 pushi 2 pusha F call writelni stop
        F: pushl -2 pushl -1 add pushi 999 pop 1 return
    "#;
    let (out, outcome) = run(src, "");
    assert_eq!(out, "3\n");
    assert!(matches!(outcome, Outcome::Stopped));
}

#[test]
fn read_then_concat_round_trips_through_the_string_heap() {
    let src = r#"read pushs "!" concat writeln stop"#.replace("writeln", "writelns");
    let (out, outcome) = run(&src, "hi\n");
    assert_eq!(out, "hi!\n");
    assert!(matches!(outcome, Outcome::Stopped));
}
