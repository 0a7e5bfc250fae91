//! Error kinds, locations and backtraces

use miette::Diagnostic;
use pretty_assertions::assert_eq;

use crate::call_stack::CallFrame;
use crate::error::{ErrorKind, Location};
use crate::interpreter::{Interpreter, InterpreterError};
use crate::test_harness::InterpreterSession;

fn runtime_error(source: &str) -> crate::error::RuntimeError {
    match Interpreter::new().run_source(source, "main") {
        Err(InterpreterError::Runtime(error)) => error,
        other => panic!("Expected runtime error, got {:?}", other),
    }
}

#[test]
fn test_error_location_is_the_failing_statement() {
    let error = runtime_error("var a = 1\nvar b = 2\nvar c = a + missing\nvar d = 4");

    assert_eq!(error.kind, ErrorKind::IdentifierError);
    assert_eq!(
        error.location,
        Some(Location {
            module: "main.kes".to_string(),
            line: 3,
        })
    );
    assert!(error.trace.is_empty());
}

#[test]
fn test_backtrace_lists_frames_innermost_first() {
    let error = runtime_error(
        "fn inner() {\n    return 1 / 0\n}\nfn outer() {\n    return inner()\n}\nouter()",
    );

    assert_eq!(error.kind, ErrorKind::ZeroDivisionError);
    assert_eq!(error.location.as_ref().map(|l| l.line), Some(2));
    assert_eq!(
        error.trace,
        vec![CallFrame::new("inner", "main.kes", 5), CallFrame::new("outer", "main.kes", 7)]
    );
    assert_eq!(
        error.format_backtrace(),
        "  in inner (called at main.kes:5)\n  in outer (called at main.kes:7)"
    );
    assert_eq!(
        error.to_string(),
        "ZeroDivisionError: division by zero (at main.kes:2)"
    );
    assert!(error.help().is_some());
}

#[test]
fn test_method_frames_are_named_after_the_struct() {
    let error = runtime_error(
        "struct Box { value }\nBox -> fn open() {\n    return this.lid\n}\nvar b = Box{value: 1}\nb.open()",
    );

    assert_eq!(error.kind, ErrorKind::PropertyError);
    assert_eq!(error.message, "Box has no property 'lid'");
    assert_eq!(error.trace.len(), 1);
    assert_eq!(error.trace[0].function, "Box.open");
    assert_eq!(error.trace[0].line, 6);
}

#[test]
fn test_undeclared_and_redeclared_identifiers() {
    let mut session = InterpreterSession::new();

    let error = session
        .assert_error_kind("missing", ErrorKind::IdentifierError)
        .unwrap();
    assert!(error.message.contains("missing"));

    session
        .assert_error_kind("x = 1", ErrorKind::IdentifierError)
        .unwrap();

    session.evaluate("var x = 1").unwrap();
    session
        .assert_error_kind("var x = 2", ErrorKind::IdentifierError)
        .unwrap();
    // Shadowing in an inner scope is allowed
    session
        .evaluate("if true { var x = 2 }")
        .unwrap();
}

#[test]
fn test_error_builtin_raises_with_kind() {
    let mut session = InterpreterSession::new();

    let error = session
        .assert_error_kind("error(\"custom failure\")", ErrorKind::RuntimeError)
        .unwrap();
    assert_eq!(error.message, "custom failure");

    let error = session
        .assert_error_kind(
            "error(\"bad input\", \"InvalidArgumentError\")",
            ErrorKind::InvalidArgumentError,
        )
        .unwrap();
    assert_eq!(error.message, "bad input");

    let error = session
        .assert_error_kind("error(\"x\", \"NoSuchError\")", ErrorKind::InvalidArgumentError)
        .unwrap();
    assert_eq!(error.message, "unknown error kind 'NoSuchError'");
}

#[test]
fn test_assert_builtin() {
    let mut session = InterpreterSession::new();

    session.assert_evaluates_to_nothing("assert(1 < 2)").unwrap();
    let error = session
        .assert_error_kind("assert(false, \"numbers broke\")", ErrorKind::RuntimeError)
        .unwrap();
    assert_eq!(error.message, "numbers broke");
    let error = session
        .assert_error_kind("assert(false)", ErrorKind::RuntimeError)
        .unwrap();
    assert_eq!(error.message, "assertion failed");
}

#[test]
fn test_argument_errors_from_natives() {
    let mut session = InterpreterSession::new();

    let error = session
        .assert_error_kind("range(\"3\")", ErrorKind::InvalidArgumentError)
        .unwrap();
    assert_eq!(error.message, "range() expects a Number for argument 1, got String");
    session
        .assert_error_kind("\"abc\".split()", ErrorKind::InvalidArgumentError)
        .unwrap();
}

#[test]
fn test_session_recovers_after_an_error() {
    let mut session = InterpreterSession::new();

    session.evaluate("var total = 1").unwrap();
    session
        .assert_error_kind("total = total / 0", ErrorKind::ZeroDivisionError)
        .unwrap();
    session.assert_evaluates_to_number("total", 1.0).unwrap();
}
