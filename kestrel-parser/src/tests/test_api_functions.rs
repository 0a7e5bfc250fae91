// Test public API functions
// Ensures public parse functions work correctly

use super::shape;
use crate::*;

#[test]
fn test_parse_expression_api() {
    let expression = parse_expression("1 + 2 * 3").unwrap();
    assert_eq!(shape(&expression), "(+ 1 (* 2 3))");
}

#[test]
fn test_parse_program_api() {
    let input = "var x = 42\nvar y = true";
    let program = parse_program(input).unwrap();

    // Newlines are plain whitespace between statements
    assert_eq!(program.statements.len(), 2);
    assert_eq!(program.source_file, None);
}

#[test]
fn test_parse_program_with_source_api() {
    let program = parse_program_with_source("println(1)", Some("main.kes".to_string())).unwrap();
    assert_eq!(program.source_file.as_deref(), Some("main.kes"));
}

#[test]
fn test_empty_program() {
    let program = parse_program("  // nothing here\n").unwrap();
    assert!(program.statements.is_empty());
}

#[test]
fn test_statement_lines() {
    let input = "var a = 1\n\n/* block\ncomment */ var b = 2;\nprint(a)";
    let program = parse_program(input).unwrap();

    let lines: Vec<usize> = program.statements.iter().map(Statement::line).collect();
    assert_eq!(lines, vec![1, 4, 5]);
}

#[test]
fn test_version_metadata() {
    assert_eq!(NAME, "kestrel-parser");
    assert!(!VERSION.is_empty());
}
