//! Acceptance tests for the Kestrel interpreter
//!
//! These scenarios drive the parser → interpreter pipeline through the
//! `InterpreterSession` harness, one language area per file.

mod test_acceptance_errors;
mod test_acceptance_imports;
