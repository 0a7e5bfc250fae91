//! Interpreter session for the Kestrel interpreter
//!
//! An [`InterpreterSession`] runs source snippets against one persistent
//! module environment, so bindings made by one `evaluate` call are visible
//! to the next (REPL-like behavior). Output from `print`/`println` is
//! captured and can be inspected with [`InterpreterSession::output`].

use std::cell::RefCell;
use std::rc::Rc;

use kestrel_parser::ParseError;
use miette::Diagnostic;
use thiserror::Error;

use crate::environment::Env;
use crate::error::{ErrorKind, RuntimeError};
use crate::interpreter::{Interpreter, InterpreterConfig, InterpreterError, Output};
use crate::modules::ModuleLoader;
use crate::value::Value;

/// Errors that can occur during test harness operations
#[derive(Debug, Error, Diagnostic)]
pub enum TestHarnessError {
    #[error("Parse error: {source}")]
    Parse {
        #[from]
        source: ParseError,
    },

    #[error("Runtime error: {source}")]
    Runtime {
        #[from]
        source: RuntimeError,
    },

    #[error("Assertion failed: expected {expected}, but got {actual}")]
    AssertionFailed { expected: String, actual: String },

    #[error("Type error: expected {expected_type}, got {actual_type}")]
    TypeError {
        expected_type: String,
        actual_type: String,
    },

    #[error("Variable not found: {name}")]
    VariableNotFound { name: String },

    #[error("Expected {expected} error, but evaluation succeeded with {actual}")]
    UnexpectedSuccess { expected: String, actual: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<InterpreterError> for TestHarnessError {
    fn from(error: InterpreterError) -> Self {
        match error {
            InterpreterError::Parse(source) => TestHarnessError::Parse { source },
            InterpreterError::Runtime(source) => TestHarnessError::Runtime { source },
            other => TestHarnessError::Internal {
                message: other.to_string(),
            },
        }
    }
}

/// Interpreter session for evaluating Kestrel snippets
pub struct InterpreterSession {
    interpreter: Interpreter,
    /// Module scope shared by every evaluation in the session
    env: Env,
    /// Everything written by `print` and `println`
    output: Rc<RefCell<Vec<u8>>>,
}

impl InterpreterSession {
    /// Module name used for session code
    pub const MODULE: &'static str = "main.kes";

    /// Create a new interpreter session
    pub fn new() -> Self {
        Self::build(Interpreter::new())
    }

    /// Session with a custom configuration
    pub fn with_config(config: InterpreterConfig) -> Self {
        Self::build(Interpreter::with_config(config))
    }

    /// Session whose imports are served by `loader`
    pub fn with_loader(loader: impl ModuleLoader + 'static) -> Self {
        Self::build(Interpreter::new().with_loader(loader))
    }

    fn build(interpreter: Interpreter) -> Self {
        let output = Rc::new(RefCell::new(Vec::new()));
        let sink: Output = output.clone();
        let interpreter = interpreter.with_output(sink);
        let env = interpreter.session_environment(Self::MODULE);

        Self {
            interpreter,
            env,
            output,
        }
    }

    /// Execute Kestrel source and return the value of its last statement
    pub fn evaluate(&mut self, source: &str) -> Result<Value, TestHarnessError> {
        Ok(self.interpreter.evaluate_in(source, &self.env)?)
    }

    /// Everything printed so far
    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.output.borrow()).into_owned()
    }

    /// Look up a binding made by earlier evaluations
    pub fn get_variable(&self, name: &str) -> Result<Value, TestHarnessError> {
        self.env
            .lookup(name)
            .map_err(|_| TestHarnessError::VariableNotFound {
                name: name.to_string(),
            })
    }

    /// Execute code and assert it evaluates to a specific number
    pub fn assert_evaluates_to_number(
        &mut self,
        source: &str,
        expected: f64,
    ) -> Result<(), TestHarnessError> {
        match self.evaluate(source)? {
            Value::Number(value) if value == expected => Ok(()),
            Value::Number(value) => Err(TestHarnessError::AssertionFailed {
                expected: expected.to_string(),
                actual: value.to_string(),
            }),
            other => Err(type_mismatch("Number", &other)),
        }
    }

    /// Execute code and assert it evaluates to a specific string
    pub fn assert_evaluates_to_string(
        &mut self,
        source: &str,
        expected: &str,
    ) -> Result<(), TestHarnessError> {
        match self.evaluate(source)? {
            Value::String(text) => {
                let actual = text.text();
                if actual == expected {
                    Ok(())
                } else {
                    Err(TestHarnessError::AssertionFailed {
                        expected: format!("{:?}", expected),
                        actual: format!("{:?}", actual),
                    })
                }
            }
            other => Err(type_mismatch("String", &other)),
        }
    }

    /// Execute code and assert it evaluates to a specific boolean
    pub fn assert_evaluates_to_bool(
        &mut self,
        source: &str,
        expected: bool,
    ) -> Result<(), TestHarnessError> {
        match self.evaluate(source)? {
            Value::Bool(value) if value == expected => Ok(()),
            Value::Bool(value) => Err(TestHarnessError::AssertionFailed {
                expected: expected.to_string(),
                actual: value.to_string(),
            }),
            other => Err(type_mismatch("Bool", &other)),
        }
    }

    /// Execute code and assert it evaluates to `nothing`
    pub fn assert_evaluates_to_nothing(&mut self, source: &str) -> Result<(), TestHarnessError> {
        match self.evaluate(source)? {
            Value::Nothing => Ok(()),
            other => Err(type_mismatch("Nothing", &other)),
        }
    }

    /// Execute code and assert its value displays as `expected`
    pub fn assert_displays_as(
        &mut self,
        source: &str,
        expected: &str,
    ) -> Result<(), TestHarnessError> {
        let actual = self.evaluate(source)?.to_display_string();
        if actual == expected {
            Ok(())
        } else {
            Err(TestHarnessError::AssertionFailed {
                expected: expected.to_string(),
                actual,
            })
        }
    }

    /// Execute code and assert it fails at runtime with the given kind
    pub fn assert_error_kind(
        &mut self,
        source: &str,
        expected: ErrorKind,
    ) -> Result<RuntimeError, TestHarnessError> {
        match self.evaluate(source) {
            Err(TestHarnessError::Runtime { source }) if source.kind == expected => Ok(source),
            Err(TestHarnessError::Runtime { source }) => Err(TestHarnessError::AssertionFailed {
                expected: expected.to_string(),
                actual: source.to_string(),
            }),
            Err(other) => Err(other),
            Ok(value) => Err(TestHarnessError::UnexpectedSuccess {
                expected: expected.to_string(),
                actual: value.repr(),
            }),
        }
    }
}

impl Default for InterpreterSession {
    fn default() -> Self {
        Self::new()
    }
}

fn type_mismatch(expected: &str, actual: &Value) -> TestHarnessError {
    TestHarnessError::TypeError {
        expected_type: expected.to_string(),
        actual_type: format!("{} ({})", actual.type_name(), actual.repr()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bindings_persist_between_evaluations() {
        let mut session = InterpreterSession::new();
        session.evaluate("var greeting = \"hi\"").unwrap();
        session
            .assert_evaluates_to_string("greeting + \"!\"", "hi!")
            .unwrap();
        assert!(session.get_variable("greeting").is_ok());
        assert!(matches!(
            session.get_variable("missing"),
            Err(TestHarnessError::VariableNotFound { .. })
        ));
    }

    #[test]
    fn test_assertion_failures_are_reported() {
        let mut session = InterpreterSession::new();
        assert!(matches!(
            session.assert_evaluates_to_number("1 + 1", 3.0),
            Err(TestHarnessError::AssertionFailed { .. })
        ));
        assert!(matches!(
            session.assert_evaluates_to_bool("1", true),
            Err(TestHarnessError::TypeError { .. })
        ));
        assert!(matches!(
            session.assert_error_kind("1", ErrorKind::TypeError),
            Err(TestHarnessError::UnexpectedSuccess { .. })
        ));
    }

    #[test]
    fn test_output_is_captured() {
        let mut session = InterpreterSession::new();
        session.evaluate("println(\"a\", 1)\nprint(\"b\")").unwrap();
        assert_eq!(session.output(), "a 1\nb");
    }

    #[test]
    fn test_parse_errors_surface() {
        let mut session = InterpreterSession::new();
        assert!(matches!(
            session.evaluate("var = "),
            Err(TestHarnessError::Parse { .. })
        ));
    }
}
