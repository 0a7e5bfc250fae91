//! Runtime error types for the Kestrel interpreter.
//!
//! Kestrel has no native exception mechanism: every evaluator returns a
//! `Result`, and the error side carries a [`RuntimeError`]. Inside the
//! language the same information is visible as an [`ErrorValue`], which is
//! what `catch` binds to `error` and what the `error()` builtin produces.

use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

use crate::call_stack::CallFrame;
use crate::signal::LoopExit;

/// The closed taxonomy of runtime error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    RuntimeError,
    IdentifierError,
    TypeError,
    InvalidIndexError,
    InvalidArgumentError,
    PropertyError,
    InvalidConversionError,
    ZeroDivisionError,
    CircularImportError,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 9] = [
        ErrorKind::RuntimeError,
        ErrorKind::IdentifierError,
        ErrorKind::TypeError,
        ErrorKind::InvalidIndexError,
        ErrorKind::InvalidArgumentError,
        ErrorKind::PropertyError,
        ErrorKind::InvalidConversionError,
        ErrorKind::ZeroDivisionError,
        ErrorKind::CircularImportError,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::RuntimeError => "RuntimeError",
            ErrorKind::IdentifierError => "IdentifierError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::InvalidIndexError => "InvalidIndexError",
            ErrorKind::InvalidArgumentError => "InvalidArgumentError",
            ErrorKind::PropertyError => "PropertyError",
            ErrorKind::InvalidConversionError => "InvalidConversionError",
            ErrorKind::ZeroDivisionError => "ZeroDivisionError",
            ErrorKind::CircularImportError => "CircularImportError",
        }
    }

    /// Look up a kind by its display name
    pub fn from_name(name: &str) -> Option<ErrorKind> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An error as seen from inside the language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorValue {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorValue {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Where an error escaped from: the module and the source line of the statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub module: String,
    pub line: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.line)
    }
}

/// Runtime errors raised during evaluation
#[derive(Error, Debug, Clone)]
#[error("{kind}: {message}{}", format_location(.location))]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    /// Stamped by the first statement the error escapes from
    pub location: Option<Location>,
    /// Active call frames at the point of failure, innermost first
    pub trace: Vec<CallFrame>,
    /// Set when this is a loop signal unwinding out of a function call
    loop_exit: Option<LoopExit>,
}

fn format_location(location: &Option<Location>) -> String {
    match location {
        Some(location) => format!(" (at {})", location),
        None => String::new(),
    }
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
            trace: Vec::new(),
            loop_exit: None,
        }
    }

    /// Carry a `break` or `continue` out of a function body
    pub fn loop_exit(exit: LoopExit) -> Self {
        let keyword = match exit {
            LoopExit::Break => "break",
            LoopExit::Continue => "continue",
        };
        Self {
            loop_exit: Some(exit),
            ..Self::runtime(format!("'{}' outside of a loop", keyword))
        }
    }

    /// The loop signal this error is carrying, if any
    pub fn as_loop_exit(&self) -> Option<LoopExit> {
        self.loop_exit
    }

    /// Create a generic runtime error
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RuntimeError, message)
    }

    /// Create an identifier error
    pub fn identifier(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IdentifierError, message)
    }

    /// Create a type error
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    /// Create an invalid index error
    pub fn invalid_index(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidIndexError, message)
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgumentError, message)
    }

    /// Create a property error naming the missing property
    pub fn property(type_name: &str, property: &str) -> Self {
        Self::new(
            ErrorKind::PropertyError,
            format!("{} has no property '{}'", type_name, property),
        )
    }

    /// Create an invalid conversion error
    pub fn invalid_conversion(type_name: &str, target: &str) -> Self {
        Self::new(
            ErrorKind::InvalidConversionError,
            format!("cannot convert {} to {}", type_name, target),
        )
    }

    /// Create a division by zero error
    pub fn zero_division() -> Self {
        Self::new(ErrorKind::ZeroDivisionError, "division by zero")
    }

    /// Create a circular import error
    pub fn circular_import(module: &str, importer: &str) -> Self {
        Self::new(
            ErrorKind::CircularImportError,
            format!("circular import of '{}' from '{}'", module, importer),
        )
    }

    /// The in-language view of this error
    pub fn to_value(&self) -> ErrorValue {
        ErrorValue::new(self.kind, self.message.clone())
    }

    /// Record where the error escaped, unless an inner statement already did
    pub fn locate(
        mut self,
        module: &str,
        line: usize,
        snapshot: impl FnOnce() -> Vec<CallFrame>,
    ) -> Self {
        if self.location.is_none() {
            self.location = Some(Location {
                module: module.to_string(),
                line,
            });
            self.trace = snapshot();
        }
        self
    }

    /// Backtrace rendered one frame per line, innermost first
    pub fn format_backtrace(&self) -> String {
        self.trace
            .iter()
            .map(|frame| format!("  in {}", frame))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<ErrorValue> for RuntimeError {
    fn from(value: ErrorValue) -> Self {
        Self::new(value.kind, value.message)
    }
}

impl Diagnostic for RuntimeError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!("kestrel::runtime::{}", self.kind)))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        if self.trace.is_empty() {
            return None;
        }
        Some(Box::new(format!("backtrace:\n{}", self.format_backtrace())))
    }
}

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;
