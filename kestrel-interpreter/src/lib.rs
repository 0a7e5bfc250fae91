//! Kestrel Interpreter
//!
//! A tree-walking runtime for the Kestrel scripting language. Programs are
//! parsed by `kestrel-parser` and evaluated directly from the AST:
//! - Values are a closed enum; collections and objects alias shared storage
//! - Scopes are reference-counted environments chained to their parents
//! - Errors travel as `Result`, other control flow as a `Signal`
//! - Imports load, parse and evaluate modules into namespaces

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::result_large_err)]

pub mod arguments;
pub mod builtins;
pub mod call_stack;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod interpreter;
pub mod libraries;
pub mod modules;
pub mod operators;
pub mod properties;
pub mod signal;
pub mod stack;
pub mod statements;
pub mod test_harness;
pub mod value;

// Include tests directory with all test modules
#[cfg(test)]
#[path = "tests/mod.rs"]
mod tests;

// Re-export public API
pub use call_stack::{CallFrame, CallStack, MAX_CALL_STACK_DEPTH};
pub use environment::{Env, Environment};
pub use error::{ErrorKind, ErrorValue, Location, Result, RuntimeError};
pub use interpreter::{Interpreter, InterpreterConfig, InterpreterError, Output};
pub use modules::{
    FileSystemLoader, ImportTracker, InMemoryLoader, ModuleLoader, ModuleSource,
    NativeLibraryLoader, NativeRegistry,
};
pub use signal::Signal;
pub use test_harness::{InterpreterSession, TestHarnessError};
pub use value::Value;

/// Convenience function for running a source string as the module `main.kes`
///
/// This is mainly useful for embedding and quick experiments.
pub fn run_source(source: &str) -> std::result::Result<Value, InterpreterError> {
    Interpreter::new().run_source(source, "main")
}
