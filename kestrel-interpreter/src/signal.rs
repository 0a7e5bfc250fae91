//! Control-flow signals produced by statement evaluation.
//!
//! Errors travel on the `Err` side of the evaluator's `Result`; everything
//! else a statement can do to its enclosing construct is a [`Signal`].

use crate::value::Value;

#[derive(Debug, Clone)]
pub enum Signal {
    /// Normal completion, carrying the statement's value
    Value(Value),
    /// `return`, carrying the returned value
    Return(Value),
    Break,
    Continue,
}

/// A `break` or `continue` that left a function body. It travels to the
/// caller as an error and becomes a [`Signal`] again at the calling statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Break,
    Continue,
}

impl From<LoopExit> for Signal {
    fn from(exit: LoopExit) -> Self {
        match exit {
            LoopExit::Break => Signal::Break,
            LoopExit::Continue => Signal::Continue,
        }
    }
}

impl Signal {
    /// Normal completion with no meaningful value
    pub fn nothing() -> Signal {
        Signal::Value(Value::Nothing)
    }
}
