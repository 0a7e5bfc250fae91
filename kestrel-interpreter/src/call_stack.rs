//! Call frames for recursion limits and backtraces
//!
//! Every user-defined function call pushes a [`CallFrame`] naming the callee
//! and the call site. The stack bounds recursion depth and is snapshotted
//! into a [`RuntimeError`] when an error first escapes a statement, which is
//! what the CLI prints as the backtrace.

use std::fmt;

use tracing::trace;

use crate::error::RuntimeError;

/// Maximum call stack depth to prevent runaway recursion
pub const MAX_CALL_STACK_DEPTH: usize = 1000;

/// One active user function call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    /// Name of the called function
    pub function: String,

    /// Module containing the call site
    pub module: String,

    /// Source line of the call site
    pub line: usize,
}

impl CallFrame {
    pub fn new(function: impl Into<String>, module: impl Into<String>, line: usize) -> Self {
        Self {
            function: function.into(),
            module: module.into(),
            line,
        }
    }
}

impl fmt::Display for CallFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (called at {}:{})", self.function, self.module, self.line)
    }
}

/// Active calls, bounded by `max_depth`
#[derive(Debug, Clone)]
pub struct CallStack {
    /// Outermost call first
    frames: Vec<CallFrame>,

    max_depth: usize,
}

impl CallStack {
    /// Empty stack with the default depth bound
    pub fn new() -> Self {
        Self::with_max_depth(MAX_CALL_STACK_DEPTH)
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            frames: Vec::new(),
            max_depth,
        }
    }

    /// Enter a call, failing once the depth bound is reached
    pub fn push_frame(&mut self, frame: CallFrame) -> Result<(), RuntimeError> {
        if self.frames.len() >= self.max_depth {
            return Err(RuntimeError::runtime(format!(
                "maximum call depth of {} exceeded",
                self.max_depth
            )));
        }

        trace!(function = %frame.function, depth = self.frames.len() + 1, "push frame");
        self.frames.push(frame);
        Ok(())
    }

    pub fn pop_frame(&mut self) -> Option<CallFrame> {
        self.frames.pop()
    }

    /// Innermost active call
    pub fn current_frame(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames innermost first, for backtraces
    pub fn snapshot(&self) -> Vec<CallFrame> {
        self.frames.iter().rev().cloned().collect()
    }
}

impl Default for CallStack {
    fn default() -> Self {
        Self::new()
    }
}
