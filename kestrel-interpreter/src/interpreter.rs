//! Core interpreter: configuration, module environments and the run entry points.
//!
//! Expression and statement evaluation live in `evaluator` and `statements`
//! as further `impl Interpreter` blocks; this module owns the state they share.

use std::cell::RefCell;
use std::io::{self, Write};
use std::path::Path;
use std::rc::Rc;

use kestrel_parser::{ParseError, Program, parse_program_with_source};
use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

use crate::builtins;
use crate::call_stack::{CallStack, MAX_CALL_STACK_DEPTH};
use crate::environment::{Env, Environment};
use crate::error::{Result, RuntimeError};
use crate::modules::{
    FileSystemLoader, ImportTracker, ModuleLoader, NativeLibraryLoader, NativeRegistry,
};
use crate::signal::Signal;
use crate::value::Value;

/// Destination for `print` and `println`
pub type Output = Rc<RefCell<dyn Write>>;

/// Interpreter settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterConfig {
    /// Maximum number of active user function calls
    pub max_call_depth: usize,
    /// Evaluate the right operand of `and`/`or` only when needed
    pub short_circuit_logic: bool,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_call_depth: MAX_CALL_STACK_DEPTH,
            short_circuit_logic: false,
        }
    }
}

/// Errors surfaced by the run entry points
#[derive(Error, Diagnostic, Debug)]
pub enum InterpreterError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("Failed to read '{path}': {source}")]
    #[diagnostic(code(kestrel::io))]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// The tree-walking interpreter
pub struct Interpreter {
    pub(crate) config: InterpreterConfig,
    /// Active user function calls
    pub(crate) call_stack: CallStack,
    /// Resolves non-native import paths
    pub(crate) loader: Box<dyn ModuleLoader>,
    /// Native libraries, consulted before the loader
    pub(crate) libraries: NativeRegistry,
    output: Output,
}

impl Interpreter {
    /// Create an interpreter with the default configuration
    pub fn new() -> Self {
        Self::with_config(InterpreterConfig::default())
    }

    pub fn with_config(config: InterpreterConfig) -> Self {
        Self {
            call_stack: CallStack::with_max_depth(config.max_call_depth),
            config,
            loader: Box::new(FileSystemLoader),
            libraries: NativeRegistry::with_defaults(),
            output: Rc::new(RefCell::new(io::stdout())),
        }
    }

    /// Replace the module loader
    pub fn with_loader(mut self, loader: impl ModuleLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    /// Redirect `print` and `println`
    pub fn with_output(mut self, output: Output) -> Self {
        self.output = output;
        self
    }

    /// Make a native library importable by name
    pub fn register_library(&mut self, name: &str, loader: NativeLibraryLoader) {
        debug!(library = name, "registering native library");
        self.libraries.register(name, loader);
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    pub fn call_stack(&self) -> &CallStack {
        &self.call_stack
    }

    /// Fresh scope for a module: a builtins root with the module's own scope beneath it
    pub fn module_environment(&self, module: &str, imports: Rc<ImportTracker>) -> Env {
        let root = Environment::root(module, imports);
        builtins::install(&root, &self.output);
        root.new_child(0)
    }

    /// Module environment with a new import tracker, for a top-level run
    pub fn session_environment(&self, module: &str) -> Env {
        self.module_environment(module, Rc::new(ImportTracker::new()))
    }

    /// Parse and run `source` as the top-level module `module`, keyed the way
    /// the loader keys an import of the same name
    pub fn run_source(
        &mut self,
        source: &str,
        module: &str,
    ) -> std::result::Result<Value, InterpreterError> {
        let module = self.loader.entry_key(module);
        let program = parse_program_with_source(source, Some(module.clone()))?;
        let env = self.session_environment(&module);
        Ok(self.run_program(&program, &env)?)
    }

    /// Read and run a source file; the file path is the module key
    pub fn run_file(&mut self, path: &Path) -> std::result::Result<Value, InterpreterError> {
        let source = std::fs::read_to_string(path).map_err(|source| InterpreterError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let module = FileSystemLoader::module_key(path);
        debug!(module = %module, "running file");
        self.run_source(&source, &module)
    }

    /// Parse `source` and run it in an existing environment
    pub fn evaluate_in(
        &mut self,
        source: &str,
        env: &Env,
    ) -> std::result::Result<Value, InterpreterError> {
        let program = parse_program_with_source(source, Some(env.module().to_string()))?;
        Ok(self.run_program(&program, env)?)
    }

    /// Run a parsed module body; the result is the last statement's value
    pub fn run_program(&mut self, program: &Program, env: &Env) -> Result<Value> {
        match self.execute_block(&program.statements, env)? {
            Signal::Value(value) | Signal::Return(value) => Ok(value),
            Signal::Break => Err(RuntimeError::runtime("'break' outside of a loop")),
            Signal::Continue => Err(RuntimeError::runtime("'continue' outside of a loop")),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
