//! Environment and scope management for the Kestrel interpreter.
//!
//! Scopes form a parent-linked tree of reference-counted nodes. A function
//! captures the node it was declared in, so later assignments in that scope
//! are visible to the closure. Every node carries the name of the module it
//! belongs to and a handle to the import tracker shared by the whole run.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::{Result, RuntimeError};
use crate::modules::ImportTracker;
use crate::value::Value;

pub type Env = Rc<Environment>;

/// A single lexical scope
pub struct Environment {
    /// Variable name to value mapping, in declaration order
    values: RefCell<IndexMap<String, Value>>,
    /// Enclosing scope; `None` at a module root
    parent: Option<Env>,
    /// Name of the module this scope belongs to
    module: Rc<str>,
    /// Import graph shared across a module-import subtree
    imports: Rc<ImportTracker>,
}

impl Environment {
    /// Create a module root scope
    pub fn root(module: &str, imports: Rc<ImportTracker>) -> Env {
        Rc::new(Self {
            values: RefCell::new(IndexMap::new()),
            parent: None,
            module: Rc::from(module),
            imports,
        })
    }

    /// Create a nested scope sharing this scope's module and import tracker
    pub fn new_child(self: &Rc<Self>, size_hint: usize) -> Env {
        Rc::new(Self {
            values: RefCell::new(IndexMap::with_capacity(size_hint)),
            parent: Some(Rc::clone(self)),
            module: Rc::clone(&self.module),
            imports: Rc::clone(&self.imports),
        })
    }

    /// Bind a new name in this scope; fails if this scope already binds it
    pub fn declare(&self, name: &str, value: Value) -> Result<()> {
        let mut values = self.values.borrow_mut();
        if values.contains_key(name) {
            return Err(RuntimeError::identifier(format!(
                "'{}' is already declared in this scope",
                name
            )));
        }
        values.insert(name.to_string(), value);
        Ok(())
    }

    /// Bind a name in this scope, replacing any existing binding
    pub fn force_declare(&self, name: &str, value: Value) {
        self.values.borrow_mut().insert(name.to_string(), value);
    }

    /// Resolve a name through this scope and its ancestors
    pub fn lookup(&self, name: &str) -> Result<Value> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(value) = current.values.borrow().get(name) {
                return Ok(value.clone());
            }
            scope = current.parent.as_deref();
        }

        Err(RuntimeError::identifier(format!("'{}' is not defined", name)))
    }

    /// Rebind a name in the nearest scope that declares it
    pub fn assign(&self, name: &str, value: Value) -> Result<()> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(slot) = current.values.borrow_mut().get_mut(name) {
                *slot = value;
                return Ok(());
            }
            scope = current.parent.as_deref();
        }

        Err(RuntimeError::identifier(format!(
            "cannot assign to '{}' before it is declared",
            name
        )))
    }

    /// Whether this scope (ignoring parents) binds `name`
    pub fn contains_local(&self, name: &str) -> bool {
        self.values.borrow().contains_key(name)
    }

    /// This scope's own bindings, in declaration order
    pub fn bindings(&self) -> IndexMap<String, Value> {
        self.values.borrow().clone()
    }

    /// Remove every binding from this scope (for REPL reset)
    pub fn clear(&self) {
        self.values.borrow_mut().clear();
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn imports(&self) -> &Rc<ImportTracker> {
        &self.imports
    }

    pub fn parent(&self) -> Option<&Env> {
        self.parent.as_ref()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.values.borrow().keys().cloned().collect();
        f.debug_struct("Environment")
            .field("module", &self.module)
            .field("names", &names)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}
