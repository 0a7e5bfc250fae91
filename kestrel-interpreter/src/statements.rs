//! Statement execution and the control-flow signal protocol.
//!
//! Statements return `Result<Signal>`. Errors propagate with `?` until a
//! `try` intercepts them; `Return`, `Break` and `Continue` travel as signals
//! and are consumed by the construct they target (function call or loop).

use std::rc::Rc;

use kestrel_parser::{
    AssignOperator, Assignment, Block, ExpressionKind, ForStatement, FunctionDeclaration,
    IfStatement, ImportStatement, MethodDeclaration, Statement, StatementKind, StructDeclaration,
    TryStatement, parse_program_with_source,
};
use tracing::debug;

use crate::environment::Env;
use crate::error::{Result, RuntimeError};
use crate::evaluator::{index_value, numeric_index};
use crate::interpreter::Interpreter;
use crate::operators;
use crate::properties::get_property;
use crate::signal::Signal;
use crate::stack::ensure_sufficient_stack;
use crate::value::{FunctionValue, Namespace, StructValue, Value, resolve_index};

impl Interpreter {
    /// Execute one statement, stamping the first error that escapes it with its location.
    /// A `break` or `continue` unwinding out of a call resumes here as a signal.
    pub fn execute_statement(&mut self, statement: &Statement, env: &Env) -> Result<Signal> {
        match ensure_sufficient_stack(|| self.execute_statement_kind(statement, env)) {
            Err(error) => match error.as_loop_exit() {
                Some(exit) => Ok(exit.into()),
                None => {
                    Err(error.locate(env.module(), statement.line(), || self.call_stack.snapshot()))
                }
            },
            outcome => outcome,
        }
    }

    /// Execute statements in order until one produces a non-normal signal
    pub fn execute_block(&mut self, statements: &[Statement], env: &Env) -> Result<Signal> {
        let mut last = Value::Nothing;
        for statement in statements {
            match self.execute_statement(statement, env)? {
                Signal::Value(value) => last = value,
                signal => return Ok(signal),
            }
        }
        Ok(Signal::Value(last))
    }

    /// Execute a block body in a fresh child scope
    fn execute_scoped(&mut self, block: &Block, env: &Env) -> Result<Signal> {
        let scope = env.new_child(0);
        self.execute_block(&block.statements, &scope)
    }

    fn execute_statement_kind(&mut self, statement: &Statement, env: &Env) -> Result<Signal> {
        match &statement.kind {
            StatementKind::Var(declaration) => {
                let value = self.evaluate_expression(&declaration.value, env)?;
                env.declare(&declaration.name.name, value)?;
                Ok(Signal::nothing())
            }
            StatementKind::Assignment(assignment) => {
                self.execute_assignment(assignment, env)?;
                Ok(Signal::nothing())
            }
            StatementKind::Expression(expression) => {
                Ok(Signal::Value(self.evaluate_expression(expression, env)?))
            }
            StatementKind::If(statement) => self.execute_if(statement, env),
            StatementKind::Loop(statement) => {
                loop {
                    match self.execute_scoped(&statement.body, env)? {
                        Signal::Break => return Ok(Signal::nothing()),
                        Signal::Return(value) => return Ok(Signal::Return(value)),
                        Signal::Value(_) | Signal::Continue => {}
                    }
                }
            }
            StatementKind::For(statement) => self.execute_for(statement, env),
            StatementKind::Function(declaration) => {
                let function = function_value(declaration, env, None);
                env.declare(&declaration.name.name, Value::Function(Rc::new(function)))?;
                Ok(Signal::nothing())
            }
            StatementKind::Struct(declaration) => self.execute_struct(declaration, env),
            StatementKind::Method(declaration) => self.execute_method(declaration, env),
            StatementKind::Try(statement) => self.execute_try(statement, env),
            StatementKind::Return(value) => {
                let value = match value {
                    Some(expression) => self.evaluate_expression(expression, env)?,
                    None => Value::Nothing,
                };
                Ok(Signal::Return(value))
            }
            StatementKind::Break => Ok(Signal::Break),
            StatementKind::Continue => Ok(Signal::Continue),
            StatementKind::Import(import) => self.execute_import(import, env),
        }
    }

    fn execute_assignment(&mut self, assignment: &Assignment, env: &Env) -> Result<()> {
        let operator = assignment.operator;

        match &assignment.target.kind {
            ExpressionKind::Identifier(identifier) => {
                let value = self.evaluate_expression(&assignment.value, env)?;
                let value = combine(operator, || env.lookup(&identifier.name), value)?;
                env.assign(&identifier.name, value)
            }
            ExpressionKind::Index(access) => {
                let object = self.evaluate_expression(&access.object, env)?;
                let index = self.evaluate_expression(&access.index, env)?;
                let value = self.evaluate_expression(&assignment.value, env)?;
                let value = combine(operator, || index_value(&object, &index), value)?;
                assign_index(&object, &index, value)
            }
            ExpressionKind::Member(access) => {
                let object = self.evaluate_expression(&access.object, env)?;
                let name = &access.property.name;
                let value = self.evaluate_expression(&assignment.value, env)?;
                let value = combine(operator, || get_property(&object, name), value)?;
                assign_member(&object, name, value)
            }
            other => Err(RuntimeError::runtime(format!(
                "cannot assign to {}",
                other.tag()
            ))),
        }
    }

    fn execute_if(&mut self, statement: &IfStatement, env: &Env) -> Result<Signal> {
        for branch in &statement.branches {
            if self.evaluate_expression(&branch.condition, env)?.to_bool()? {
                return self.execute_scoped(&branch.body, env);
            }
        }

        match &statement.else_block {
            Some(block) => self.execute_scoped(block, env),
            None => Ok(Signal::nothing()),
        }
    }

    fn execute_for(&mut self, statement: &ForStatement, env: &Env) -> Result<Signal> {
        let iterable = self.evaluate_expression(&statement.iterable, env)?;

        // Snapshot, so the body may mutate the collection being iterated
        let pairs: Vec<(Value, Value)> = match &iterable {
            Value::Array(items) => items
                .borrow()
                .iter()
                .enumerate()
                .map(|(index, item)| (Value::Number(index as f64), item.clone()))
                .collect(),
            Value::Dictionary(entries) => entries
                .borrow()
                .iter()
                .map(|(key, value)| (Value::from(key.as_str()), value.clone()))
                .collect(),
            Value::String(text) => text.with_str(|s| {
                s.chars()
                    .enumerate()
                    .map(|(index, c)| (Value::Number(index as f64), Value::from(c.to_string())))
                    .collect()
            }),
            other => {
                return Err(RuntimeError::type_error(format!(
                    "cannot iterate over {}",
                    other.type_name()
                )));
            }
        };

        for (key, item) in pairs {
            let scope = env.new_child(2);
            if let Some(index) = &statement.index {
                scope.force_declare(&index.name, key);
            }
            scope.force_declare(&statement.item.name, item);

            match self.execute_block(&statement.body.statements, &scope)? {
                Signal::Break => break,
                Signal::Return(value) => return Ok(Signal::Return(value)),
                Signal::Value(_) | Signal::Continue => {}
            }
        }

        Ok(Signal::nothing())
    }

    fn execute_struct(&mut self, declaration: &StructDeclaration, env: &Env) -> Result<Signal> {
        let mut properties: Vec<String> = Vec::with_capacity(declaration.properties.len());
        for property in &declaration.properties {
            if properties.contains(&property.name) {
                return Err(RuntimeError::identifier(format!(
                    "duplicate property '{}' in struct '{}'",
                    property.name, declaration.name
                )));
            }
            properties.push(property.name.clone());
        }

        let structure = StructValue::new(declaration.name.name.clone(), properties);
        env.declare(&declaration.name.name, Value::Struct(Rc::new(structure)))?;
        Ok(Signal::nothing())
    }

    fn execute_method(&mut self, declaration: &MethodDeclaration, env: &Env) -> Result<Signal> {
        let structure = match env.lookup(&declaration.struct_name.name)? {
            Value::Struct(structure) => structure,
            other => {
                return Err(RuntimeError::type_error(format!(
                    "'{}' is a {}, not a struct",
                    declaration.struct_name,
                    other.type_name()
                )));
            }
        };

        let name = &declaration.function.name.name;
        if structure.methods.borrow().contains_key(name) {
            return Err(RuntimeError::identifier(format!(
                "'{}' already has a method '{}'",
                structure.name, name
            )));
        }

        let method = function_value(&declaration.function, env, Some(structure.name.clone()));
        structure
            .methods
            .borrow_mut()
            .insert(name.clone(), Rc::new(method));
        Ok(Signal::nothing())
    }

    fn execute_try(&mut self, statement: &TryStatement, env: &Env) -> Result<Signal> {
        let outcome = match (self.execute_scoped(&statement.body, env), &statement.catch_block) {
            (Err(error), Some(catch_block)) => {
                debug!(error = %error, "caught error");
                let scope = env.new_child(1);
                scope.force_declare("error", Value::error(error.to_value()));
                self.execute_block(&catch_block.statements, &scope)
            }
            (outcome, _) => outcome,
        };

        // A finally block that fails or transfers control replaces the pending outcome
        if let Some(finally_block) = &statement.finally_block {
            match self.execute_scoped(finally_block, env)? {
                Signal::Value(_) => {}
                signal => return Ok(signal),
            }
        }

        outcome
    }

    fn execute_import(&mut self, import: &ImportStatement, env: &Env) -> Result<Signal> {
        let alias = import.binding_name();

        if let Some(library) = self.libraries.get(&import.path) {
            debug!(library = %import.path, alias = %alias, "loading native library");
            library(env, &alias)?;
            return Ok(Signal::nothing());
        }

        let module = self.loader.load(&import.path, env.module()).map_err(|error| {
            RuntimeError::runtime(format!("cannot import '{}': {}", import.path, error))
        })?;
        env.imports().record(&module.key, env.module())?;
        debug!(module = %module.key, importer = env.module(), alias = %alias, "importing module");

        let program = parse_program_with_source(&module.source, Some(module.key.clone()))
            .map_err(|error| {
                RuntimeError::runtime(format!("cannot import '{}': {}", module.key, error))
            })?;

        let module_env = self.module_environment(&module.key, Rc::clone(env.imports()));
        self.run_program(&program, &module_env)?;

        let namespace = Namespace {
            name: alias.clone(),
            exports: module_env.bindings(),
        };
        env.force_declare(&alias, Value::Namespace(Rc::new(namespace)));
        Ok(Signal::nothing())
    }
}

/// Closure over the declaration scope; methods carry their struct's name
fn function_value(
    declaration: &FunctionDeclaration,
    env: &Env,
    owner: Option<String>,
) -> FunctionValue {
    FunctionValue {
        name: Some(declaration.name.name.clone()),
        parameters: declaration
            .parameters
            .iter()
            .map(|parameter| parameter.name.clone())
            .collect(),
        body: Rc::clone(&declaration.body),
        closure: Rc::clone(env),
        owner,
        this: None,
    }
}

/// Apply a compound assignment operator to the target's current value
fn combine(
    operator: AssignOperator,
    current: impl FnOnce() -> Result<Value>,
    value: Value,
) -> Result<Value> {
    match operator.binary_operator() {
        Some(binary) => operators::binary(binary, &current()?, &value),
        None => Ok(value),
    }
}

fn assign_index(object: &Value, index: &Value, value: Value) -> Result<()> {
    match object {
        Value::Array(items) => {
            let mut items = items.borrow_mut();
            let position = resolve_index(numeric_index(index)?, items.len())?;
            items[position] = value;
            Ok(())
        }
        Value::Dictionary(entries) => {
            let key = index.to_display_string();
            entries.borrow_mut().insert(key, value);
            Ok(())
        }
        other => Err(RuntimeError::type_error(format!(
            "{} does not support index assignment",
            other.type_name()
        ))),
    }
}

fn assign_member(object: &Value, name: &str, value: Value) -> Result<()> {
    match object {
        Value::Object(instance) => {
            if !instance.structure.has_property(name) {
                return Err(RuntimeError::property(&instance.structure.name, name));
            }
            instance.fields.borrow_mut().insert(name.to_string(), value);
            Ok(())
        }
        Value::Dictionary(entries) => {
            entries.borrow_mut().insert(name.to_string(), value);
            Ok(())
        }
        other => Err(RuntimeError::type_error(format!(
            "cannot set property '{}' on {}",
            name,
            other.type_name()
        ))),
    }
}
