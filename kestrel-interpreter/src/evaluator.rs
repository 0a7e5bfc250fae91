//! Expression evaluation.
//!
//! Every expression evaluates to a [`Value`] or fails with a
//! [`RuntimeError`]; `?` short-circuits the rest of the expression. Calls are
//! the only place the evaluator re-enters statement execution.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use kestrel_parser::{
    BinaryOperation, BinaryOperator, CallExpression, Expression, ExpressionKind, FunctionLiteral,
    SliceAccess, StructLiteral,
};
use tracing::trace;

use crate::call_stack::CallFrame;
use crate::environment::Env;
use crate::error::{Result, RuntimeError};
use crate::interpreter::Interpreter;
use crate::operators;
use crate::properties::{self, get_property};
use crate::signal::{LoopExit, Signal};
use crate::stack::ensure_sufficient_stack;
use crate::value::{FunctionValue, ObjectValue, Value, resolve_index};

impl Interpreter {
    /// Evaluate an expression in `env`
    pub fn evaluate_expression(&mut self, expression: &Expression, env: &Env) -> Result<Value> {
        ensure_sufficient_stack(|| self.evaluate_expression_kind(expression, env))
    }

    fn evaluate_expression_kind(&mut self, expression: &Expression, env: &Env) -> Result<Value> {
        match &expression.kind {
            // Literals
            ExpressionKind::Number(n) => Ok(Value::Number(*n)),
            ExpressionKind::String(text) => Ok(Value::from(text.as_str())),
            ExpressionKind::Boolean(b) => Ok(Value::Bool(*b)),
            ExpressionKind::Nothing => Ok(Value::Nothing),

            ExpressionKind::Identifier(identifier) => env.lookup(&identifier.name),

            ExpressionKind::Array(elements) => {
                let values = elements
                    .iter()
                    .map(|element| self.evaluate_expression(element, env))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::array(values))
            }

            ExpressionKind::Dictionary(entries) => {
                let mut map = IndexMap::with_capacity(entries.len());
                for entry in entries {
                    let value = self.evaluate_expression(&entry.value, env)?;
                    map.insert(entry.key.clone(), value);
                }
                Ok(Value::dictionary(map))
            }

            ExpressionKind::StructLiteral(literal) => self.evaluate_struct_literal(literal, env),
            ExpressionKind::Function(literal) => Ok(self.function_literal(literal, env)),

            ExpressionKind::Binary(operation) => self.evaluate_binary(operation, env),
            ExpressionKind::Unary(operation) => {
                let operand = self.evaluate_expression(&operation.operand, env)?;
                operators::unary(operation.operator, &operand)
            }

            ExpressionKind::Ternary(ternary) => {
                // Only the chosen branch is evaluated
                let condition = self.evaluate_expression(&ternary.condition, env)?;
                if condition.to_bool()? {
                    self.evaluate_expression(&ternary.then_value, env)
                } else {
                    self.evaluate_expression(&ternary.else_value, env)
                }
            }

            ExpressionKind::Call(call) => self.evaluate_call(call, env),

            ExpressionKind::Member(access) => {
                let object = self.evaluate_expression(&access.object, env)?;
                get_property(&object, &access.property.name)
            }

            ExpressionKind::Index(access) => {
                let object = self.evaluate_expression(&access.object, env)?;
                let index = self.evaluate_expression(&access.index, env)?;
                index_value(&object, &index)
            }

            ExpressionKind::Slice(access) => self.evaluate_slice(access, env),
        }
    }

    fn evaluate_binary(&mut self, operation: &BinaryOperation, env: &Env) -> Result<Value> {
        let left = self.evaluate_expression(&operation.left, env)?;

        if self.config.short_circuit_logic && operation.operator.is_logical() {
            let left = left.to_bool()?;
            match (operation.operator, left) {
                (BinaryOperator::And, false) => return Ok(Value::Bool(false)),
                (BinaryOperator::Or, true) => return Ok(Value::Bool(true)),
                _ => {
                    let right = self.evaluate_expression(&operation.right, env)?;
                    return Ok(Value::Bool(right.to_bool()?));
                }
            }
        }

        let right = self.evaluate_expression(&operation.right, env)?;
        operators::binary(operation.operator, &left, &right)
    }

    fn evaluate_struct_literal(&mut self, literal: &StructLiteral, env: &Env) -> Result<Value> {
        let structure = match self.evaluate_expression(&literal.target, env)? {
            Value::Struct(structure) => structure,
            other => {
                return Err(RuntimeError::type_error(format!(
                    "{} is not a struct",
                    other.type_name()
                )));
            }
        };

        // Every declared property exists on the instance, unset ones as nothing
        let mut fields: IndexMap<String, Value> = structure
            .properties
            .iter()
            .map(|property| (property.clone(), Value::Nothing))
            .collect();

        for field in &literal.fields {
            if !structure.has_property(&field.name.name) {
                return Err(RuntimeError::property(&structure.name, &field.name.name));
            }
            let value = self.evaluate_expression(&field.value, env)?;
            fields.insert(field.name.name.clone(), value);
        }

        Ok(Value::Object(Rc::new(ObjectValue {
            structure,
            fields: RefCell::new(fields),
        })))
    }

    fn function_literal(&self, literal: &FunctionLiteral, env: &Env) -> Value {
        Value::Function(Rc::new(FunctionValue {
            name: None,
            parameters: literal
                .parameters
                .iter()
                .map(|parameter| parameter.name.clone())
                .collect(),
            body: Rc::clone(&literal.body),
            closure: Rc::clone(env),
            owner: None,
            this: None,
        }))
    }

    fn evaluate_slice(&mut self, access: &SliceAccess, env: &Env) -> Result<Value> {
        let object = self.evaluate_expression(&access.object, env)?;

        let mut arguments = Vec::with_capacity(2);
        match &access.start {
            Some(start) => arguments.push(self.evaluate_expression(start, env)?),
            None => arguments.push(Value::Number(0.0)),
        }
        if let Some(end) = &access.end {
            arguments.push(self.evaluate_expression(end, env)?);
        }

        let slice = get_property(&object, "slice")?;
        self.call_value(&slice, arguments, env.module(), access.span.line)
    }

    fn evaluate_call(&mut self, call: &CallExpression, env: &Env) -> Result<Value> {
        // Arguments first, left to right, then the callee
        let arguments = call
            .arguments
            .iter()
            .map(|argument| self.evaluate_expression(argument, env))
            .collect::<Result<Vec<_>>>()?;
        let callee = self.evaluate_expression(&call.callee, env)?;

        self.call_value(&callee, arguments, env.module(), call.span.line)
    }

    /// Invoke any callable value; `module` and `line` identify the call site
    pub fn call_value(
        &mut self,
        callee: &Value,
        arguments: Vec<Value>,
        module: &str,
        line: usize,
    ) -> Result<Value> {
        match callee {
            Value::NativeFunction(native) => {
                trace!(function = %native.name, arguments = arguments.len(), "native call");
                match native.call(&arguments) {
                    Value::Error(error) => Err(RuntimeError::from(error.as_ref().clone())),
                    value => Ok(value),
                }
            }
            Value::Function(function) => self.call_function(function, arguments, module, line),
            other => Err(RuntimeError::type_error(format!(
                "{} is not callable",
                other.type_name()
            ))),
        }
    }

    fn call_function(
        &mut self,
        function: &FunctionValue,
        arguments: Vec<Value>,
        module: &str,
        line: usize,
    ) -> Result<Value> {
        let scope = function.closure.new_child(function.parameters.len() + 1);

        // Missing arguments are nothing, extra ones are dropped
        let mut arguments = arguments.into_iter();
        for parameter in &function.parameters {
            scope.force_declare(parameter, arguments.next().unwrap_or(Value::Nothing));
        }
        if let Some(this) = &function.this {
            scope.force_declare("this", this.clone());
        }

        let name = function.display_name();
        trace!(function = %name, module, line, "call");
        self.call_stack.push_frame(CallFrame::new(name, module, line))?;
        let result = self.execute_block(&function.body.statements, &scope);
        self.call_stack.pop_frame();

        match result? {
            Signal::Return(value) => Ok(value),
            Signal::Value(_) => Ok(Value::Nothing),
            Signal::Break => Err(RuntimeError::loop_exit(LoopExit::Break)),
            Signal::Continue => Err(RuntimeError::loop_exit(LoopExit::Continue)),
        }
    }
}

/// `object[index]` for arrays, strings and dictionaries
pub fn index_value(object: &Value, index: &Value) -> Result<Value> {
    match object {
        Value::Dictionary(entries) => {
            let key = index.to_display_string();
            entries
                .borrow()
                .get(&key)
                .cloned()
                .ok_or_else(|| properties::missing_key(&key))
        }
        Value::Array(items) => {
            let items = items.borrow();
            let position = resolve_index(numeric_index(index)?, items.len())?;
            Ok(items[position].clone())
        }
        Value::String(text) => {
            let chars: Vec<char> = text.with_str(|s| s.chars().collect());
            let position = resolve_index(numeric_index(index)?, chars.len())?;
            Ok(Value::from(chars[position].to_string()))
        }
        other => Err(RuntimeError::type_error(format!(
            "{} is not indexable",
            other.type_name()
        ))),
    }
}

/// Array and string indices must be numbers
pub fn numeric_index(index: &Value) -> Result<f64> {
    match index {
        Value::Number(n) => Ok(*n),
        other => Err(RuntimeError::type_error(format!(
            "index must be a Number, not {}",
            other.type_name()
        ))),
    }
}
