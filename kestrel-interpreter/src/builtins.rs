//! Built-in functions for the Kestrel interpreter.
//!
//! Installed into the root scope of every module: I/O, type inspection and
//! conversion, error raising, ranges and assertions.

use std::io::Write;
use std::rc::Rc;

use crate::arguments;
use crate::environment::Environment;
use crate::error::{ErrorKind, ErrorValue, Result, RuntimeError};
use crate::interpreter::Output;
use crate::value::Value;

/// Register all built-in functions with the environment
pub fn install(env: &Environment, output: &Output) {
    // I/O functions
    env.force_declare("print", create_print_function("print", output, false));
    env.force_declare("println", create_print_function("println", output, true));

    // Type inspection and conversion
    env.force_declare("type", Value::native("type", builtin_type));
    env.force_declare("string", Value::native("string", builtin_string));
    env.force_declare("number", Value::native("number", builtin_number));

    env.force_declare("error", Value::native("error", builtin_error));
    env.force_declare("range", Value::native("range", builtin_range));
    env.force_declare("assert", Value::native("assert", builtin_assert));
}

fn create_print_function(name: &'static str, output: &Output, newline: bool) -> Value {
    let output = Rc::clone(output);
    Value::native(name, move |args| {
        let line: Vec<String> = args.iter().map(Value::to_display_string).collect();
        let mut output = output.borrow_mut();
        let written = if newline {
            writeln!(output, "{}", line.join(" "))
        } else {
            write!(output, "{}", line.join(" ")).and_then(|_| output.flush())
        };
        written.map_err(|error| RuntimeError::runtime(format!("{}() failed: {}", name, error)))?;
        Ok(Value::Nothing)
    })
}

fn builtin_type(args: &[Value]) -> Result<Value> {
    let value = arguments::required("type", args, 0)?;
    Ok(Value::from(value.type_name()))
}

fn builtin_string(args: &[Value]) -> Result<Value> {
    let value = arguments::required("string", args, 0)?;
    Ok(Value::from(value.to_display_string()))
}

fn builtin_number(args: &[Value]) -> Result<Value> {
    let value = arguments::required("number", args, 0)?;
    Ok(Value::Number(value.to_number()?))
}

/// Build the error value that the call protocol then raises
fn builtin_error(args: &[Value]) -> Result<Value> {
    let message = arguments::required("error", args, 0)?.to_display_string();
    let kind = match arguments::optional_string("error", args, 1)? {
        None => ErrorKind::RuntimeError,
        Some(name) => ErrorKind::from_name(&name).ok_or_else(|| {
            RuntimeError::invalid_argument(format!("unknown error kind '{}'", name))
        })?,
    };
    Ok(Value::error(ErrorValue::new(kind, message)))
}

/// `range(end)` or `range(start, end)`, stepping by one
fn builtin_range(args: &[Value]) -> Result<Value> {
    let (start, end) = match arguments::optional_number("range", args, 1)? {
        Some(end) => (arguments::number("range", args, 0)?, end),
        None => (0.0, arguments::number("range", args, 0)?),
    };

    let count = arguments::generated_length("range", (end - start).ceil())?;
    let values = (0..count)
        .map(|offset| Value::Number(start + offset as f64))
        .collect();
    Ok(Value::array(values))
}

fn builtin_assert(args: &[Value]) -> Result<Value> {
    let condition = arguments::required("assert", args, 0)?;
    if condition.to_bool()? {
        return Ok(Value::Nothing);
    }

    let message = arguments::optional(args, 1)
        .map(Value::to_display_string)
        .unwrap_or_else(|| "assertion failed".to_string());
    Err(RuntimeError::runtime(message))
}
