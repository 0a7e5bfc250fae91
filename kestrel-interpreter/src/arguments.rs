//! Argument extraction for native functions and built-in methods.

use crate::error::{Result, RuntimeError};
use crate::value::Value;

/// Largest string or array a native may generate
pub const MAX_GENERATED_LENGTH: usize = 1 << 24;

/// Fail unless at least `count` arguments were passed
pub fn expect_at_least(name: &str, arguments: &[Value], count: usize) -> Result<()> {
    if arguments.len() < count {
        return Err(RuntimeError::invalid_argument(format!(
            "{}() expects at least {} argument{}, got {}",
            name,
            count,
            if count == 1 { "" } else { "s" },
            arguments.len()
        )));
    }
    Ok(())
}

/// Required argument at `position`
pub fn required<'a>(name: &str, arguments: &'a [Value], position: usize) -> Result<&'a Value> {
    arguments.get(position).ok_or_else(|| {
        RuntimeError::invalid_argument(format!(
            "{}() is missing argument {}",
            name,
            position + 1
        ))
    })
}

/// Optional argument at `position`; an explicit `nothing` counts as absent
pub fn optional(arguments: &[Value], position: usize) -> Option<&Value> {
    arguments.get(position).filter(|value| !value.is_nothing())
}

/// Required numeric argument
pub fn number(name: &str, arguments: &[Value], position: usize) -> Result<f64> {
    match required(name, arguments, position)? {
        Value::Number(n) => Ok(*n),
        other => Err(mismatch(name, position, "Number", other)),
    }
}

/// Optional numeric argument
pub fn optional_number(name: &str, arguments: &[Value], position: usize) -> Result<Option<f64>> {
    match optional(arguments, position) {
        None => Ok(None),
        Some(Value::Number(n)) => Ok(Some(*n)),
        Some(other) => Err(mismatch(name, position, "Number", other)),
    }
}

/// Required string argument, copied out
pub fn string(name: &str, arguments: &[Value], position: usize) -> Result<String> {
    match required(name, arguments, position)? {
        Value::String(text) => Ok(text.text()),
        other => Err(mismatch(name, position, "String", other)),
    }
}

/// Optional string argument
pub fn optional_string(
    name: &str,
    arguments: &[Value],
    position: usize,
) -> Result<Option<String>> {
    match optional(arguments, position) {
        None => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.text())),
        Some(other) => Err(mismatch(name, position, "String", other)),
    }
}

/// Check that a computed size fits within [`MAX_GENERATED_LENGTH`]
pub fn generated_length(name: &str, length: f64) -> Result<usize> {
    if length.is_nan() || length > MAX_GENERATED_LENGTH as f64 {
        return Err(RuntimeError::invalid_argument(format!(
            "{}() cannot produce more than {} elements",
            name, MAX_GENERATED_LENGTH
        )));
    }
    Ok(length.max(0.0) as usize)
}

fn mismatch(name: &str, position: usize, expected: &str, found: &Value) -> RuntimeError {
    RuntimeError::invalid_argument(format!(
        "{}() expects a {} for argument {}, got {}",
        name,
        expected,
        position + 1,
        found.type_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_number_argument() {
        let arguments = [Value::Number(2.0), Value::from("x")];
        assert_eq!(number("pow", &arguments, 0).unwrap(), 2.0);

        let error = number("pow", &arguments, 1).unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidArgumentError);
        assert_eq!(
            error.message,
            "pow() expects a Number for argument 2, got String"
        );
    }

    #[test]
    fn test_missing_argument() {
        let error = string("split", &[], 0).unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidArgumentError);
        assert_eq!(error.message, "split() is missing argument 1");
    }

    #[test]
    fn test_optional_arguments() {
        let arguments = [Value::Number(1.0), Value::Nothing];
        assert_eq!(optional_number("slice", &arguments, 1).unwrap(), None);
        assert_eq!(optional_number("slice", &arguments, 2).unwrap(), None);
        assert_eq!(
            optional_string("pad_left", &arguments, 0).unwrap_err().kind,
            ErrorKind::InvalidArgumentError
        );
    }

    #[test]
    fn test_generated_length_bound() {
        assert_eq!(generated_length("range", 3.0).unwrap(), 3);
        assert_eq!(generated_length("range", -4.0).unwrap(), 0);

        let error = generated_length("pad_left", 1e19).unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidArgumentError);
        assert_eq!(
            error.message,
            "pad_left() cannot produce more than 16777216 elements"
        );
        assert!(generated_length("range", f64::NAN).is_err());
    }

    #[test]
    fn test_expect_at_least() {
        assert!(expect_at_least("max", &[Value::Number(1.0)], 1).is_ok());
        let error = expect_at_least("max", &[], 1).unwrap_err();
        assert_eq!(error.message, "max() expects at least 1 argument, got 0");
    }
}
