//! Binary and unary operator semantics.
//!
//! Operands are already evaluated. Arithmetic and ordering require both
//! operands to be of the same kind; equality never fails.

use std::cmp::Ordering;

use kestrel_parser::{BinaryOperator, UnaryOperator};

use crate::error::{Result, RuntimeError};
use crate::value::Value;

/// Apply a binary operator to two evaluated operands
pub fn binary(operator: BinaryOperator, left: &Value, right: &Value) -> Result<Value> {
    match operator {
        BinaryOperator::Equal => Ok(Value::Bool(left.equals(right))),
        BinaryOperator::NotEqual => Ok(Value::Bool(!left.equals(right))),
        BinaryOperator::And => Ok(Value::Bool(left.to_bool()? && right.to_bool()?)),
        BinaryOperator::Or => Ok(Value::Bool(left.to_bool()? || right.to_bool()?)),
        BinaryOperator::Add => add(left, right),
        BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Modulo => arithmetic(operator, left, right),
        BinaryOperator::Less
        | BinaryOperator::LessEqual
        | BinaryOperator::Greater
        | BinaryOperator::GreaterEqual => compare(operator, left, right),
    }
}

/// Apply a unary operator to an evaluated operand
pub fn unary(operator: UnaryOperator, operand: &Value) -> Result<Value> {
    match operator {
        UnaryOperator::Negate => match operand {
            Value::Number(n) => Ok(Value::Number(-n)),
            other => Err(RuntimeError::type_error(format!(
                "cannot apply '-' to {}",
                other.type_name()
            ))),
        },
        UnaryOperator::Not => Ok(Value::Bool(!operand.to_bool()?)),
    }
}

fn add(left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (Value::String(a), Value::String(b)) => {
            let mut joined = a.text();
            b.with_str(|b| joined.push_str(b));
            Ok(Value::from(joined))
        }
        (Value::Array(a), Value::Array(b)) => {
            let mut joined = a.borrow().clone();
            joined.extend(b.borrow().iter().cloned());
            Ok(Value::array(joined))
        }
        _ => Err(mismatch(BinaryOperator::Add, left, right)),
    }
}

fn arithmetic(operator: BinaryOperator, left: &Value, right: &Value) -> Result<Value> {
    let (Value::Number(a), Value::Number(b)) = (left, right) else {
        return Err(mismatch(operator, left, right));
    };

    let result = match operator {
        BinaryOperator::Subtract => a - b,
        BinaryOperator::Multiply => a * b,
        BinaryOperator::Divide | BinaryOperator::Modulo if *b == 0.0 => {
            return Err(RuntimeError::zero_division());
        }
        BinaryOperator::Divide => a / b,
        BinaryOperator::Modulo => a % b,
        _ => return Err(mismatch(operator, left, right)),
    };
    Ok(Value::Number(result))
}

fn compare(operator: BinaryOperator, left: &Value, right: &Value) -> Result<Value> {
    let ordering = match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => a.with_str(|a| b.with_str(|b| Some(a.cmp(b)))),
        _ => return Err(mismatch(operator, left, right)),
    };

    // NaN compares false against everything
    let Some(ordering) = ordering else {
        return Ok(Value::Bool(false));
    };

    let result = match operator {
        BinaryOperator::Less => ordering == Ordering::Less,
        BinaryOperator::LessEqual => ordering != Ordering::Greater,
        BinaryOperator::Greater => ordering == Ordering::Greater,
        BinaryOperator::GreaterEqual => ordering != Ordering::Less,
        _ => return Err(mismatch(operator, left, right)),
    };
    Ok(Value::Bool(result))
}

fn mismatch(operator: BinaryOperator, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::type_error(format!(
        "unsupported operand types for '{}': {} and {}",
        operator,
        left.type_name(),
        right.type_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn n(value: f64) -> Value {
        Value::Number(value)
    }

    #[test]
    fn test_arithmetic() {
        assert!(binary(BinaryOperator::Add, &n(1.0), &n(2.0)).unwrap().equals(&n(3.0)));
        assert!(binary(BinaryOperator::Modulo, &n(7.0), &n(3.0)).unwrap().equals(&n(1.0)));
        assert!(binary(BinaryOperator::Divide, &n(1.0), &n(4.0)).unwrap().equals(&n(0.25)));
    }

    #[test]
    fn test_division_by_zero() {
        for operator in [BinaryOperator::Divide, BinaryOperator::Modulo] {
            let error = binary(operator, &n(1.0), &n(0.0)).unwrap_err();
            assert_eq!(error.kind, ErrorKind::ZeroDivisionError);
        }
    }

    #[test]
    fn test_concatenation() {
        let joined = binary(BinaryOperator::Add, &Value::from("ab"), &Value::from("cd")).unwrap();
        assert!(joined.equals(&Value::from("abcd")));

        let left = Value::array(vec![n(1.0)]);
        let joined = binary(BinaryOperator::Add, &left, &Value::array(vec![n(2.0)])).unwrap();
        assert_eq!(joined.to_display_string(), "[1, 2]");
        assert_eq!(left.to_display_string(), "[1]");
    }

    #[test]
    fn test_mismatched_kinds() {
        let error = binary(BinaryOperator::Add, &n(1.0), &Value::from("1")).unwrap_err();
        assert_eq!(error.kind, ErrorKind::TypeError);
        assert_eq!(
            error.message,
            "unsupported operand types for '+': Number and String"
        );

        let error = binary(BinaryOperator::Less, &Value::Nothing, &Value::Nothing).unwrap_err();
        assert_eq!(error.kind, ErrorKind::TypeError);
    }

    #[test]
    fn test_equality_never_fails() {
        let result = binary(BinaryOperator::Equal, &n(1.0), &Value::from("1")).unwrap();
        assert!(result.equals(&Value::Bool(false)));
        let result = binary(BinaryOperator::NotEqual, &Value::Nothing, &n(0.0)).unwrap();
        assert!(result.equals(&Value::Bool(true)));
    }

    #[test]
    fn test_ordering_strings() {
        let result = binary(BinaryOperator::Less, &Value::from("apple"), &Value::from("banana"));
        assert!(result.unwrap().equals(&Value::Bool(true)));
        let result = binary(BinaryOperator::GreaterEqual, &n(2.0), &n(2.0));
        assert!(result.unwrap().equals(&Value::Bool(true)));
    }

    #[test]
    fn test_logic_uses_truthiness() {
        let result = binary(BinaryOperator::And, &n(0.0), &Value::Bool(true)).unwrap();
        assert!(result.equals(&Value::Bool(true)));
        let error = binary(BinaryOperator::Or, &Value::Nothing, &Value::Bool(true)).unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidConversionError);
    }

    #[test]
    fn test_unary() {
        assert!(unary(UnaryOperator::Negate, &n(2.0)).unwrap().equals(&n(-2.0)));
        assert!(unary(UnaryOperator::Not, &Value::Bool(true)).unwrap().equals(&Value::Bool(false)));
        assert_eq!(
            unary(UnaryOperator::Negate, &Value::from("x")).unwrap_err().kind,
            ErrorKind::TypeError
        );
    }
}
