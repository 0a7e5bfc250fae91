//! Native libraries importable by name.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::arguments;
use crate::environment::Env;
use crate::error::{ErrorValue, Result};
use crate::value::{Namespace, Value};

/// `import "math"`: constants and numeric helpers
pub fn load_math(env: &Env, alias: &str) -> std::result::Result<(), ErrorValue> {
    let mut exports = IndexMap::new();
    exports.insert("pi".to_string(), Value::Number(std::f64::consts::PI));
    exports.insert("e".to_string(), Value::Number(std::f64::consts::E));

    let functions: [(&str, fn(&[Value]) -> Result<Value>); 7] = [
        ("sqrt", math_sqrt),
        ("pow", math_pow),
        ("floor", math_floor),
        ("ceil", math_ceil),
        ("abs", math_abs),
        ("min", math_min),
        ("max", math_max),
    ];
    for (name, function) in functions {
        exports.insert(name.to_string(), Value::native(name, function));
    }

    env.force_declare(
        alias,
        Value::Namespace(Rc::new(Namespace {
            name: alias.to_string(),
            exports,
        })),
    );
    Ok(())
}

fn math_sqrt(args: &[Value]) -> Result<Value> {
    Ok(Value::Number(arguments::number("sqrt", args, 0)?.sqrt()))
}

fn math_pow(args: &[Value]) -> Result<Value> {
    let base = arguments::number("pow", args, 0)?;
    let exponent = arguments::number("pow", args, 1)?;
    Ok(Value::Number(base.powf(exponent)))
}

fn math_floor(args: &[Value]) -> Result<Value> {
    Ok(Value::Number(arguments::number("floor", args, 0)?.floor()))
}

fn math_ceil(args: &[Value]) -> Result<Value> {
    Ok(Value::Number(arguments::number("ceil", args, 0)?.ceil()))
}

fn math_abs(args: &[Value]) -> Result<Value> {
    Ok(Value::Number(arguments::number("abs", args, 0)?.abs()))
}

fn math_min(args: &[Value]) -> Result<Value> {
    fold_numbers("min", args, f64::min)
}

fn math_max(args: &[Value]) -> Result<Value> {
    fold_numbers("max", args, f64::max)
}

fn fold_numbers(name: &str, args: &[Value], combine: fn(f64, f64) -> f64) -> Result<Value> {
    arguments::expect_at_least(name, args, 1)?;
    let mut result = arguments::number(name, args, 0)?;
    for position in 1..args.len() {
        result = combine(result, arguments::number(name, args, position)?);
    }
    Ok(Value::Number(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use crate::error::ErrorKind;
    use crate::modules::ImportTracker;
    use crate::properties::get_property;

    fn math() -> Value {
        let env = Environment::root("main", Rc::new(ImportTracker::new()));
        load_math(&env, "m").unwrap();
        env.lookup("m").unwrap()
    }

    fn call(name: &str, args: &[Value]) -> Value {
        match get_property(&math(), name).unwrap() {
            Value::NativeFunction(native) => native.call(args),
            other => panic!("Expected native function, got {:?}", other),
        }
    }

    #[test]
    fn test_constants() {
        let pi = get_property(&math(), "pi").unwrap();
        assert!(pi.equals(&Value::Number(std::f64::consts::PI)));
        assert_eq!(math().to_display_string(), "<namespace m>");
    }

    #[test]
    fn test_functions() {
        assert!(call("sqrt", &[Value::Number(16.0)]).equals(&Value::Number(4.0)));

        let power = call("pow", &[Value::Number(2.0), Value::Number(10.0)]);
        assert!(power.equals(&Value::Number(1024.0)));

        let smallest = call("min", &[Value::Number(3.0), Value::Number(-1.0), Value::Number(2.0)]);
        assert!(smallest.equals(&Value::Number(-1.0)));
        assert!(call("max", &[Value::Number(3.0)]).equals(&Value::Number(3.0)));
    }

    #[test]
    fn test_bad_arguments_are_error_values() {
        match call("max", &[]) {
            Value::Error(error) => assert_eq!(error.kind, ErrorKind::InvalidArgumentError),
            other => panic!("Expected error value, got {:?}", other),
        }
        match call("sqrt", &[Value::from("4")]) {
            Value::Error(error) => assert_eq!(error.kind, ErrorKind::InvalidArgumentError),
            other => panic!("Expected error value, got {:?}", other),
        }
    }
}
