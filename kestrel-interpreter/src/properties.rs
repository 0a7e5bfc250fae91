//! Property lookup for every value kind.
//!
//! `a.b` resolves here. Built-in methods are native functions that capture
//! the receiver, so mutating built-ins (`add`, `insert`, `append`, ...) act
//! on the original backing store rather than on a copy.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::arguments;
use crate::error::{Result, RuntimeError};
use crate::value::{StringValue, Value, format_number, resolve_index, slice_range};

/// Resolve `name` on `value`, or fail with a `PropertyError`
pub fn get_property(value: &Value, name: &str) -> Result<Value> {
    let property = match value {
        Value::Number(n) => number_property(*n, name),
        Value::String(text) => string_property(text, name),
        Value::Array(items) => array_property(value, items, name),
        Value::Dictionary(entries) => dictionary_property(value, entries, name),
        Value::Error(error) => match name {
            "message" => Some(Value::from(error.message.as_str())),
            "kind" => Some(Value::from(error.kind.name())),
            _ => None,
        },
        // Declared methods win over the built-in `name`
        Value::Struct(structure) => structure.method(name).map(Value::Function).or_else(|| {
            (name == "name").then(|| Value::from(structure.name.as_str()))
        }),
        Value::Object(object) => {
            let field = object.fields.borrow().get(name).cloned();
            field.or_else(|| {
                object
                    .structure
                    .method(name)
                    .map(|method| Value::Function(Rc::new(method.bind(value.clone()))))
            })
        }
        Value::Namespace(namespace) => namespace.exports.get(name).cloned(),
        Value::Bool(_) | Value::Nothing | Value::Function(_) | Value::NativeFunction(_) => None,
    };

    property.ok_or_else(|| RuntimeError::property(&property_owner(value), name))
}

/// How the receiver is named in a `PropertyError`
fn property_owner(value: &Value) -> String {
    match value {
        Value::Struct(structure) => structure.name.clone(),
        Value::Object(object) => object.structure.name.clone(),
        Value::Namespace(namespace) => format!("module '{}'", namespace.name),
        other => other.type_name().to_string(),
    }
}

fn number_property(n: f64, name: &str) -> Option<Value> {
    let method = match name {
        "to_string" => Value::native("to_string", move |_| Ok(Value::from(format_number(n)))),
        "floor" => Value::native("floor", move |_| Ok(Value::Number(n.floor()))),
        "ceil" => Value::native("ceil", move |_| Ok(Value::Number(n.ceil()))),
        "round" => Value::native("round", move |_| Ok(Value::Number(n.round()))),
        "abs" => Value::native("abs", move |_| Ok(Value::Number(n.abs()))),
        _ => return None,
    };
    Some(method)
}

fn string_property(text: &StringValue, name: &str) -> Option<Value> {
    let receiver = text.clone();
    let method = match name {
        "len" => Value::native("len", move |_| {
            Ok(Value::Number(receiver.with_str(|s| s.chars().count()) as f64))
        }),
        "upper" => Value::native("upper", move |_| {
            Ok(Value::from(receiver.with_str(str::to_uppercase)))
        }),
        "lower" => Value::native("lower", move |_| {
            Ok(Value::from(receiver.with_str(str::to_lowercase)))
        }),
        "trim" => Value::native("trim", move |_| {
            Ok(Value::from(receiver.with_str(|s| s.trim().to_string())))
        }),
        "split" => Value::native("split", move |args| {
            let separator = arguments::string("split", args, 0)?;
            let parts: Vec<Value> = receiver.with_str(|s| {
                if separator.is_empty() {
                    s.chars().map(|c| Value::from(c.to_string())).collect()
                } else {
                    s.split(separator.as_str()).map(Value::from).collect()
                }
            });
            Ok(Value::array(parts))
        }),
        "contains" => Value::native("contains", move |args| {
            let needle = arguments::string("contains", args, 0)?;
            Ok(Value::Bool(receiver.with_str(|s| s.contains(needle.as_str()))))
        }),
        "find" => Value::native("find", move |args| {
            let needle = arguments::string("find", args, 0)?;
            let position = receiver.with_str(|s| {
                s.find(needle.as_str())
                    .map_or(-1.0, |byte| s[..byte].chars().count() as f64)
            });
            Ok(Value::Number(position))
        }),
        "slice" => Value::native("slice", move |args| {
            let start = arguments::number("slice", args, 0)?;
            let end = arguments::optional_number("slice", args, 1)?;
            let chars: Vec<char> = receiver.with_str(|s| s.chars().collect());
            let (from, to) = slice_range(start, end, chars.len());
            Ok(Value::from(chars[from..to].iter().collect::<String>()))
        }),
        "pad_left" => Value::native("pad_left", move |args| {
            let padding = padding("pad_left", args, &receiver)?;
            Ok(Value::from(receiver.with_str(|s| format!("{}{}", padding, s))))
        }),
        "pad_right" => Value::native("pad_right", move |args| {
            let padding = padding("pad_right", args, &receiver)?;
            Ok(Value::from(receiver.with_str(|s| format!("{}{}", s, padding))))
        }),
        "to_number" => Value::native("to_number", move |_| {
            Value::String(receiver.clone()).to_number().map(Value::Number)
        }),
        "mutable" => Value::native("mutable", move |_| {
            Ok(Value::String(StringValue::mutable(receiver.text())))
        }),
        "append" if text.is_mutable() => Value::native("append", move |args| {
            let suffix = arguments::required("append", args, 0)?.to_display_string();
            receiver.append(&suffix);
            Ok(Value::String(receiver.clone()))
        }),
        _ => return None,
    };
    Some(method)
}

/// Fill needed to widen `text` to the requested width
fn padding(name: &str, args: &[Value], text: &StringValue) -> Result<String> {
    let width = arguments::number(name, args, 0)?;
    let fill = arguments::optional_string(name, args, 1)?.unwrap_or_else(|| " ".to_string());
    let Some(fill) = fill.chars().next() else {
        return Err(RuntimeError::invalid_argument(format!(
            "{}() fill must not be empty",
            name
        )));
    };

    let width = arguments::generated_length(name, width)?;
    let length = text.with_str(|s| s.chars().count());
    let missing = width.saturating_sub(length);
    Ok(std::iter::repeat_n(fill, missing).collect())
}

fn array_property(receiver: &Value, items: &Rc<RefCell<Vec<Value>>>, name: &str) -> Option<Value> {
    let items = Rc::clone(items);
    let this = receiver.clone();
    let method = match name {
        "len" => Value::native("len", move |_| Ok(Value::Number(items.borrow().len() as f64))),
        "add" => Value::native("add", move |args| {
            items.borrow_mut().extend(args.iter().cloned());
            Ok(this.clone())
        }),
        "insert" => Value::native("insert", move |args| {
            let index = arguments::number("insert", args, 0)?;
            let value = arguments::required("insert", args, 1)?.clone();
            let length = items.borrow().len();
            // Inserting at the length appends
            let position = if index.trunc() == length as f64 {
                length
            } else {
                resolve_index(index, length)?
            };
            items.borrow_mut().insert(position, value);
            Ok(this.clone())
        }),
        "remove" => Value::native("remove", move |args| {
            let index = arguments::number("remove", args, 0)?;
            let position = resolve_index(index, items.borrow().len())?;
            Ok(items.borrow_mut().remove(position))
        }),
        "pop" => Value::native("pop", move |_| {
            items
                .borrow_mut()
                .pop()
                .ok_or_else(|| RuntimeError::invalid_index("pop from an empty array"))
        }),
        "has" => Value::native("has", move |args| {
            let needle = arguments::required("has", args, 0)?;
            Ok(Value::Bool(items.borrow().iter().any(|item| item.equals(needle))))
        }),
        "find" => Value::native("find", move |args| {
            let needle = arguments::required("find", args, 0)?;
            let position = items
                .borrow()
                .iter()
                .position(|item| item.equals(needle))
                .map_or(-1.0, |index| index as f64);
            Ok(Value::Number(position))
        }),
        "slice" => Value::native("slice", move |args| {
            let start = arguments::number("slice", args, 0)?;
            let end = arguments::optional_number("slice", args, 1)?;
            let items = items.borrow();
            let (from, to) = slice_range(start, end, items.len());
            Ok(Value::array(items[from..to].to_vec()))
        }),
        "join" => Value::native("join", move |args| {
            let separator = arguments::optional_string("join", args, 0)?.unwrap_or_default();
            let parts: Vec<String> = items.borrow().iter().map(Value::to_display_string).collect();
            Ok(Value::from(parts.join(&separator)))
        }),
        "reverse" => Value::native("reverse", move |_| {
            items.borrow_mut().reverse();
            Ok(this.clone())
        }),
        "copy" => Value::native("copy", move |_| Ok(Value::array(items.borrow().clone()))),
        _ => return None,
    };
    Some(method)
}

fn dictionary_property(
    receiver: &Value,
    entries: &Rc<RefCell<IndexMap<String, Value>>>,
    name: &str,
) -> Option<Value> {
    let store = Rc::clone(entries);
    let this = receiver.clone();
    let method = match name {
        "len" => Value::native("len", move |_| Ok(Value::Number(store.borrow().len() as f64))),
        "add" => Value::native("add", move |args| {
            let key = arguments::required("add", args, 0)?.to_display_string();
            let value = arguments::required("add", args, 1)?.clone();
            store.borrow_mut().insert(key, value);
            Ok(this.clone())
        }),
        "remove" => Value::native("remove", move |args| {
            let key = arguments::required("remove", args, 0)?.to_display_string();
            store
                .borrow_mut()
                .shift_remove(&key)
                .ok_or_else(|| missing_key(&key))
        }),
        "has" => Value::native("has", move |args| {
            let key = arguments::required("has", args, 0)?.to_display_string();
            Ok(Value::Bool(store.borrow().contains_key(&key)))
        }),
        "keys" => Value::native("keys", move |_| {
            Ok(Value::array(
                store.borrow().keys().map(|key| Value::from(key.as_str())).collect(),
            ))
        }),
        "values" => Value::native("values", move |_| {
            Ok(Value::array(store.borrow().values().cloned().collect()))
        }),
        "get" => Value::native("get", move |args| {
            let key = arguments::required("get", args, 0)?.to_display_string();
            let fallback = args.get(1).cloned().unwrap_or(Value::Nothing);
            Ok(store.borrow().get(&key).cloned().unwrap_or(fallback))
        }),
        _ => return entries.borrow().get(name).cloned(),
    };
    Some(method)
}

/// Error for a dictionary key that is not present
pub fn missing_key(key: &str) -> RuntimeError {
    RuntimeError::invalid_index(format!("key \"{}\" not found", key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn call(value: &Value, name: &str, args: &[Value]) -> Value {
        match get_property(value, name).unwrap() {
            Value::NativeFunction(native) => native.call(args),
            other => panic!("Expected native method, got {:?}", other),
        }
    }

    #[test]
    fn test_number_methods() {
        let n = Value::Number(-2.5);
        assert!(call(&n, "abs", &[]).equals(&Value::Number(2.5)));
        assert!(call(&n, "floor", &[]).equals(&Value::Number(-3.0)));
        assert!(call(&Value::Number(4.0), "to_string", &[]).equals(&Value::from("4")));
        assert_eq!(
            get_property(&n, "len").unwrap_err().message,
            "Number has no property 'len'"
        );
    }

    #[test]
    fn test_string_methods() {
        let s = Value::from("héllo world");
        assert!(call(&s, "len", &[]).equals(&Value::Number(11.0)));
        assert!(call(&s, "find", &[Value::from("world")]).equals(&Value::Number(6.0)));
        assert!(call(&s, "find", &[Value::from("xyz")]).equals(&Value::Number(-1.0)));
        assert!(call(&s, "slice", &[Value::Number(-5.0)]).equals(&Value::from("world")));
        assert!(call(&s, "upper", &[]).equals(&Value::from("HÉLLO WORLD")));

        let parts = call(&Value::from("a,b,c"), "split", &[Value::from(",")]);
        assert_eq!(parts.to_display_string(), "[\"a\", \"b\", \"c\"]");
    }

    #[test]
    fn test_padding() {
        let s = Value::from("7");
        let padded = call(&s, "pad_left", &[Value::Number(3.0), Value::from("0")]);
        assert!(padded.equals(&Value::from("007")));

        let padded = call(&s, "pad_right", &[Value::Number(2.0)]);
        assert!(padded.equals(&Value::from("7 ")));

        let unchanged = call(&Value::from("long"), "pad_left", &[Value::Number(2.0)]);
        assert!(unchanged.equals(&Value::from("long")));

        match call(&s, "pad_left", &[Value::Number(1e19)]) {
            Value::Error(error) => assert_eq!(error.kind, ErrorKind::InvalidArgumentError),
            other => panic!("Expected error value, got {:?}", other),
        }
    }

    #[test]
    fn test_append_requires_mutable_string() {
        let frozen = Value::from("abc");
        assert_eq!(
            get_property(&frozen, "append").unwrap_err().kind,
            ErrorKind::PropertyError
        );

        let mutable = call(&frozen, "mutable", &[]);
        call(&mutable, "append", &[Value::from("d")]);
        assert!(mutable.equals(&Value::from("abcd")));
        assert!(frozen.equals(&Value::from("abc")));
    }

    #[test]
    fn test_array_methods_share_backing_store() {
        let array = Value::array(vec![Value::Number(1.0)]);
        let alias = array.clone();
        call(&array, "add", &[Value::Number(2.0), Value::Number(3.0)]);
        assert_eq!(alias.to_display_string(), "[1, 2, 3]");

        call(&array, "insert", &[Value::Number(0.0), Value::Number(0.0)]);
        call(&array, "insert", &[Value::Number(4.0), Value::Number(4.0)]);
        assert_eq!(alias.to_display_string(), "[0, 1, 2, 3, 4]");

        assert!(call(&array, "remove", &[Value::Number(-1.0)]).equals(&Value::Number(4.0)));
        assert!(call(&array, "pop", &[]).equals(&Value::Number(3.0)));
        assert!(call(&array, "find", &[Value::Number(2.0)]).equals(&Value::Number(2.0)));
        assert!(call(&array, "join", &[Value::from("-")]).equals(&Value::from("0-1-2")));

        let copy = call(&array, "copy", &[]);
        call(&array, "reverse", &[]);
        assert_eq!(alias.to_display_string(), "[2, 1, 0]");
        assert_eq!(copy.to_display_string(), "[0, 1, 2]");
    }

    #[test]
    fn test_array_errors_are_values() {
        let empty = Value::array(vec![]);
        match call(&empty, "pop", &[]) {
            Value::Error(error) => assert_eq!(error.kind, ErrorKind::InvalidIndexError),
            other => panic!("Expected error value, got {:?}", other),
        }
        match call(&empty, "remove", &[Value::from("0")]) {
            Value::Error(error) => assert_eq!(error.kind, ErrorKind::InvalidArgumentError),
            other => panic!("Expected error value, got {:?}", other),
        }
    }

    #[test]
    fn test_dictionary_builtins_shadow_entries() {
        let mut entries = IndexMap::new();
        entries.insert("port".to_string(), Value::Number(80.0));
        entries.insert("len".to_string(), Value::from("shadowed"));
        let dictionary = Value::dictionary(entries);

        assert!(get_property(&dictionary, "port").unwrap().equals(&Value::Number(80.0)));
        assert!(call(&dictionary, "len", &[]).equals(&Value::Number(2.0)));
        let host = call(&dictionary, "get", &[Value::from("host"), Value::from("localhost")]);
        assert!(host.equals(&Value::from("localhost")));

        call(&dictionary, "add", &[Value::Number(1.0), Value::Bool(true)]);
        assert!(call(&dictionary, "has", &[Value::from("1")]).equals(&Value::Bool(true)));
        assert_eq!(
            call(&dictionary, "keys", &[]).to_display_string(),
            "[\"port\", \"len\", \"1\"]"
        );

        assert_eq!(
            get_property(&dictionary, "host").unwrap_err().kind,
            ErrorKind::PropertyError
        );
    }
}
