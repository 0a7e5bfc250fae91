//! Runtime value representation for the Kestrel interpreter.
//!
//! This module defines the closed [`Value`] enum along with the coercions
//! every kind supports (`to_number`, `to_bool`, display). Collections and
//! objects share one backing store across clones; numbers, booleans,
//! `nothing` and immutable strings behave as plain values.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use kestrel_parser::Block;

use crate::environment::Env;
use crate::error::{ErrorKind, ErrorValue, Result, RuntimeError};

/// Runtime values in the Kestrel interpreter
#[derive(Clone)]
pub enum Value {
    /// 64-bit floating point number, the only numeric kind
    Number(f64),
    /// Text, optionally mutable in place
    String(StringValue),
    /// Boolean value
    Bool(bool),
    /// Absence of a value
    Nothing,
    /// In-language error value
    Error(Rc<ErrorValue>),
    /// Ordered, shared, mutable list
    Array(Rc<RefCell<Vec<Value>>>),
    /// Insertion-ordered, shared, mutable string-keyed map
    Dictionary(Rc<RefCell<IndexMap<String, Value>>>),
    /// Struct template
    Struct(Rc<StructValue>),
    /// Instance of a struct
    Object(Rc<ObjectValue>),
    /// User-defined function or method
    Function(Rc<FunctionValue>),
    /// Host-provided callable
    NativeFunction(Rc<NativeFunction>),
    /// Read-only bindings exported by an imported module or native library
    Namespace(Rc<Namespace>),
}

/// String payload: immutable text is shared freely, mutable text aliases one buffer
#[derive(Clone)]
pub enum StringValue {
    Immutable(Rc<str>),
    Mutable(Rc<RefCell<String>>),
}

impl StringValue {
    pub fn mutable(text: impl Into<String>) -> Self {
        StringValue::Mutable(Rc::new(RefCell::new(text.into())))
    }

    pub fn is_mutable(&self) -> bool {
        matches!(self, StringValue::Mutable(_))
    }

    /// Run `f` against the current text without copying it
    pub fn with_str<R>(&self, f: impl FnOnce(&str) -> R) -> R {
        match self {
            StringValue::Immutable(text) => f(text),
            StringValue::Mutable(text) => f(&text.borrow()),
        }
    }

    pub fn text(&self) -> String {
        self.with_str(str::to_string)
    }

    /// Append in place; returns false for immutable strings
    pub fn append(&self, suffix: &str) -> bool {
        match self {
            StringValue::Immutable(_) => false,
            StringValue::Mutable(text) => {
                text.borrow_mut().push_str(suffix);
                true
            }
        }
    }
}

impl From<&str> for StringValue {
    fn from(text: &str) -> Self {
        StringValue::Immutable(Rc::from(text))
    }
}

impl From<String> for StringValue {
    fn from(text: String) -> Self {
        StringValue::Immutable(Rc::from(text))
    }
}

/// A struct declaration: its property names and mutable method table
pub struct StructValue {
    pub name: String,
    pub properties: Vec<String>,
    pub methods: RefCell<IndexMap<String, Rc<FunctionValue>>>,
}

impl StructValue {
    pub fn new(name: impl Into<String>, properties: Vec<String>) -> Self {
        Self {
            name: name.into(),
            properties,
            methods: RefCell::new(IndexMap::new()),
        }
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.iter().any(|property| property == name)
    }

    pub fn method(&self, name: &str) -> Option<Rc<FunctionValue>> {
        self.methods.borrow().get(name).cloned()
    }
}

/// An instance: the owning struct plus its own property map
pub struct ObjectValue {
    pub structure: Rc<StructValue>,
    pub fields: RefCell<IndexMap<String, Value>>,
}

/// A closure over its declaration environment
pub struct FunctionValue {
    /// `None` for function literals
    pub name: Option<String>,
    pub parameters: Vec<String>,
    pub body: Rc<Block>,
    pub closure: Env,
    /// Struct name for methods
    pub owner: Option<String>,
    /// Instance bound when the method was resolved through an object
    pub this: Option<Value>,
}

impl FunctionValue {
    /// Name used in frames and display, qualified by the owning struct
    pub fn display_name(&self) -> String {
        let name = self.name.as_deref().unwrap_or("<anonymous>");
        match &self.owner {
            Some(owner) => format!("{}.{}", owner, name),
            None => name.to_string(),
        }
    }

    /// Copy of this method with `this` bound to `instance`
    pub fn bind(&self, instance: Value) -> FunctionValue {
        FunctionValue {
            name: self.name.clone(),
            parameters: self.parameters.clone(),
            body: Rc::clone(&self.body),
            closure: Rc::clone(&self.closure),
            owner: self.owner.clone(),
            this: Some(instance),
        }
    }
}

/// Host callable signature; failures are reported as `Value::Error`
pub type NativeFn = dyn Fn(&[Value]) -> Value;

pub struct NativeFunction {
    pub name: String,
    pub func: Box<NativeFn>,
}

impl NativeFunction {
    pub fn new(name: impl Into<String>, func: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }

    /// Wrap a `Result`-returning callable, turning `Err` into an error value
    pub fn fallible(
        name: impl Into<String>,
        func: impl Fn(&[Value]) -> Result<Value> + 'static,
    ) -> Self {
        Self::new(name, move |arguments| {
            func(arguments).unwrap_or_else(|error| Value::error(error.to_value()))
        })
    }

    pub fn call(&self, arguments: &[Value]) -> Value {
        (self.func)(arguments)
    }
}

/// Exported bindings of a module, in declaration order
pub struct Namespace {
    pub name: String,
    pub exports: IndexMap<String, Value>,
}

impl Value {
    /// Create an immutable string value
    pub fn string(text: impl Into<StringValue>) -> Value {
        Value::String(text.into())
    }

    pub fn array(values: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(values)))
    }

    pub fn dictionary(entries: IndexMap<String, Value>) -> Value {
        Value::Dictionary(Rc::new(RefCell::new(entries)))
    }

    pub fn error(error: ErrorValue) -> Value {
        Value::Error(Rc::new(error))
    }

    pub fn native(name: &str, func: impl Fn(&[Value]) -> Result<Value> + 'static) -> Value {
        Value::NativeFunction(Rc::new(NativeFunction::fallible(name, func)))
    }

    /// Get the kind tag of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "Number",
            Value::String(_) => "String",
            Value::Bool(_) => "Bool",
            Value::Nothing => "Nothing",
            Value::Error(_) => "Error",
            Value::Array(_) => "Array",
            Value::Dictionary(_) => "Dictionary",
            Value::Struct(_) => "Struct",
            Value::Object(_) => "Object",
            Value::Function(_) => "Function",
            Value::NativeFunction(_) => "NativeFunction",
            Value::Namespace(_) => "Namespace",
        }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Value::Nothing)
    }

    /// Numeric coercion
    pub fn to_number(&self) -> Result<f64> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::String(text) => text
                .with_str(|text| text.trim().parse::<f64>())
                .map_err(|_| {
                    RuntimeError::new(
                        ErrorKind::InvalidConversionError,
                        format!("cannot convert \"{}\" to Number", text.text()),
                    )
                }),
            other => Err(RuntimeError::invalid_conversion(other.type_name(), "Number")),
        }
    }

    /// Truthiness: numbers, strings and arrays are truthy, booleans are themselves
    pub fn to_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Number(_) | Value::String(_) | Value::Array(_) => Ok(true),
            other => Err(RuntimeError::invalid_conversion(other.type_name(), "Bool")),
        }
    }

    /// Top-level display: strings print raw
    pub fn to_display_string(&self) -> String {
        match self {
            Value::String(text) => text.text(),
            other => other.repr(),
        }
    }

    /// Nested display: strings print quoted
    pub fn repr(&self) -> String {
        self.repr_within(&mut Vec::new())
    }

    /// `open` holds the containers currently being printed; revisiting one
    /// prints an ellipsis instead of recursing forever
    fn repr_within(&self, open: &mut Vec<*const ()>) -> String {
        match self {
            Value::Number(n) => format_number(*n),
            Value::String(text) => format!("\"{}\"", text.text()),
            Value::Bool(b) => b.to_string(),
            Value::Nothing => "nothing".to_string(),
            Value::Error(error) => error.to_string(),
            Value::Array(items) => {
                let Some(items) = enter(open, items) else {
                    return "[...]".to_string();
                };
                let items: Vec<String> = items
                    .borrow()
                    .iter()
                    .map(|item| item.repr_within(open))
                    .collect();
                open.pop();
                format!("[{}]", items.join(", "))
            }
            Value::Dictionary(entries) => {
                let Some(entries) = enter(open, entries) else {
                    return "{...}".to_string();
                };
                let entries: Vec<String> = entries
                    .borrow()
                    .iter()
                    .map(|(key, value)| format!("\"{}\": {}", key, value.repr_within(open)))
                    .collect();
                open.pop();
                format!("{{{}}}", entries.join(", "))
            }
            Value::Struct(structure) => format!("<struct {}>", structure.name),
            Value::Object(object) => {
                let Some(object) = enter(open, object) else {
                    return format!("{}{{...}}", object.structure.name);
                };
                let fields: Vec<String> = object
                    .fields
                    .borrow()
                    .iter()
                    .map(|(name, value)| format!("{}: {}", name, value.repr_within(open)))
                    .collect();
                open.pop();
                format!("{}{{{}}}", object.structure.name, fields.join(", "))
            }
            Value::Function(function) => format!("<fn {}>", function.display_name()),
            Value::NativeFunction(native) => format!("<native fn {}>", native.name),
            Value::Namespace(namespace) => format!("<namespace {}>", namespace.name),
        }
    }

    /// Language-level equality; different kinds are never equal
    pub fn equals(&self, other: &Value) -> bool {
        self.equals_within(other, &mut Vec::new())
    }

    /// `pending` holds container pairs already under comparison; a pair met
    /// again is assumed equal so self-referencing containers terminate
    fn equals_within(&self, other: &Value, pending: &mut Vec<(*const (), *const ())>) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a.with_str(|a| b.with_str(|b| a == b)),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Nothing, Value::Nothing) => true,
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let pair = (Rc::as_ptr(a).cast::<()>(), Rc::as_ptr(b).cast::<()>());
                if pending.contains(&pair) {
                    return true;
                }
                pending.push(pair);
                let (x, y) = (a.borrow(), b.borrow());
                let equal = x.len() == y.len()
                    && x.iter().zip(y.iter()).all(|(x, y)| x.equals_within(y, pending));
                pending.pop();
                equal
            }
            (Value::Dictionary(a), Value::Dictionary(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let pair = (Rc::as_ptr(a).cast::<()>(), Rc::as_ptr(b).cast::<()>());
                if pending.contains(&pair) {
                    return true;
                }
                pending.push(pair);
                let (x, y) = (a.borrow(), b.borrow());
                let equal = x.len() == y.len()
                    && x.iter().all(|(key, value)| {
                        y.get(key).is_some_and(|other| value.equals_within(other, pending))
                    });
                pending.pop();
                equal
            }
            (Value::Struct(a), Value::Struct(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::NativeFunction(a), Value::NativeFunction(b)) => Rc::ptr_eq(a, b),
            (Value::Namespace(a), Value::Namespace(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Mark `shared` as open for printing, or `None` when it already is
fn enter<'a, T>(open: &mut Vec<*const ()>, shared: &'a Rc<T>) -> Option<&'a Rc<T>> {
    let pointer = Rc::as_ptr(shared).cast::<()>();
    if open.contains(&pointer) {
        return None;
    }
    open.push(pointer);
    Some(shared)
}

/// Whole numbers print without a fractional part
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        // Normalise negative zero
        return "0".to_string();
    }
    n.to_string()
}

/// Resolve a possibly negative index against a container length
pub fn resolve_index(index: f64, length: usize) -> Result<usize> {
    let truncated = index.trunc();
    let adjusted = if truncated < 0.0 {
        truncated + length as f64
    } else {
        truncated
    };

    if adjusted.is_nan() || adjusted < 0.0 || adjusted >= length as f64 {
        return Err(RuntimeError::invalid_index(format!(
            "index {} out of range for length {}",
            format_number(index),
            length
        )));
    }

    Ok(adjusted as usize)
}

/// Clamp slice bounds to a container, adjusting negatives; start past end is empty
pub fn slice_range(start: f64, end: Option<f64>, length: usize) -> (usize, usize) {
    let clamp = |bound: f64| -> usize {
        let truncated = bound.trunc();
        let adjusted = if truncated < 0.0 {
            truncated + length as f64
        } else {
            truncated
        };
        if adjusted.is_nan() || adjusted <= 0.0 {
            0
        } else if adjusted >= length as f64 {
            length
        } else {
            adjusted as usize
        }
    };

    let start = clamp(start);
    let end = end.map_or(length, clamp);
    (start, end.max(start))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.type_name(), self.repr())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::string(text)
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::string(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_numbers() {
        assert_eq!(Value::Number(3.0).to_display_string(), "3");
        assert_eq!(Value::Number(-0.0).to_display_string(), "0");
        assert_eq!(Value::Number(2.5).to_display_string(), "2.5");
    }

    #[test]
    fn test_display_strings_raw_at_top_level_and_quoted_inside() {
        let array = Value::array(vec![Value::from("a"), Value::Number(1.0), Value::Nothing]);
        assert_eq!(Value::from("a").to_display_string(), "a");
        assert_eq!(array.to_display_string(), "[\"a\", 1, nothing]");

        let mut entries = IndexMap::new();
        entries.insert("k".to_string(), Value::from("v"));
        assert_eq!(Value::dictionary(entries).to_display_string(), "{\"k\": \"v\"}");
    }

    fn self_referencing(first: f64) -> Value {
        let array = Value::array(vec![Value::Number(first)]);
        if let Value::Array(items) = &array {
            items.borrow_mut().push(array.clone());
        }
        array
    }

    #[test]
    fn test_self_referencing_containers() {
        let array = self_referencing(1.0);
        assert_eq!(array.to_display_string(), "[1, [...]]");

        let dictionary = Value::dictionary(IndexMap::new());
        if let Value::Dictionary(entries) = &dictionary {
            entries.borrow_mut().insert("me".to_string(), dictionary.clone());
        }
        assert_eq!(dictionary.to_display_string(), "{\"me\": {...}}");

        assert!(array.equals(&self_referencing(1.0)));
        assert!(!array.equals(&self_referencing(2.0)));
    }

    #[test]
    fn test_truthiness() {
        assert_eq!(Value::Number(0.0).to_bool().unwrap(), true);
        assert_eq!(Value::from("").to_bool().unwrap(), true);
        assert_eq!(Value::array(vec![]).to_bool().unwrap(), true);
        assert_eq!(Value::Bool(false).to_bool().unwrap(), false);

        let error = Value::Nothing.to_bool().unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidConversionError);
    }

    #[test]
    fn test_to_number() {
        assert_eq!(Value::from(" 42 ").to_number().unwrap(), 42.0);
        assert_eq!(Value::Bool(true).to_number().unwrap(), 1.0);
        assert_eq!(
            Value::from("abc").to_number().unwrap_err().kind,
            ErrorKind::InvalidConversionError
        );
        assert_eq!(
            Value::Nothing.to_number().unwrap_err().kind,
            ErrorKind::InvalidConversionError
        );
    }

    #[test]
    fn test_equality_across_kinds_is_false() {
        assert!(!Value::Number(1.0).equals(&Value::from("1")));
        assert!(!Value::Nothing.equals(&Value::Bool(false)));
        assert!(Value::Nothing.equals(&Value::Nothing));
        assert!(
            Value::array(vec![Value::Number(1.0)]).equals(&Value::array(vec![Value::Number(1.0)]))
        );
    }

    #[test]
    fn test_mutable_strings_alias() {
        let text = StringValue::mutable("ab");
        let alias = text.clone();
        assert!(alias.append("c"));
        assert_eq!(text.text(), "abc");
        assert!(!StringValue::from("x").append("y"));
    }

    #[test]
    fn test_resolve_index() {
        assert_eq!(resolve_index(0.0, 3).unwrap(), 0);
        assert_eq!(resolve_index(-1.0, 3).unwrap(), 2);
        assert_eq!(resolve_index(1.9, 3).unwrap(), 1);
        assert_eq!(
            resolve_index(3.0, 3).unwrap_err().kind,
            ErrorKind::InvalidIndexError
        );
        assert_eq!(
            resolve_index(-4.0, 3).unwrap_err().kind,
            ErrorKind::InvalidIndexError
        );
    }

    #[test]
    fn test_slice_range() {
        assert_eq!(slice_range(1.0, Some(3.0), 5), (1, 3));
        assert_eq!(slice_range(-2.0, None, 5), (3, 5));
        assert_eq!(slice_range(0.0, Some(99.0), 5), (0, 5));
        assert_eq!(slice_range(7.0, None, 5), (5, 5));
        assert_eq!(slice_range(3.0, Some(1.0), 5), (3, 3));
    }
}
