//! Module imports, namespaces and native libraries

use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

use crate::environment::Env;
use crate::error::{ErrorKind, ErrorValue};
use crate::interpreter::{Interpreter, InterpreterError, Output};
use crate::modules::InMemoryLoader;
use crate::test_harness::InterpreterSession;
use crate::value::Value;

const GEOMETRY: &str = r#"
struct Point { x, y }
fn origin() { return Point{x: 0, y: 0} }
var unit = 1
"#;

#[test]
fn test_import_binds_namespace_under_file_stem() {
    let loader = InMemoryLoader::new().with_module("lib/geometry", GEOMETRY);
    let mut session = InterpreterSession::with_loader(loader);

    session.evaluate("import \"lib/geometry\"").unwrap();
    session.assert_evaluates_to_number("geometry.unit", 1.0).unwrap();
    session
        .assert_displays_as("geometry.origin()", "Point{x: 0, y: 0}")
        .unwrap();
    session
        .assert_evaluates_to_string("type(geometry)", "Namespace")
        .unwrap();
}

#[test]
fn test_import_with_alias_and_namespaced_struct_literal() {
    let loader = InMemoryLoader::new().with_module("geometry", GEOMETRY);
    let mut session = InterpreterSession::with_loader(loader);

    session.evaluate("import \"geometry\" as geo").unwrap();
    session.evaluate("var p = geo.Point{x: 3}").unwrap();
    session.assert_evaluates_to_number("p.x", 3.0).unwrap();
    session.assert_evaluates_to_nothing("p.y").unwrap();
    session
        .assert_error_kind("geometry", ErrorKind::IdentifierError)
        .unwrap();
}

#[test]
fn test_missing_export_is_a_property_error() {
    let loader = InMemoryLoader::new().with_module("geometry", GEOMETRY);
    let mut session = InterpreterSession::with_loader(loader);

    session.evaluate("import \"geometry\"").unwrap();
    let error = session
        .assert_error_kind("geometry.area", ErrorKind::PropertyError)
        .unwrap();
    assert_eq!(error.message, "module 'geometry' has no property 'area'");
}

#[test]
fn test_builtins_are_not_exported() {
    let loader = InMemoryLoader::new().with_module("empty", "var marker = true");
    let mut session = InterpreterSession::with_loader(loader);

    session.evaluate("import \"empty\"").unwrap();
    session.assert_evaluates_to_bool("empty.marker", true).unwrap();
    session
        .assert_error_kind("empty.println", ErrorKind::PropertyError)
        .unwrap();
}

#[test]
fn test_modules_use_their_own_scope() {
    let loader = InMemoryLoader::new().with_module("peek", "var seen = secret");
    let mut session = InterpreterSession::with_loader(loader);

    session.evaluate("var secret = 1").unwrap();
    session
        .assert_error_kind("import \"peek\"", ErrorKind::IdentifierError)
        .unwrap();
}

#[test]
fn test_imported_closures_see_their_module() {
    let loader = InMemoryLoader::new().with_module(
        "counter",
        "var count = 0\nfn bump() {\n    count += 1\n    return count\n}",
    );
    let mut session = InterpreterSession::with_loader(loader);

    session.evaluate("import \"counter\"\ncounter.bump()").unwrap();
    session.assert_evaluates_to_number("counter.bump()", 2.0).unwrap();
}

#[test]
fn test_circular_imports_are_rejected() {
    let loader = InMemoryLoader::new()
        .with_module("a", "import \"b\"\nvar name = \"a\"")
        .with_module("b", "import \"a\"\nvar name = \"b\"");
    let mut session = InterpreterSession::with_loader(loader);

    let error = session
        .assert_error_kind("import \"a\"", ErrorKind::CircularImportError)
        .unwrap();
    assert_eq!(error.message, "circular import of 'a.kes' from 'b.kes'");
    assert_eq!(error.location.map(|location| location.module).as_deref(), Some("b.kes"));
}

#[test]
fn test_self_import_is_rejected() {
    let loader = InMemoryLoader::new().with_module("me", "import \"me\"");
    let mut session = InterpreterSession::with_loader(loader);

    session
        .assert_error_kind("import \"me\"", ErrorKind::CircularImportError)
        .unwrap();
}

#[test]
fn test_shared_dependency_is_not_a_cycle() {
    let loader = InMemoryLoader::new()
        .with_module("left", "import \"base\"\nvar value = base.value + 1")
        .with_module("right", "import \"base\"\nvar value = base.value + 2")
        .with_module("base", "var value = 10");
    let mut session = InterpreterSession::with_loader(loader);

    session.evaluate("import \"left\"\nimport \"right\"").unwrap();
    session
        .assert_evaluates_to_number("left.value + right.value", 23.0)
        .unwrap();
}

#[test]
fn test_import_failures_are_runtime_errors() {
    let loader = InMemoryLoader::new().with_module("broken", "var = 1");
    let mut session = InterpreterSession::with_loader(loader);

    let error = session
        .assert_error_kind("import \"nowhere\"", ErrorKind::RuntimeError)
        .unwrap();
    assert!(error.message.starts_with("cannot import 'nowhere'"));

    let error = session
        .assert_error_kind("import \"broken\"", ErrorKind::RuntimeError)
        .unwrap();
    assert!(error.message.starts_with("cannot import 'broken.kes'"));
}

#[test]
fn test_errors_inside_modules_carry_the_module_name() {
    let loader = InMemoryLoader::new().with_module("faulty", "var ok = 1\nvar bad = 1 / 0");
    let mut session = InterpreterSession::with_loader(loader);

    let error = session
        .assert_error_kind("import \"faulty\"", ErrorKind::ZeroDivisionError)
        .unwrap();
    let location = error.location.unwrap();
    assert_eq!(location.module, "faulty.kes");
    assert_eq!(location.line, 2);
}

#[test]
fn test_math_library() {
    let mut session = InterpreterSession::new();

    session.evaluate("import \"math\"").unwrap();
    session.assert_evaluates_to_number("math.sqrt(16)", 4.0).unwrap();
    session.assert_evaluates_to_number("math.max(3, 9, 4)", 9.0).unwrap();
    session.assert_evaluates_to_number("math.floor(math.pi)", 3.0).unwrap();

    session.evaluate("import \"math\" as m").unwrap();
    session.assert_evaluates_to_number("m.pow(2, 10)", 1024.0).unwrap();
    session
        .assert_error_kind("m.min()", ErrorKind::InvalidArgumentError)
        .unwrap();
}

#[test]
fn test_run_file_resolves_imports_relative_to_the_importer() {
    let root = std::env::temp_dir().join(format!("kestrel-imports-{}", std::process::id()));
    fs::create_dir_all(root.join("lib")).unwrap();
    fs::write(
        root.join("main.kes"),
        "import \"lib/greet\"\ngreet.hello(\"kes\")",
    )
    .unwrap();
    fs::write(
        root.join("lib/greet.kes"),
        "import \"suffix\"\nfn hello(name) { return \"hello \" + name + suffix.mark }",
    )
    .unwrap();
    fs::write(root.join("lib/suffix.kes"), "var mark = \"!\"").unwrap();

    let result = Interpreter::new().run_file(&root.join("main.kes"));
    fs::remove_dir_all(&root).unwrap();

    let value = result.unwrap();
    assert_eq!(value.to_display_string(), "hello kes!");
}

#[test]
fn test_run_file_reports_missing_files() {
    let missing = std::env::temp_dir().join("kestrel-definitely-missing.kes");
    assert!(matches!(
        Interpreter::new().run_file(&missing),
        Err(InterpreterError::Io { .. })
    ));
}

fn load_greetings(env: &Env, alias: &str) -> Result<(), ErrorValue> {
    if alias == "forbidden" {
        return Err(ErrorValue::new(
            ErrorKind::InvalidArgumentError,
            "greetings cannot be bound as 'forbidden'",
        ));
    }
    env.force_declare(alias, Value::from("hello"));
    Ok(())
}

#[test]
fn test_registered_native_library() {
    let mut interpreter = Interpreter::new();
    interpreter.register_library("greetings", load_greetings);

    let value = interpreter
        .run_source("import \"greetings\" as hi\nhi + \"!\"", "main")
        .unwrap();
    assert_eq!(value.to_display_string(), "hello!");

    match interpreter.run_source("import \"greetings\" as forbidden", "main") {
        Err(InterpreterError::Runtime(error)) => {
            assert_eq!(error.kind, ErrorKind::InvalidArgumentError);
        }
        other => panic!("Expected runtime error, got {:?}", other),
    }
}

#[test]
fn test_entry_module_importing_itself_is_caught_immediately() {
    let loader = InMemoryLoader::new().with_module("main", "println(\"reloaded\")\nimport \"main\"");
    let buffer = Rc::new(RefCell::new(Vec::<u8>::new()));
    let output: Output = buffer.clone();
    let mut interpreter = Interpreter::new().with_loader(loader).with_output(output);

    match interpreter.run_source("println(\"entry\")\nimport \"main\"", "main") {
        Err(InterpreterError::Runtime(error)) => {
            assert_eq!(error.kind, ErrorKind::CircularImportError);
            assert_eq!(error.message, "circular import of 'main.kes' from 'main.kes'");
            assert_eq!(error.location.map(|location| location.line), Some(2));
        }
        other => panic!("Expected circular import error, got {:?}", other),
    }

    let written = String::from_utf8(buffer.borrow().clone()).unwrap();
    assert_eq!(written, "entry\n");
}
