//! REPL (Read-Eval-Print Loop) for the Kestrel interpreter
//!
//! Every line is evaluated in one persistent module environment, so
//! variables, functions and structs declared earlier stay visible. Features:
//! - Multi-line input while brackets or strings are unbalanced
//! - `:`-prefixed commands for inspecting and resetting the session
//! - Error recovery: a failing line is reported and the session continues
//! - History support and line editing with rustyline

use kestrel_interpreter::{Env, Interpreter, InterpreterConfig, InterpreterError, Value};
use miette::Diagnostic;
use rustyline::{DefaultEditor, error::ReadlineError};
use thiserror::Error;

/// Module name for code typed into the REPL
const REPL_MODULE: &str = "<repl>";

/// Errors that can occur in the REPL
#[derive(Debug, Error, Diagnostic)]
pub enum ReplError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Interpreter(#[from] InterpreterError),

    #[error("Readline error: {source}")]
    #[diagnostic(code(kestrel::repl::readline))]
    Readline {
        #[from]
        source: ReadlineError,
    },

    #[error("{message}")]
    #[diagnostic(code(kestrel::repl::command), help("Type :help for available commands"))]
    Command { message: String },
}

/// REPL configuration options
#[derive(Debug, Clone)]
pub struct ReplConfig {
    /// Prompt string for input
    pub prompt: String,

    /// Enable history persistence
    pub persist_history: bool,

    /// History file path
    pub history_file: Option<String>,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            prompt: "kestrel> ".to_string(),
            persist_history: true,
            history_file: Some(".kestrel_history".to_string()),
        }
    }
}

/// REPL session statistics
#[derive(Debug, Clone, Default)]
pub struct ReplStats {
    pub lines_evaluated: usize,
    pub errors_encountered: usize,
    pub commands_executed: usize,
}

/// Result of evaluating a line in the REPL
#[derive(Debug)]
pub enum ReplResult {
    /// Value of the last statement on the line
    Value(Value),

    /// Output of a REPL command
    Command { message: String },

    /// Empty line or comment
    Empty,

    /// Exit request
    Exit,
}

/// REPL session that maintains state across evaluations
pub struct ReplSession {
    editor: DefaultEditor,
    interpreter: Interpreter,
    /// Module scope shared by every line
    env: Env,
    config: ReplConfig,
    stats: ReplStats,
}

impl ReplSession {
    /// Create a new REPL session with default REPL settings
    pub fn new(interpreter_config: InterpreterConfig) -> Result<Self, ReplError> {
        Self::with_config(interpreter_config, ReplConfig::default())
    }

    pub fn with_config(
        interpreter_config: InterpreterConfig,
        config: ReplConfig,
    ) -> Result<Self, ReplError> {
        let mut editor = DefaultEditor::new()?;

        if config.persist_history {
            if let Some(ref history_file) = config.history_file {
                let _ = editor.load_history(history_file); // Missing on first use
            }
        }

        let interpreter = Interpreter::with_config(interpreter_config);
        let env = interpreter.session_environment(REPL_MODULE);

        Ok(Self {
            editor,
            interpreter,
            env,
            config,
            stats: ReplStats::default(),
        })
    }

    /// Start the REPL main loop
    pub fn run(&mut self) -> Result<(), ReplError> {
        self.print_welcome();

        while let Some(line) = self.read_line()? {
            match self.evaluate_line(&line) {
                Ok(ReplResult::Exit) => break,
                Ok(result) => self.display_result(result),
                Err(error) => {
                    self.stats.errors_encountered += 1;
                    eprintln!("{:?}", miette::Report::new(error));
                }
            }
        }

        println!("Goodbye!");
        self.save_history()
    }

    /// Read one complete input, prompting again while it is unbalanced
    fn read_line(&mut self) -> Result<Option<String>, ReplError> {
        let mut complete_input = String::new();
        let mut line_count = 0;

        loop {
            let prompt = if line_count == 0 {
                self.config.prompt.as_str()
            } else {
                "... "
            };

            match self.editor.readline(prompt) {
                Ok(line) => {
                    line_count += 1;

                    if line_count == 1 && line.trim().is_empty() {
                        return Ok(Some(String::new()));
                    }

                    if !complete_input.is_empty() {
                        complete_input.push('\n');
                    }
                    complete_input.push_str(&line);

                    if is_input_complete(&complete_input) {
                        self.editor.add_history_entry(complete_input.as_str())?;
                        return Ok(Some(complete_input));
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C abandons the current input
                    println!("^C");
                    return Ok(Some(String::new()));
                }
                Err(ReadlineError::Eof) => return Ok(None),
                Err(error) => return Err(error.into()),
            }
        }
    }

    /// Evaluate a line of input
    pub fn evaluate_line(&mut self, line: &str) -> Result<ReplResult, ReplError> {
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with("//") {
            return Ok(ReplResult::Empty);
        }

        if trimmed.starts_with(':') {
            return self.execute_command(trimmed);
        }

        self.stats.lines_evaluated += 1;
        let value = self.interpreter.evaluate_in(line, &self.env)?;
        Ok(ReplResult::Value(value))
    }

    fn execute_command(&mut self, command: &str) -> Result<ReplResult, ReplError> {
        self.stats.commands_executed += 1;

        match command.split_whitespace().next().unwrap_or_default() {
            ":help" | ":h" => Ok(ReplResult::Command {
                message: help_message(),
            }),

            ":vars" => Ok(ReplResult::Command {
                message: self.format_variables(),
            }),

            ":clear" => {
                self.env.clear();
                Ok(ReplResult::Command {
                    message: "Session bindings cleared".to_string(),
                })
            }

            ":stats" => Ok(ReplResult::Command {
                message: self.format_stats(),
            }),

            ":quit" | ":q" | ":exit" => Ok(ReplResult::Exit),

            unknown => Err(ReplError::Command {
                message: format!("Unknown command: {unknown}"),
            }),
        }
    }

    fn display_result(&self, result: ReplResult) {
        match result {
            ReplResult::Value(Value::Nothing) | ReplResult::Empty | ReplResult::Exit => {}
            ReplResult::Value(value) => println!("{}", value.repr()),
            ReplResult::Command { message } => println!("{message}"),
        }
    }

    fn print_welcome(&self) {
        println!("Kestrel REPL v{}", env!("CARGO_PKG_VERSION"));
        println!("Type :help for commands, :quit to exit");
        println!();
    }

    fn save_history(&mut self) -> Result<(), ReplError> {
        if self.config.persist_history {
            if let Some(ref history_file) = self.config.history_file {
                self.editor.save_history(history_file)?;
            }
        }
        Ok(())
    }

    fn format_variables(&self) -> String {
        let bindings = self.env.bindings();
        if bindings.is_empty() {
            return "No variables defined".to_string();
        }

        let mut lines = vec!["Variables:".to_string()];
        for (name, value) in &bindings {
            lines.push(format!("  {name}: {} = {}", value.type_name(), value.repr()));
        }
        lines.join("\n")
    }

    fn format_stats(&self) -> String {
        format!(
            r#"Session Statistics:
  Lines evaluated: {}
  Errors encountered: {}
  Commands executed: {}"#,
            self.stats.lines_evaluated, self.stats.errors_encountered, self.stats.commands_executed
        )
    }
}

fn help_message() -> String {
    r#"Kestrel REPL Commands:
  :help, :h           Show this help message
  :vars               List session variables with their values
  :clear              Remove every session binding
  :stats              Show session statistics
  :quit, :q, :exit    Exit the REPL

Examples:
  var xs = [1, 2, 3]   Bind a variable
  xs.len()             Call a method
  import "math"        Load the math library

Input continues on a new line (...) while brackets or strings are open.
Use Ctrl+C to abandon input, Ctrl+D to exit."#
        .to_string()
}

/// Whether brackets are balanced and no string is left open
fn is_input_complete(input: &str) -> bool {
    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' | '[' | '(' => depth += 1,
            '}' | ']' | ')' => depth -= 1,
            '/' if chars.peek() == Some(&'/') => {
                // Line comment
                for next in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
            }
            _ => {}
        }
    }

    depth <= 0 && !in_string
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_repl() -> ReplSession {
        let config = ReplConfig {
            persist_history: false,
            history_file: None,
            ..Default::default()
        };
        ReplSession::with_config(InterpreterConfig::default(), config)
            .expect("Failed to create test REPL")
    }

    #[test]
    fn test_bindings_persist_across_lines() {
        let mut repl = create_test_repl();

        repl.evaluate_line("var x = 40").unwrap();
        repl.evaluate_line("fn add(a, b) { return a + b }").unwrap();
        match repl.evaluate_line("add(x, 2)").unwrap() {
            ReplResult::Value(value) => assert!(value.equals(&Value::Number(42.0))),
            other => panic!("Expected value result, got {:?}", other),
        }
        assert_eq!(repl.stats.lines_evaluated, 3);
    }

    #[test]
    fn test_errors_do_not_end_the_session() {
        let mut repl = create_test_repl();

        repl.evaluate_line("var total = 1").unwrap();
        assert!(matches!(
            repl.evaluate_line("total / 0"),
            Err(ReplError::Interpreter(InterpreterError::Runtime(_)))
        ));
        assert!(matches!(
            repl.evaluate_line("var = "),
            Err(ReplError::Interpreter(InterpreterError::Parse(_)))
        ));
        assert!(matches!(
            repl.evaluate_line("total"),
            Ok(ReplResult::Value(Value::Number(n))) if n == 1.0
        ));
    }

    #[test]
    fn test_empty_line_handling() {
        let mut repl = create_test_repl();

        assert!(matches!(repl.evaluate_line("").unwrap(), ReplResult::Empty));
        assert!(matches!(repl.evaluate_line("   ").unwrap(), ReplResult::Empty));
        assert!(matches!(
            repl.evaluate_line("// comment").unwrap(),
            ReplResult::Empty
        ));
    }

    #[test]
    fn test_help_command() {
        let mut repl = create_test_repl();

        match repl.evaluate_line(":help").unwrap() {
            ReplResult::Command { message } => {
                assert!(message.contains("Kestrel REPL Commands"));
                assert!(message.contains(":vars"));
                assert!(message.contains(":quit"));
            }
            other => panic!("Expected command result, got {:?}", other),
        }
        assert_eq!(repl.stats.commands_executed, 1);
    }

    #[test]
    fn test_vars_and_clear_commands() {
        let mut repl = create_test_repl();

        match repl.evaluate_line(":vars").unwrap() {
            ReplResult::Command { message } => assert_eq!(message, "No variables defined"),
            other => panic!("Expected command result, got {:?}", other),
        }

        repl.evaluate_line("var name = \"kes\"").unwrap();
        match repl.evaluate_line(":vars").unwrap() {
            ReplResult::Command { message } => {
                assert!(message.contains("name: String = \"kes\""));
            }
            other => panic!("Expected command result, got {:?}", other),
        }

        repl.evaluate_line(":clear").unwrap();
        assert!(repl.evaluate_line("name").is_err());
        // Builtins survive a clear
        assert!(repl.evaluate_line("type(1)").is_ok());
    }

    #[test]
    fn test_quit_command() {
        let mut repl = create_test_repl();

        for command in [":quit", ":q", ":exit"] {
            assert!(matches!(
                repl.evaluate_line(command).unwrap(),
                ReplResult::Exit
            ));
        }
    }

    #[test]
    fn test_unknown_command() {
        let mut repl = create_test_repl();

        match repl.evaluate_line(":frobnicate") {
            Err(ReplError::Command { message }) => {
                assert!(message.contains(":frobnicate"));
            }
            other => panic!("Expected command error, got {:?}", other),
        }
    }

    #[test]
    fn test_multi_line_input_detection() {
        assert!(is_input_complete("42"));
        assert!(is_input_complete("var xs = [1, 2, 3]"));
        assert!(is_input_complete("\"string with [brackets] inside\""));
        assert!(is_input_complete("fn f() { return 1 }"));

        assert!(!is_input_complete("fn f() {"));
        assert!(!is_input_complete("var xs = [1,"));
        assert!(!is_input_complete("print("));
        assert!(!is_input_complete("\"unterminated"));
        assert!(!is_input_complete("var s = \"escaped \\\" quote"));

        assert!(is_input_complete("1 // a comment with ( in it"));
        assert!(!is_input_complete("[ // comment\n1,"));
    }

    #[test]
    fn test_repl_config_defaults() {
        let config = ReplConfig::default();
        assert_eq!(config.prompt, "kestrel> ");
        assert!(config.persist_history);
        assert_eq!(config.history_file.as_deref(), Some(".kestrel_history"));
    }
}
