use clap::{Parser, Subcommand};
use kestrel_interpreter::{Interpreter, InterpreterConfig, InterpreterError, MAX_CALL_STACK_DEPTH};
use kestrel_parser::{ParseError, parse_program_with_source};
use miette::{Diagnostic, MietteHandlerOpts};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Once;
use thiserror::Error;
use tracing::debug;

mod repl;
mod sexpr;

use repl::{ReplError, ReplSession};

#[derive(Parser)]
#[command(
    name = "kestrel",
    version,
    about = "The Kestrel scripting language",
    long_about = "Kestrel is a small dynamically typed scripting language with structs, closures and modules."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Maximum depth of nested function calls
    #[arg(long, global = true, value_name = "DEPTH", default_value_t = MAX_CALL_STACK_DEPTH)]
    max_call_depth: usize,

    /// Stop evaluating `and`/`or` once the left operand decides the result
    #[arg(long, global = true)]
    short_circuit: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a Kestrel program
    Run {
        /// Kestrel source file (.kes)
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Parse Kestrel source files and display their AST
    Parse {
        /// Kestrel source files to parse (use '-' to read from stdin)
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,

        /// Show the full syntax tree including spans
        #[arg(short, long)]
        spans: bool,
    },

    /// Start an interactive session (the default)
    Repl,
}

/// Fatal errors reported by the `kestrel` binary
#[derive(Debug, Error, Diagnostic)]
enum CliError {
    #[error("File not found: {}", .path.display())]
    #[diagnostic(code(kestrel::cli::not_found))]
    NotFound { path: PathBuf },

    #[error("Expected a .kes file, got: {}", .path.display())]
    #[diagnostic(code(kestrel::cli::extension))]
    WrongExtension { path: PathBuf },

    #[error("Could not read {name}")]
    #[diagnostic(code(kestrel::cli::io))]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Interpreter(#[from] InterpreterError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Repl(#[from] ReplError),

    #[error("{count} of {total} files failed to parse")]
    #[diagnostic(code(kestrel::cli::parse_failed))]
    ParseFailed { count: usize, total: usize },
}

fn main() {
    setup_miette_handler();
    init_tracing();

    let cli = Cli::parse();
    let config = InterpreterConfig {
        max_call_depth: cli.max_call_depth,
        short_circuit_logic: cli.short_circuit,
    };

    let outcome = match cli.command.unwrap_or(Commands::Repl) {
        Commands::Run { file } => handle_run_command(&file, config),
        Commands::Parse { files, spans } => handle_parse_command(&files, spans),
        Commands::Repl => handle_repl_command(config),
    };

    if let Err(error) = outcome {
        eprintln!("{:?}", miette::Report::new(error));
        process::exit(1);
    }
}

/// Configure miette for error reporting
fn setup_miette_handler() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .tab_width(4)
                .with_cause_chain()
                .build(),
        )
    }))
    .ok();
}

static TRACING_INIT: Once = Once::new();

/// Install a `fmt` subscriber, but only when `RUST_LOG` is set
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}

fn handle_run_command(file: &Path, config: InterpreterConfig) -> Result<(), CliError> {
    validate_source_file(file)?;
    debug!(file = %file.display(), "running program");

    let mut interpreter = Interpreter::with_config(config);
    interpreter.run_file(file)?;
    Ok(())
}

fn handle_repl_command(config: InterpreterConfig) -> Result<(), CliError> {
    let mut session = ReplSession::new(config)?;
    session.run()?;
    Ok(())
}

fn handle_parse_command(files: &[PathBuf], spans: bool) -> Result<(), CliError> {
    let multiple_files = files.len() > 1;
    let mut failures = 0;

    for file_path in files {
        match parse_single_file(file_path, spans) {
            Ok(()) => {
                if multiple_files {
                    println!("✅ {}", display_name(file_path));
                }
            }
            Err(error) => {
                eprintln!("{:?}", miette::Report::new(error));
                failures += 1;
            }
        }
    }

    if failures > 0 {
        return Err(CliError::ParseFailed {
            count: failures,
            total: files.len(),
        });
    }
    Ok(())
}

fn parse_single_file(file_path: &Path, spans: bool) -> Result<(), CliError> {
    let name = display_name(file_path);
    let source = if file_path.to_str() == Some("-") {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|source| CliError::Io {
                name: name.clone(),
                source,
            })?;
        buffer
    } else {
        validate_source_file(file_path)?;
        fs::read_to_string(file_path).map_err(|source| CliError::Io {
            name: name.clone(),
            source,
        })?
    };

    let program = parse_program_with_source(&source, Some(name))?;
    if spans {
        println!("{:#?}", program);
    } else {
        println!("{}", sexpr::format_program_as_sexpr(&program));
    }
    Ok(())
}

/// The file must exist and carry the `.kes` extension
fn validate_source_file(path: &Path) -> Result<(), CliError> {
    if !path.exists() {
        return Err(CliError::NotFound {
            path: path.to_path_buf(),
        });
    }

    if path.extension().and_then(|extension| extension.to_str()) != Some("kes") {
        return Err(CliError::WrongExtension {
            path: path.to_path_buf(),
        });
    }

    Ok(())
}

fn display_name(path: &Path) -> String {
    if path.to_str() == Some("-") {
        "<stdin>".to_string()
    } else {
        path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_to_repl() {
        let cli = Cli::parse_from(["kestrel"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.max_call_depth, MAX_CALL_STACK_DEPTH);
        assert!(!cli.short_circuit);
    }

    #[test]
    fn test_cli_run_with_flags() {
        let cli = Cli::parse_from([
            "kestrel",
            "run",
            "main.kes",
            "--max-call-depth",
            "64",
            "--short-circuit",
        ]);
        assert!(matches!(cli.command, Some(Commands::Run { ref file }) if file == Path::new("main.kes")));
        assert_eq!(cli.max_call_depth, 64);
        assert!(cli.short_circuit);
    }

    #[test]
    fn test_validate_source_file() {
        let missing = Path::new("definitely/not/here.kes");
        assert!(matches!(
            validate_source_file(missing),
            Err(CliError::NotFound { .. })
        ));

        let manifest = Path::new(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml");
        assert!(matches!(
            validate_source_file(&manifest),
            Err(CliError::WrongExtension { .. })
        ));
    }

    #[test]
    fn test_display_name_for_stdin() {
        assert_eq!(display_name(Path::new("-")), "<stdin>");
        assert_eq!(display_name(Path::new("a.kes")), "a.kes");
    }
}
