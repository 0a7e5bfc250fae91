// Kestrel Parser Error Handling
// Error reporting with miette integration

use crate::parser::Rule;
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// Main parse error type with miette integration
#[derive(Error, Diagnostic, Debug)]
pub enum ParseError {
    #[error("Parse error on line {line}: {message}")]
    #[diagnostic(
        code(kestrel::parse::syntax),
        help("Check the syntax near the highlighted location")
    )]
    PestError {
        #[source_code]
        src: String,
        #[label("error occurred here")]
        span: SourceSpan,
        line: usize,
        message: String,
    },

    #[error("Unexpected {found} while parsing {context}")]
    #[diagnostic(
        code(kestrel::parse::unexpected_rule),
        help("This is a grammar mismatch; please report it with the failing source")
    )]
    UnexpectedRule {
        #[source_code]
        src: String,
        #[label("here")]
        span: SourceSpan,
        context: String,
        found: String,
    },

    #[error("Invalid number literal `{found}`")]
    #[diagnostic(
        code(kestrel::parse::invalid_number),
        help("Number literals look like 42, 2.5 or 1e3")
    )]
    InvalidNumber {
        #[source_code]
        src: String,
        #[label("invalid number")]
        span: SourceSpan,
        found: String,
    },

    #[error("Invalid string escape sequence `{found}`")]
    #[diagnostic(
        code(kestrel::parse::invalid_string_escape),
        help("Valid escape sequences: \\n, \\t, \\r, \\0, \\\\, \\\"")
    )]
    InvalidStringEscape {
        #[source_code]
        src: String,
        #[label("invalid escape sequence")]
        span: SourceSpan,
        found: String,
    },

    #[error("Cannot assign to this expression")]
    #[diagnostic(
        code(kestrel::parse::invalid_assignment_target),
        help("Only variables, member accesses (a.b) and index accesses (a[i]) can be assigned")
    )]
    InvalidAssignmentTarget {
        #[source_code]
        src: String,
        #[label("not assignable")]
        span: SourceSpan,
    },
}

impl ParseError {
    /// Create a parse error from a Pest parsing error
    pub fn from_pest_error(error: pest::error::Error<Rule>, src: String) -> Self {
        let span = match error.location {
            pest::error::InputLocation::Pos(pos) => SourceSpan::new(pos.into(), 1),
            pest::error::InputLocation::Span((start, end)) => {
                SourceSpan::new(start.into(), end - start)
            }
        };

        let line = match error.line_col {
            pest::error::LineColLocation::Pos((line, _)) => line,
            pest::error::LineColLocation::Span((line, _), _) => line,
        };

        let message = match &error.variant {
            pest::error::ErrorVariant::ParsingError {
                positives,
                negatives,
            } => {
                let mut expected: Vec<&'static str> =
                    positives.iter().map(rule_to_user_friendly_description).collect();
                expected.dedup();

                match (expected.is_empty(), negatives.is_empty()) {
                    (false, _) => format!("expected {}", join_alternatives(&expected)),
                    (true, false) => {
                        let unexpected: Vec<&'static str> =
                            negatives.iter().map(rule_to_user_friendly_description).collect();
                        format!("unexpected {}", join_alternatives(&unexpected))
                    }
                    (true, true) => "unexpected input".to_string(),
                }
            }
            pest::error::ErrorVariant::CustomError { message } => message.clone(),
        };

        ParseError::PestError {
            src,
            span,
            line,
            message,
        }
    }

    /// Create an unexpected rule error
    pub fn unexpected_rule(src: &str, span: SourceSpan, context: &str, found: Rule) -> Self {
        ParseError::UnexpectedRule {
            src: src.to_string(),
            span,
            context: context.to_string(),
            found: format!("{:?}", found),
        }
    }

    /// Create an error for a rule that ended before an expected child
    pub fn missing_child(src: &str, span: SourceSpan, context: &str) -> Self {
        ParseError::UnexpectedRule {
            src: src.to_string(),
            span,
            context: context.to_string(),
            found: "end of rule".to_string(),
        }
    }

    /// Create an invalid number error
    pub fn invalid_number(src: &str, span: SourceSpan, found: String) -> Self {
        ParseError::InvalidNumber {
            src: src.to_string(),
            span,
            found,
        }
    }

    /// Create an invalid string escape error
    pub fn invalid_string_escape(src: &str, span: SourceSpan, found: String) -> Self {
        ParseError::InvalidStringEscape {
            src: src.to_string(),
            span,
            found,
        }
    }

    /// Create an invalid assignment target error
    pub fn invalid_assignment_target(src: &str, span: SourceSpan) -> Self {
        ParseError::InvalidAssignmentTarget {
            src: src.to_string(),
            span,
        }
    }

    /// Attach the full source text to errors raised below the program level
    pub fn with_source(mut self, input: &str) -> Self {
        match &mut self {
            ParseError::PestError { src, .. }
            | ParseError::UnexpectedRule { src, .. }
            | ParseError::InvalidNumber { src, .. }
            | ParseError::InvalidStringEscape { src, .. }
            | ParseError::InvalidAssignmentTarget { src, .. } => {
                if src.is_empty() {
                    *src = input.to_string();
                }
            }
        }
        self
    }

    /// Source line the error points at, when known
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::PestError { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

fn join_alternatives(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [only] => (*only).to_string(),
        [init @ .., last] => format!("{} or {}", init.join(", "), last),
    }
}

/// Convert a parser rule to a user-friendly description
fn rule_to_user_friendly_description(rule: &Rule) -> &'static str {
    match rule {
        // Literals
        Rule::number => "a number",
        Rule::string => "a string",
        Rule::string_content => "string contents",
        Rule::boolean => "a boolean",
        Rule::nothing => "`nothing`",
        Rule::array => "an array",
        Rule::dictionary | Rule::dictionary_entry => "a dictionary",
        Rule::struct_literal | Rule::struct_path | Rule::struct_field => "a struct literal",
        Rule::function_literal => "a function literal",

        // Identifiers and expressions
        Rule::identifier => "an identifier",
        Rule::reserved => "a keyword",
        Rule::expression | Rule::single_expression | Rule::binary_expr | Rule::postfix_expr => {
            "an expression"
        }
        Rule::ternary_tail => "`?`",
        Rule::call_arguments => "an argument list",
        Rule::member_access => "`.`",
        Rule::index_access | Rule::slice_bounds | Rule::slice_start | Rule::slice_end => {
            "an index"
        }

        // Statements
        Rule::program => "a program",
        Rule::statement | Rule::expression_statement => "a statement",
        Rule::block => "a block",
        Rule::var_declaration => "a variable declaration",
        Rule::function_declaration => "a function declaration",
        Rule::parameter_list => "a parameter list",
        Rule::struct_declaration => "a struct declaration",
        Rule::method_declaration => "a method declaration",
        Rule::if_statement => "an if statement",
        Rule::elseif_clause => "`elseif`",
        Rule::else_clause => "`else`",
        Rule::loop_statement => "a loop",
        Rule::for_statement => "a for loop",
        Rule::try_statement => "a try statement",
        Rule::catch_clause => "`catch`",
        Rule::finally_clause => "`finally`",
        Rule::return_statement => "`return`",
        Rule::break_statement => "`break`",
        Rule::continue_statement => "`continue`",
        Rule::import_statement => "an import",
        Rule::assignment => "an assignment",

        // Keywords
        Rule::kw_var => "`var`",
        Rule::kw_fn => "`fn`",
        Rule::kw_struct => "`struct`",
        Rule::kw_if => "`if`",
        Rule::kw_elseif => "`elseif`",
        Rule::kw_else => "`else`",
        Rule::kw_loop => "`loop`",
        Rule::kw_for => "`for`",
        Rule::kw_in => "`in`",
        Rule::kw_try => "`try`",
        Rule::kw_catch => "`catch`",
        Rule::kw_finally => "`finally`",
        Rule::kw_return => "`return`",
        Rule::kw_break => "`break`",
        Rule::kw_continue => "`continue`",
        Rule::kw_import => "`import`",
        Rule::kw_as => "`as`",

        // Operators
        Rule::op_assign
        | Rule::op_assign_add
        | Rule::op_assign_subtract
        | Rule::op_assign_multiply
        | Rule::op_assign_divide => "an assignment operator",
        Rule::op_negate | Rule::op_not => "a prefix operator",
        Rule::op_or
        | Rule::op_and
        | Rule::op_equal
        | Rule::op_not_equal
        | Rule::op_less_equal
        | Rule::op_greater_equal
        | Rule::op_less
        | Rule::op_greater
        | Rule::op_add
        | Rule::op_subtract
        | Rule::op_multiply
        | Rule::op_divide
        | Rule::op_modulo => "an operator",

        Rule::EOI => "end of input",
        _ => "input",
    }
}
