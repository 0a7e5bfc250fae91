// S-expression formatter for the Kestrel AST
// Renders programs as compact Lisp-like trees for `kestrel parse`

use kestrel_parser::*;

pub fn format_program_as_sexpr(program: &Program) -> String {
    if program.statements.is_empty() {
        return "(program)".to_string();
    }

    let statements: Vec<String> = program
        .statements
        .iter()
        .map(|statement| format_statement(statement, 2))
        .collect();
    format!("(program\n  {})", statements.join("\n  "))
}

fn format_statement(statement: &Statement, indent: usize) -> String {
    match &statement.kind {
        StatementKind::Var(declaration) => format!(
            "(var {} {})",
            declaration.name,
            format_expression(&declaration.value)
        ),
        StatementKind::Assignment(assignment) => format!(
            "({} {} {})",
            assignment.operator,
            format_expression(&assignment.target),
            format_expression(&assignment.value)
        ),
        StatementKind::Expression(expression) => format_expression(expression),
        StatementKind::If(statement) => {
            let mut parts: Vec<String> = statement
                .branches
                .iter()
                .map(|branch| {
                    format!(
                        "(when {} {})",
                        format_expression(&branch.condition),
                        format_block(&branch.body, indent + 2)
                    )
                })
                .collect();
            if let Some(else_block) = &statement.else_block {
                parts.push(format!("(else {})", format_block(else_block, indent + 2)));
            }
            format!("(if {})", parts.join(" "))
        }
        StatementKind::Loop(statement) => {
            format!("(loop {})", format_block(&statement.body, indent))
        }
        StatementKind::For(statement) => {
            let bindings = match &statement.index {
                Some(index) => format!("{} {}", index, statement.item),
                None => statement.item.to_string(),
            };
            format!(
                "(for ({}) {} {})",
                bindings,
                format_expression(&statement.iterable),
                format_block(&statement.body, indent)
            )
        }
        StatementKind::Function(declaration) => format_function(declaration, indent),
        StatementKind::Struct(declaration) => format!(
            "(struct {} ({}))",
            declaration.name,
            join_identifiers(&declaration.properties)
        ),
        StatementKind::Method(declaration) => format!(
            "(method {} {})",
            declaration.struct_name,
            format_function(&declaration.function, indent)
        ),
        StatementKind::Try(statement) => {
            let mut parts = vec![format_block(&statement.body, indent + 2)];
            if let Some(catch_block) = &statement.catch_block {
                parts.push(format!("(catch {})", format_block(catch_block, indent + 2)));
            }
            if let Some(finally_block) = &statement.finally_block {
                parts.push(format!(
                    "(finally {})",
                    format_block(finally_block, indent + 2)
                ));
            }
            format!("(try {})", parts.join(" "))
        }
        StatementKind::Return(Some(value)) => format!("(return {})", format_expression(value)),
        StatementKind::Return(None) => "(return)".to_string(),
        StatementKind::Break => "(break)".to_string(),
        StatementKind::Continue => "(continue)".to_string(),
        StatementKind::Import(import) => match &import.alias {
            Some(alias) => format!("(import {:?} {})", import.path, alias),
            None => format!("(import {:?})", import.path),
        },
    }
}

fn format_function(declaration: &FunctionDeclaration, indent: usize) -> String {
    format!(
        "(fn {} ({}) {})",
        declaration.name,
        join_identifiers(&declaration.parameters),
        format_block(&declaration.body, indent)
    )
}

/// Single-statement blocks stay inline; longer ones go one statement per line
fn format_block(block: &Block, indent: usize) -> String {
    match block.statements.as_slice() {
        [] => "(block)".to_string(),
        [statement] => format!("(block {})", format_statement(statement, indent + 2)),
        statements => {
            let padding = " ".repeat(indent + 2);
            let lines: Vec<String> = statements
                .iter()
                .map(|statement| format!("{}{}", padding, format_statement(statement, indent + 2)))
                .collect();
            format!("(block\n{})", lines.join("\n"))
        }
    }
}

fn format_expression(expression: &Expression) -> String {
    match &expression.kind {
        ExpressionKind::Number(value) => value.to_string(),
        ExpressionKind::String(value) => format!("{:?}", value),
        ExpressionKind::Boolean(value) => value.to_string(),
        ExpressionKind::Nothing => "nothing".to_string(),
        ExpressionKind::Identifier(identifier) => identifier.name.clone(),
        ExpressionKind::Array(items) => format_list("array", items.iter().map(format_expression)),
        ExpressionKind::Dictionary(entries) => format_list(
            "dict",
            entries
                .iter()
                .map(|entry| format!("({:?} {})", entry.key, format_expression(&entry.value))),
        ),
        ExpressionKind::StructLiteral(literal) => format_list(
            &format!("new {}", format_expression(&literal.target)),
            literal
                .fields
                .iter()
                .map(|field| format!("({} {})", field.name, format_expression(&field.value))),
        ),
        ExpressionKind::Function(literal) => format!(
            "(fn ({}) {})",
            join_identifiers(&literal.parameters),
            format_block(&literal.body, 0)
        ),
        ExpressionKind::Binary(operation) => format!(
            "({} {} {})",
            operation.operator,
            format_expression(&operation.left),
            format_expression(&operation.right)
        ),
        ExpressionKind::Unary(operation) => format!(
            "({} {})",
            operation.operator,
            format_expression(&operation.operand)
        ),
        ExpressionKind::Ternary(ternary) => format!(
            "(? {} {} {})",
            format_expression(&ternary.condition),
            format_expression(&ternary.then_value),
            format_expression(&ternary.else_value)
        ),
        ExpressionKind::Call(call) => format_list(
            &format!("call {}", format_expression(&call.callee)),
            call.arguments.iter().map(format_expression),
        ),
        ExpressionKind::Member(access) => format!(
            "(. {} {})",
            format_expression(&access.object),
            access.property
        ),
        ExpressionKind::Index(access) => format!(
            "(index {} {})",
            format_expression(&access.object),
            format_expression(&access.index)
        ),
        ExpressionKind::Slice(access) => {
            let bound = |bound: &Option<Box<Expression>>| match bound {
                Some(expression) => format_expression(expression),
                None => "_".to_string(),
            };
            format!(
                "(slice {} {} {})",
                format_expression(&access.object),
                bound(&access.start),
                bound(&access.end)
            )
        }
    }
}

fn format_list(head: &str, items: impl Iterator<Item = String>) -> String {
    let items: Vec<String> = items.collect();
    if items.is_empty() {
        format!("({})", head)
    } else {
        format!("({} {})", head, items.join(" "))
    }
}

fn join_identifiers(identifiers: &[Identifier]) -> String {
    identifiers
        .iter()
        .map(|identifier| identifier.name.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sexpr(source: &str) -> String {
        format_program_as_sexpr(&parse_program(source).unwrap())
    }

    #[test]
    fn test_empty_program() {
        assert_eq!(sexpr(""), "(program)");
    }

    #[test]
    fn test_expressions() {
        assert_eq!(sexpr("1 + 2 * 3"), "(program\n  (+ 1 (* 2 3)))");
        assert_eq!(
            sexpr("xs[1:].len()"),
            "(program\n  (call (. (slice xs 1 _) len)))"
        );
        assert_eq!(
            sexpr("not a ? \"y\" : nothing"),
            "(program\n  (? (not a) \"y\" nothing))"
        );
    }

    #[test]
    fn test_declarations() {
        assert_eq!(
            sexpr("var p = Point{x: 1}\np.x += 2"),
            "(program\n  (var p (new Point (x 1)))\n  (+= (. p x) 2))"
        );
        assert_eq!(
            sexpr("import \"lib/math\" as m"),
            "(program\n  (import \"lib/math\" m))"
        );
    }

    #[test]
    fn test_blocks() {
        assert_eq!(
            sexpr("fn f(a, b) { return a }"),
            "(program\n  (fn f (a b) (block (return a))))"
        );
        assert_eq!(
            sexpr("loop {\n  break\n  continue\n}"),
            "(program\n  (loop (block\n    (break)\n    (continue))))"
        );
    }
}
