// Parser test suite

mod test_api_functions;

use crate::ast::*;

/// Compact s-expression shape of an expression, for structural assertions
pub(crate) fn shape(expression: &Expression) -> String {
    match &expression.kind {
        ExpressionKind::Number(value) => value.to_string(),
        ExpressionKind::String(value) => format!("{:?}", value),
        ExpressionKind::Boolean(value) => value.to_string(),
        ExpressionKind::Nothing => "nothing".to_string(),
        ExpressionKind::Identifier(identifier) => identifier.name.clone(),
        ExpressionKind::Array(elements) => format!("[{}]", join(elements)),
        ExpressionKind::Dictionary(entries) => {
            let entries: Vec<String> = entries
                .iter()
                .map(|entry| format!("{:?}: {}", entry.key, shape(&entry.value)))
                .collect();
            format!("{{{}}}", entries.join(" "))
        }
        ExpressionKind::StructLiteral(literal) => {
            let fields: Vec<String> = literal
                .fields
                .iter()
                .map(|field| format!("{}: {}", field.name, shape(&field.value)))
                .collect();
            format!("(new {} {})", shape(&literal.target), fields.join(" "))
        }
        ExpressionKind::Function(function) => {
            let parameters: Vec<&str> = function
                .parameters
                .iter()
                .map(|parameter| parameter.name.as_str())
                .collect();
            format!("(fn ({}) {})", parameters.join(" "), function.body.statements.len())
        }
        ExpressionKind::Binary(binary) => format!(
            "({} {} {})",
            binary.operator,
            shape(&binary.left),
            shape(&binary.right)
        ),
        ExpressionKind::Unary(unary) => format!("({} {})", unary.operator, shape(&unary.operand)),
        ExpressionKind::Ternary(ternary) => format!(
            "(? {} {} {})",
            shape(&ternary.condition),
            shape(&ternary.then_value),
            shape(&ternary.else_value)
        ),
        ExpressionKind::Call(call) => {
            if call.arguments.is_empty() {
                format!("(call {})", shape(&call.callee))
            } else {
                format!("(call {} {})", shape(&call.callee), join(&call.arguments))
            }
        }
        ExpressionKind::Member(member) => format!("(. {} {})", shape(&member.object), member.property),
        ExpressionKind::Index(index) => {
            format!("(index {} {})", shape(&index.object), shape(&index.index))
        }
        ExpressionKind::Slice(slice) => format!(
            "(slice {} {} {})",
            shape(&slice.object),
            slice.start.as_deref().map(shape).unwrap_or_else(|| "_".to_string()),
            slice.end.as_deref().map(shape).unwrap_or_else(|| "_".to_string())
        ),
    }
}

fn join(expressions: &[Expression]) -> String {
    expressions.iter().map(shape).collect::<Vec<_>>().join(" ")
}

/// Parse a program expected to hold exactly one statement
pub(crate) fn single_statement(input: &str) -> StatementKind {
    let program = crate::parse_program(input).unwrap();
    assert_eq!(program.statements.len(), 1, "expected one statement in {input:?}");
    program.statements.into_iter().next().unwrap().kind
}
