// Expression parsing module
// Handles operator precedence, prefix/postfix operators and primary expressions

use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};

use crate::ast::*;
use crate::error::*;
use crate::parser::{InnerPairs, KestrelParser, Rule};

impl KestrelParser {
    /// Binary operator precedence parser
    /// Precedence levels from lowest to highest
    pub(crate) fn pratt_parser() -> PrattParser<Rule> {
        PrattParser::new()
            // Level 1: Logical OR (lowest precedence)
            .op(Op::infix(Rule::op_or, Assoc::Left))
            // Level 2: Logical AND
            .op(Op::infix(Rule::op_and, Assoc::Left))
            // Level 3: Equality
            .op(Op::infix(Rule::op_equal, Assoc::Left) | Op::infix(Rule::op_not_equal, Assoc::Left))
            // Level 4: Comparison
            .op(Op::infix(Rule::op_less, Assoc::Left)
                | Op::infix(Rule::op_less_equal, Assoc::Left)
                | Op::infix(Rule::op_greater, Assoc::Left)
                | Op::infix(Rule::op_greater_equal, Assoc::Left))
            // Level 5: Additive
            .op(Op::infix(Rule::op_add, Assoc::Left) | Op::infix(Rule::op_subtract, Assoc::Left))
            // Level 6: Multiplicative
            .op(Op::infix(Rule::op_multiply, Assoc::Left)
                | Op::infix(Rule::op_divide, Assoc::Left)
                | Op::infix(Rule::op_modulo, Assoc::Left))
            // Level 7: Prefix operators (highest precedence)
            .op(Op::prefix(Rule::op_negate) | Op::prefix(Rule::op_not))
    }

    /// Parse an `expression` pair: a binary expression with an optional ternary tail
    pub(crate) fn parse_expression_from_pair(pair: Pair<Rule>) -> ParseResult<Expression> {
        let span = Self::span_from_pair(&pair);
        let mut inner = InnerPairs::new(pair, "expression");

        let binary = inner.expect(Rule::binary_expr)?;
        let condition = Self::parse_expression_with_precedence(binary.into_inner())?;

        let Some(tail) = inner.next_if(Rule::ternary_tail) else {
            return Ok(condition);
        };

        let mut tail_inner = InnerPairs::new(tail, "ternary expression");
        let then_value = Self::parse_expression_from_pair(tail_inner.expect(Rule::expression)?)?;
        let else_value = Self::parse_expression_from_pair(tail_inner.expect(Rule::expression)?)?;

        Ok(Expression::new(
            ExpressionKind::Ternary(TernaryExpression {
                condition: Box::new(condition),
                then_value: Box::new(then_value),
                else_value: Box::new(else_value),
                span,
            }),
            span,
        ))
    }

    /// Parse expression using precedence climbing
    pub(crate) fn parse_expression_with_precedence(pairs: Pairs<Rule>) -> ParseResult<Expression> {
        Self::pratt_parser()
            .map_primary(Self::parse_postfix_expr)
            .map_prefix(|op: Pair<Rule>, operand: ParseResult<Expression>| {
                let operand = operand?;
                let op_span = Self::span_from_pair(&op);

                let operator = match op.as_rule() {
                    Rule::op_negate => UnaryOperator::Negate,
                    Rule::op_not => UnaryOperator::Not,
                    rule => {
                        return Err(ParseError::unexpected_rule(
                            "",
                            Self::source_span(&op_span),
                            "prefix operator",
                            rule,
                        ))
                    }
                };

                let span = Self::span_between(&op_span, &operand.span);
                Ok(Expression::new(
                    ExpressionKind::Unary(UnaryOperation {
                        operator,
                        operand: Box::new(operand),
                        span,
                    }),
                    span,
                ))
            })
            .map_infix(
                |left: ParseResult<Expression>, op: Pair<Rule>, right: ParseResult<Expression>| {
                    let left = left?;
                    let right = right?;

                    let operator = match op.as_rule() {
                        // Logical operators
                        Rule::op_or => BinaryOperator::Or,
                        Rule::op_and => BinaryOperator::And,
                        // Equality operators
                        Rule::op_equal => BinaryOperator::Equal,
                        Rule::op_not_equal => BinaryOperator::NotEqual,
                        // Comparison operators
                        Rule::op_less => BinaryOperator::Less,
                        Rule::op_less_equal => BinaryOperator::LessEqual,
                        Rule::op_greater => BinaryOperator::Greater,
                        Rule::op_greater_equal => BinaryOperator::GreaterEqual,
                        // Arithmetic operators
                        Rule::op_add => BinaryOperator::Add,
                        Rule::op_subtract => BinaryOperator::Subtract,
                        Rule::op_multiply => BinaryOperator::Multiply,
                        Rule::op_divide => BinaryOperator::Divide,
                        Rule::op_modulo => BinaryOperator::Modulo,
                        rule => {
                            return Err(ParseError::unexpected_rule(
                                "",
                                Self::source_span(&Self::span_from_pair(&op)),
                                "binary operator",
                                rule,
                            ))
                        }
                    };

                    let span = Self::span_between(&left.span, &right.span);
                    Ok(Expression::new(
                        ExpressionKind::Binary(BinaryOperation {
                            left: Box::new(left),
                            operator,
                            right: Box::new(right),
                            span,
                        }),
                        span,
                    ))
                },
            )
            .parse(pairs)
    }

    /// Parse a primary expression followed by calls, member and index accesses
    pub(crate) fn parse_postfix_expr(pair: Pair<Rule>) -> ParseResult<Expression> {
        let mut inner = InnerPairs::new(pair, "postfix expression");
        let mut expression = Self::parse_primary_expr(inner.next_pair()?)?;

        while let Some(postfix) = inner.next() {
            let postfix_span = Self::span_from_pair(&postfix);
            let span = Self::span_between(&expression.span, &postfix_span);

            let kind = match postfix.as_rule() {
                Rule::call_arguments => {
                    let arguments = postfix
                        .into_inner()
                        .map(Self::parse_expression_from_pair)
                        .collect::<ParseResult<Vec<_>>>()?;
                    ExpressionKind::Call(CallExpression {
                        callee: Box::new(expression),
                        arguments,
                        span,
                    })
                }
                Rule::member_access => {
                    let mut member_inner = InnerPairs::new(postfix, "member access");
                    let property = Self::parse_identifier(member_inner.expect(Rule::identifier)?);
                    ExpressionKind::Member(MemberAccess {
                        object: Box::new(expression),
                        property,
                        span,
                    })
                }
                Rule::index_access => {
                    let mut index_inner = InnerPairs::new(postfix, "index access");
                    let index_pair = index_inner.next_pair()?;
                    match index_pair.as_rule() {
                        Rule::slice_bounds => {
                            let (start, end) = Self::parse_slice_bounds(index_pair)?;
                            ExpressionKind::Slice(SliceAccess {
                                object: Box::new(expression),
                                start,
                                end,
                                span,
                            })
                        }
                        Rule::expression => ExpressionKind::Index(IndexAccess {
                            object: Box::new(expression),
                            index: Box::new(Self::parse_expression_from_pair(index_pair)?),
                            span,
                        }),
                        _ => return Err(index_inner.unexpected(&index_pair)),
                    }
                }
                _ => return Err(inner.unexpected(&postfix)),
            };

            expression = Expression::new(kind, span);
        }

        Ok(expression)
    }

    /// `[start:end]` bounds, either of which may be missing
    fn parse_slice_bounds(
        pair: Pair<Rule>,
    ) -> ParseResult<(Option<Box<Expression>>, Option<Box<Expression>>)> {
        let mut start = None;
        let mut end = None;

        let mut inner = InnerPairs::new(pair, "slice");
        while let Some(bound) = inner.next() {
            let rule = bound.as_rule();
            let mut bound_inner = InnerPairs::new(bound, "slice bound");
            let expression = Box::new(Self::parse_expression_from_pair(
                bound_inner.expect(Rule::expression)?,
            )?);
            match rule {
                Rule::slice_start => start = Some(expression),
                Rule::slice_end => end = Some(expression),
                _ => {
                    return Err(ParseError::unexpected_rule(
                        "",
                        Self::source_span(&bound_inner.span()),
                        "slice",
                        rule,
                    ))
                }
            }
        }

        Ok((start, end))
    }

    /// Parse the primary expression of a postfix chain
    pub(crate) fn parse_primary_expr(pair: Pair<Rule>) -> ParseResult<Expression> {
        let span = Self::span_from_pair(&pair);

        let kind = match pair.as_rule() {
            Rule::number => ExpressionKind::Number(Self::parse_number(pair)?),
            Rule::string => ExpressionKind::String(Self::parse_string(pair)?),
            Rule::boolean => ExpressionKind::Boolean(pair.as_str() == "true"),
            Rule::nothing => ExpressionKind::Nothing,
            Rule::identifier => ExpressionKind::Identifier(Self::parse_identifier(pair)),
            Rule::array => ExpressionKind::Array(Self::parse_array(pair)?),
            Rule::dictionary => ExpressionKind::Dictionary(Self::parse_dictionary(pair)?),
            Rule::struct_literal => ExpressionKind::StructLiteral(Self::parse_struct_literal(pair)?),
            Rule::function_literal => ExpressionKind::Function(Self::parse_function_literal(pair)?),
            // Parenthesised expression keeps its inner span
            Rule::expression => return Self::parse_expression_from_pair(pair),
            rule => {
                return Err(ParseError::unexpected_rule(
                    "",
                    Self::source_span(&span),
                    "primary expression",
                    rule,
                ))
            }
        };

        Ok(Expression::new(kind, span))
    }
}
