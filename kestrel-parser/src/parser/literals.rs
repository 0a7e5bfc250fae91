// Literal parsing module
// Numbers, strings, collections, struct literals and function literals

use std::rc::Rc;

use pest::iterators::Pair;

use crate::ast::*;
use crate::error::*;
use crate::parser::{InnerPairs, KestrelParser, Rule};

impl KestrelParser {
    /// Parse a number literal
    pub(crate) fn parse_number(pair: Pair<Rule>) -> ParseResult<f64> {
        let text = pair.as_str();
        text.parse::<f64>().map_err(|_| {
            ParseError::invalid_number(
                "",
                Self::source_span(&Self::span_from_pair(&pair)),
                text.to_string(),
            )
        })
    }

    /// Parse a double-quoted string literal, resolving escapes
    pub(crate) fn parse_string(pair: Pair<Rule>) -> ParseResult<String> {
        let mut inner = InnerPairs::new(pair, "string");
        let content = inner.expect(Rule::string_content)?;
        let offset = content.as_span().start();
        let raw = content.as_str();

        let mut result = String::with_capacity(raw.len());
        let mut chars = raw.char_indices();

        while let Some((_, ch)) = chars.next() {
            if ch != '\\' {
                result.push(ch);
                continue;
            }

            let Some((position, escaped)) = chars.next() else {
                break;
            };
            match escaped {
                'n' => result.push('\n'),
                't' => result.push('\t'),
                'r' => result.push('\r'),
                '0' => result.push('\0'),
                '\\' => result.push('\\'),
                '"' => result.push('"'),
                other => {
                    let start = offset + position - 1;
                    return Err(ParseError::invalid_string_escape(
                        "",
                        (start, 1 + other.len_utf8()).into(),
                        format!("\\{}", other),
                    ));
                }
            }
        }

        Ok(result)
    }

    /// Parse an array literal
    pub(crate) fn parse_array(pair: Pair<Rule>) -> ParseResult<Vec<Expression>> {
        pair.into_inner()
            .map(Self::parse_expression_from_pair)
            .collect()
    }

    /// Parse a dictionary literal; keys normalise to strings
    pub(crate) fn parse_dictionary(pair: Pair<Rule>) -> ParseResult<Vec<DictionaryEntry>> {
        pair.into_inner()
            .map(|entry_pair| {
                let mut inner = InnerPairs::new(entry_pair, "dictionary entry");
                let key_pair = inner.next_pair()?;

                let key = match key_pair.as_rule() {
                    Rule::string => Self::parse_string(key_pair)?,
                    Rule::number => Self::parse_number(key_pair)?.to_string(),
                    Rule::identifier => key_pair.as_str().to_string(),
                    _ => return Err(inner.unexpected(&key_pair)),
                };
                let value = Self::parse_expression_from_pair(inner.expect(Rule::expression)?)?;

                Ok(DictionaryEntry {
                    key,
                    value,
                    span: inner.span(),
                })
            })
            .collect()
    }

    /// Parse `Path.To.Struct{ field: value, ... }`
    pub(crate) fn parse_struct_literal(pair: Pair<Rule>) -> ParseResult<StructLiteral> {
        let span = Self::span_from_pair(&pair);
        let mut inner = InnerPairs::new(pair, "struct literal");

        let path_pair = inner.expect(Rule::struct_path)?;
        let mut segments = path_pair.into_inner().map(Self::parse_identifier);
        let Some(root) = segments.next() else {
            return Err(ParseError::missing_child(
                "",
                Self::source_span(&span),
                "struct literal",
            ));
        };

        let mut target = Expression::new(ExpressionKind::Identifier(root.clone()), root.span);
        for segment in segments {
            let member_span = Self::span_between(&target.span, &segment.span);
            target = Expression::new(
                ExpressionKind::Member(MemberAccess {
                    object: Box::new(target),
                    property: segment,
                    span: member_span,
                }),
                member_span,
            );
        }

        let fields = inner
            .map(|field_pair| {
                let mut field_inner = InnerPairs::new(field_pair, "struct field");
                let name = Self::parse_identifier(field_inner.expect(Rule::identifier)?);
                let value =
                    Self::parse_expression_from_pair(field_inner.expect(Rule::expression)?)?;
                Ok(StructField {
                    name,
                    value,
                    span: field_inner.span(),
                })
            })
            .collect::<ParseResult<Vec<_>>>()?;

        Ok(StructLiteral {
            target: Box::new(target),
            fields,
            span,
        })
    }

    /// Parse an anonymous `fn(params) { body }`
    pub(crate) fn parse_function_literal(pair: Pair<Rule>) -> ParseResult<FunctionLiteral> {
        let mut inner = InnerPairs::new(pair, "function literal");
        inner.skip_keyword(Rule::kw_fn)?;

        let parameters = Self::parse_parameter_list(inner.expect(Rule::parameter_list)?);
        let body = Self::parse_block(inner.expect(Rule::block)?)?;

        Ok(FunctionLiteral {
            parameters,
            body: Rc::new(body),
            span: inner.span(),
        })
    }
}
