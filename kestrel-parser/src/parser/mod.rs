// Kestrel parser entry points
// Pest grammar binding, span helpers and program-level parsing

mod expressions;
mod literals;
mod statements;

use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;

use crate::ast::*;
use crate::error::*;

#[derive(Parser)]
#[grammar = "kestrel.pest"]
pub struct KestrelParser;

impl KestrelParser {
    /// Parse a complete program
    pub fn parse_program(input: &str) -> ParseResult<Program> {
        Self::parse_program_with_source(input, None)
    }

    /// Parse a complete program, recording the file it came from
    pub fn parse_program_with_source(
        input: &str,
        source_file: Option<String>,
    ) -> ParseResult<Program> {
        let mut pairs = Self::parse(Rule::program, input)
            .map_err(|error| ParseError::from_pest_error(error, input.to_string()))?;

        let program_pair = pairs
            .next()
            .ok_or_else(|| ParseError::missing_child(input, (0, input.len()).into(), "program"))?;
        let span = Self::span_from_pair(&program_pair);

        let mut statements = Vec::new();
        for pair in program_pair.into_inner() {
            match pair.as_rule() {
                Rule::statement => {
                    statements.push(Self::parse_statement(pair).map_err(|e| e.with_source(input))?)
                }
                Rule::EOI => {}
                rule => {
                    return Err(ParseError::unexpected_rule(
                        input,
                        Self::source_span(&Self::span_from_pair(&pair)),
                        "program",
                        rule,
                    ))
                }
            }
        }

        Ok(Program {
            statements,
            source_file,
            span,
        })
    }

    /// Parse a single expression
    pub fn parse_expression(input: &str) -> ParseResult<Expression> {
        let mut pairs = Self::parse(Rule::single_expression, input)
            .map_err(|error| ParseError::from_pest_error(error, input.to_string()))?;

        let pair = pairs.next().ok_or_else(|| {
            ParseError::missing_child(input, (0, input.len()).into(), "expression")
        })?;
        let mut inner = InnerPairs::new(pair, "expression");
        inner
            .expect(Rule::expression)
            .and_then(Self::parse_expression_from_pair)
            .map_err(|e| e.with_source(input))
    }

    /// Create a span from a pest pair
    pub(crate) fn span_from_pair(pair: &Pair<Rule>) -> Span {
        let pest_span = pair.as_span();
        let (line, _) = pair.line_col();
        Span::new(pest_span.start(), pest_span.end(), line)
    }

    /// Span covering `first` through `last`, on `first`'s line
    pub(crate) fn span_between(first: &Span, last: &Span) -> Span {
        Span::new(first.start, last.end, first.line)
    }

    pub(crate) fn source_span(span: &Span) -> miette::SourceSpan {
        miette::SourceSpan::from(span.start..span.end)
    }
}

/// Inner pairs of a rule, with errors instead of panics when the tree ends early
pub(crate) struct InnerPairs<'i> {
    pairs: Pairs<'i, Rule>,
    span: Span,
    context: &'static str,
}

impl<'i> InnerPairs<'i> {
    pub(crate) fn new(pair: Pair<'i, Rule>, context: &'static str) -> Self {
        let span = KestrelParser::span_from_pair(&pair);
        Self {
            pairs: pair.into_inner(),
            span,
            context,
        }
    }

    pub(crate) fn span(&self) -> Span {
        self.span
    }

    /// Next child, whatever its rule
    pub(crate) fn next_pair(&mut self) -> ParseResult<Pair<'i, Rule>> {
        self.pairs.next().ok_or_else(|| {
            ParseError::missing_child("", KestrelParser::source_span(&self.span), self.context)
        })
    }

    /// Next child, which must match `rule`
    pub(crate) fn expect(&mut self, rule: Rule) -> ParseResult<Pair<'i, Rule>> {
        let pair = self.next_pair()?;
        if pair.as_rule() == rule {
            Ok(pair)
        } else {
            Err(ParseError::unexpected_rule(
                "",
                KestrelParser::source_span(&KestrelParser::span_from_pair(&pair)),
                self.context,
                pair.as_rule(),
            ))
        }
    }

    /// Consume the next child only when it matches `rule`
    pub(crate) fn next_if(&mut self, rule: Rule) -> Option<Pair<'i, Rule>> {
        match self.pairs.peek() {
            Some(pair) if pair.as_rule() == rule => self.pairs.next(),
            _ => None,
        }
    }

    /// Skip a leading keyword pair
    pub(crate) fn skip_keyword(&mut self, keyword: Rule) -> ParseResult<()> {
        self.expect(keyword).map(|_| ())
    }

    pub(crate) fn unexpected(&self, pair: &Pair<'i, Rule>) -> ParseError {
        ParseError::unexpected_rule(
            "",
            KestrelParser::source_span(&KestrelParser::span_from_pair(pair)),
            self.context,
            pair.as_rule(),
        )
    }
}

impl<'i> Iterator for InnerPairs<'i> {
    type Item = Pair<'i, Rule>;

    fn next(&mut self) -> Option<Self::Item> {
        self.pairs.next()
    }
}
