// Statement parsing module
// Declarations, control flow, imports and assignments

use std::rc::Rc;

use pest::iterators::Pair;

use crate::ast::*;
use crate::error::*;
use crate::parser::{InnerPairs, KestrelParser, Rule};

impl KestrelParser {
    /// Parse a statement wrapper and dispatch on its single child
    pub(crate) fn parse_statement(pair: Pair<Rule>) -> ParseResult<Statement> {
        let span = Self::span_from_pair(&pair);
        let mut inner = InnerPairs::new(pair, "statement");
        let statement_pair = inner.next_pair()?;

        let kind = match statement_pair.as_rule() {
            Rule::var_declaration => StatementKind::Var(Self::parse_var_declaration(statement_pair)?),
            Rule::function_declaration => {
                StatementKind::Function(Self::parse_function_declaration(statement_pair)?)
            }
            Rule::struct_declaration => {
                StatementKind::Struct(Self::parse_struct_declaration(statement_pair)?)
            }
            Rule::method_declaration => {
                StatementKind::Method(Self::parse_method_declaration(statement_pair)?)
            }
            Rule::if_statement => StatementKind::If(Self::parse_if_statement(statement_pair)?),
            Rule::loop_statement => {
                let mut loop_inner = InnerPairs::new(statement_pair, "loop");
                loop_inner.skip_keyword(Rule::kw_loop)?;
                let body = Self::parse_block(loop_inner.expect(Rule::block)?)?;
                StatementKind::Loop(LoopStatement {
                    body,
                    span: loop_inner.span(),
                })
            }
            Rule::for_statement => StatementKind::For(Self::parse_for_statement(statement_pair)?),
            Rule::try_statement => StatementKind::Try(Self::parse_try_statement(statement_pair)?),
            Rule::return_statement => {
                let mut return_inner = InnerPairs::new(statement_pair, "return");
                return_inner.skip_keyword(Rule::kw_return)?;
                let value = match return_inner.next_if(Rule::expression) {
                    Some(expression_pair) => Some(Self::parse_expression_from_pair(expression_pair)?),
                    None => None,
                };
                StatementKind::Return(value)
            }
            Rule::break_statement => StatementKind::Break,
            Rule::continue_statement => StatementKind::Continue,
            Rule::import_statement => {
                StatementKind::Import(Self::parse_import_statement(statement_pair)?)
            }
            Rule::assignment => StatementKind::Assignment(Self::parse_assignment(statement_pair)?),
            Rule::expression_statement => {
                let mut expression_inner = InnerPairs::new(statement_pair, "expression statement");
                let expression = expression_inner.expect(Rule::expression)?;
                StatementKind::Expression(Self::parse_expression_from_pair(expression)?)
            }
            _ => return Err(inner.unexpected(&statement_pair)),
        };

        Ok(Statement { kind, span })
    }

    /// Parse a braced block
    pub(crate) fn parse_block(pair: Pair<Rule>) -> ParseResult<Block> {
        let span = Self::span_from_pair(&pair);
        let statements = pair
            .into_inner()
            .map(Self::parse_statement)
            .collect::<ParseResult<Vec<_>>>()?;

        Ok(Block { statements, span })
    }

    /// Parse an identifier pair
    pub(crate) fn parse_identifier(pair: Pair<Rule>) -> Identifier {
        Identifier {
            name: pair.as_str().to_string(),
            span: Self::span_from_pair(&pair),
        }
    }

    /// Parse a parenthesised parameter list
    pub(crate) fn parse_parameter_list(pair: Pair<Rule>) -> Vec<Identifier> {
        pair.into_inner().map(Self::parse_identifier).collect()
    }

    fn parse_var_declaration(pair: Pair<Rule>) -> ParseResult<VarDeclaration> {
        let mut inner = InnerPairs::new(pair, "variable declaration");

        // First pair should be the "var" keyword, skip it
        inner.skip_keyword(Rule::kw_var)?;

        let name = Self::parse_identifier(inner.expect(Rule::identifier)?);
        let value = Self::parse_expression_from_pair(inner.expect(Rule::expression)?)?;

        Ok(VarDeclaration {
            name,
            value,
            span: inner.span(),
        })
    }

    pub(crate) fn parse_function_declaration(
        pair: Pair<Rule>,
    ) -> ParseResult<FunctionDeclaration> {
        let mut inner = InnerPairs::new(pair, "function declaration");
        inner.skip_keyword(Rule::kw_fn)?;

        let name = Self::parse_identifier(inner.expect(Rule::identifier)?);
        let parameters = Self::parse_parameter_list(inner.expect(Rule::parameter_list)?);
        let body = Self::parse_block(inner.expect(Rule::block)?)?;

        Ok(FunctionDeclaration {
            name,
            parameters,
            body: Rc::new(body),
            span: inner.span(),
        })
    }

    fn parse_struct_declaration(pair: Pair<Rule>) -> ParseResult<StructDeclaration> {
        let mut inner = InnerPairs::new(pair, "struct declaration");
        inner.skip_keyword(Rule::kw_struct)?;

        let name = Self::parse_identifier(inner.expect(Rule::identifier)?);
        let span = inner.span();
        let properties = inner.map(Self::parse_identifier).collect();

        Ok(StructDeclaration {
            name,
            properties,
            span,
        })
    }

    fn parse_method_declaration(pair: Pair<Rule>) -> ParseResult<MethodDeclaration> {
        let mut inner = InnerPairs::new(pair, "method declaration");

        let struct_name = Self::parse_identifier(inner.expect(Rule::identifier)?);
        let function = Self::parse_function_declaration(inner.expect(Rule::function_declaration)?)?;

        Ok(MethodDeclaration {
            struct_name,
            function,
            span: inner.span(),
        })
    }

    fn parse_if_statement(pair: Pair<Rule>) -> ParseResult<IfStatement> {
        let span = Self::span_from_pair(&pair);
        let mut inner = InnerPairs::new(pair, "if statement");

        // First pair should be the "if" keyword, skip it
        inner.skip_keyword(Rule::kw_if)?;

        let condition = Self::parse_expression_from_pair(inner.expect(Rule::expression)?)?;
        let body = Self::parse_block(inner.expect(Rule::block)?)?;
        let mut branches = vec![ConditionalBranch {
            span: Self::span_between(&condition.span, &body.span),
            condition,
            body,
        }];
        let mut else_block = None;

        while let Some(clause) = inner.next() {
            match clause.as_rule() {
                Rule::elseif_clause => branches.push(Self::parse_elseif_clause(clause)?),
                Rule::else_clause => {
                    let mut else_inner = InnerPairs::new(clause, "else clause");
                    else_inner.skip_keyword(Rule::kw_else)?;
                    else_block = Some(Self::parse_block(else_inner.expect(Rule::block)?)?);
                }
                _ => return Err(inner.unexpected(&clause)),
            }
        }

        Ok(IfStatement {
            branches,
            else_block,
            span,
        })
    }

    /// `elseif cond { }` or `else if cond { }`
    fn parse_elseif_clause(pair: Pair<Rule>) -> ParseResult<ConditionalBranch> {
        let mut inner = InnerPairs::new(pair, "elseif clause");

        if inner.next_if(Rule::kw_elseif).is_none() {
            inner.skip_keyword(Rule::kw_else)?;
            inner.skip_keyword(Rule::kw_if)?;
        }

        let condition = Self::parse_expression_from_pair(inner.expect(Rule::expression)?)?;
        let body = Self::parse_block(inner.expect(Rule::block)?)?;

        Ok(ConditionalBranch {
            condition,
            body,
            span: inner.span(),
        })
    }

    fn parse_for_statement(pair: Pair<Rule>) -> ParseResult<ForStatement> {
        let mut inner = InnerPairs::new(pair, "for loop");
        inner.skip_keyword(Rule::kw_for)?;

        let first = Self::parse_identifier(inner.expect(Rule::identifier)?);
        let (index, item) = match inner.next_if(Rule::identifier) {
            Some(second) => (Some(first), Self::parse_identifier(second)),
            None => (None, first),
        };

        inner.skip_keyword(Rule::kw_in)?;
        let iterable = Self::parse_expression_from_pair(inner.expect(Rule::expression)?)?;
        let body = Self::parse_block(inner.expect(Rule::block)?)?;

        Ok(ForStatement {
            index,
            item,
            iterable,
            body,
            span: inner.span(),
        })
    }

    fn parse_try_statement(pair: Pair<Rule>) -> ParseResult<TryStatement> {
        let mut inner = InnerPairs::new(pair, "try statement");
        inner.skip_keyword(Rule::kw_try)?;

        let body = Self::parse_block(inner.expect(Rule::block)?)?;
        let catch_block = match inner.next_if(Rule::catch_clause) {
            Some(clause) => Some(Self::parse_clause_block(clause, Rule::kw_catch)?),
            None => None,
        };
        let finally_block = match inner.next_if(Rule::finally_clause) {
            Some(clause) => Some(Self::parse_clause_block(clause, Rule::kw_finally)?),
            None => None,
        };

        Ok(TryStatement {
            body,
            catch_block,
            finally_block,
            span: inner.span(),
        })
    }

    /// A `keyword { ... }` clause
    fn parse_clause_block(pair: Pair<Rule>, keyword: Rule) -> ParseResult<Block> {
        let mut inner = InnerPairs::new(pair, "clause");
        inner.skip_keyword(keyword)?;
        Self::parse_block(inner.expect(Rule::block)?)
    }

    fn parse_import_statement(pair: Pair<Rule>) -> ParseResult<ImportStatement> {
        let mut inner = InnerPairs::new(pair, "import");
        inner.skip_keyword(Rule::kw_import)?;

        let path = Self::parse_string(inner.expect(Rule::string)?)?;
        let alias = match inner.next_if(Rule::kw_as) {
            Some(_) => Some(Self::parse_identifier(inner.expect(Rule::identifier)?)),
            None => None,
        };

        Ok(ImportStatement {
            path,
            alias,
            span: inner.span(),
        })
    }

    fn parse_assignment(pair: Pair<Rule>) -> ParseResult<Assignment> {
        let mut inner = InnerPairs::new(pair, "assignment");

        let target = Self::parse_postfix_expr(inner.expect(Rule::postfix_expr)?)?;
        if !target.kind.is_assignable() {
            return Err(ParseError::invalid_assignment_target(
                "",
                Self::source_span(&target.span),
            ));
        }

        let operator_pair = inner.next_pair()?;
        let operator = match operator_pair.as_rule() {
            Rule::op_assign => AssignOperator::Assign,
            Rule::op_assign_add => AssignOperator::AddAssign,
            Rule::op_assign_subtract => AssignOperator::SubtractAssign,
            Rule::op_assign_multiply => AssignOperator::MultiplyAssign,
            Rule::op_assign_divide => AssignOperator::DivideAssign,
            _ => return Err(inner.unexpected(&operator_pair)),
        };

        let value = Self::parse_expression_from_pair(inner.expect(Rule::expression)?)?;

        Ok(Assignment {
            target,
            operator,
            value,
            span: inner.span(),
        })
    }
}
