// Kestrel AST Definitions
// Statement and expression trees produced by the parser and walked by the interpreter

use std::fmt;
use std::rc::Rc;

/// Source position information for AST nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    /// 1-based source line of `start`
    pub line: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize) -> Self {
        Self { start, end, line }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Top-level program: an ordered sequence of statements
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
    pub source_file: Option<String>,
    pub span: Span,
}

/// A braced statement sequence
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Span,
}

/// Identifiers keep their span for diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: Span,
}

impl Statement {
    /// Source line used for diagnostics
    pub fn line(&self) -> usize {
        self.span.line
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Var(VarDeclaration),
    Assignment(Assignment),
    Expression(Expression),
    If(IfStatement),
    Loop(LoopStatement),
    For(ForStatement),
    Function(FunctionDeclaration),
    Struct(StructDeclaration),
    Method(MethodDeclaration),
    Try(TryStatement),
    Return(Option<Expression>),
    Break,
    Continue,
    Import(ImportStatement),
}

impl StatementKind {
    /// Stable kind tag, used in diagnostics and AST dumps
    pub fn tag(&self) -> &'static str {
        match self {
            StatementKind::Var(_) => "var",
            StatementKind::Assignment(_) => "assign",
            StatementKind::Expression(_) => "expr",
            StatementKind::If(_) => "if",
            StatementKind::Loop(_) => "loop",
            StatementKind::For(_) => "for",
            StatementKind::Function(_) => "fn",
            StatementKind::Struct(_) => "struct",
            StatementKind::Method(_) => "method",
            StatementKind::Try(_) => "try",
            StatementKind::Return(_) => "return",
            StatementKind::Break => "break",
            StatementKind::Continue => "continue",
            StatementKind::Import(_) => "import",
        }
    }
}

/// `var name = value`
#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclaration {
    pub name: Identifier,
    pub value: Expression,
    pub span: Span,
}

/// `target op value` where target is an identifier, member or index expression
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub target: Expression,
    pub operator: AssignOperator,
    pub value: Expression,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOperator {
    Assign,
    AddAssign,
    SubtractAssign,
    MultiplyAssign,
    DivideAssign,
}

impl AssignOperator {
    /// Binary operator applied by compound assignment
    pub fn binary_operator(&self) -> Option<BinaryOperator> {
        match self {
            AssignOperator::Assign => None,
            AssignOperator::AddAssign => Some(BinaryOperator::Add),
            AssignOperator::SubtractAssign => Some(BinaryOperator::Subtract),
            AssignOperator::MultiplyAssign => Some(BinaryOperator::Multiply),
            AssignOperator::DivideAssign => Some(BinaryOperator::Divide),
        }
    }
}

impl fmt::Display for AssignOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            AssignOperator::Assign => "=",
            AssignOperator::AddAssign => "+=",
            AssignOperator::SubtractAssign => "-=",
            AssignOperator::MultiplyAssign => "*=",
            AssignOperator::DivideAssign => "/=",
        };
        f.write_str(symbol)
    }
}

/// `if` with any number of `elseif` branches and an optional `else`
#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub branches: Vec<ConditionalBranch>,
    pub else_block: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalBranch {
    pub condition: Expression,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopStatement {
    pub body: Block,
    pub span: Span,
}

/// `for item in iterable { }` or `for index, item in iterable { }`
#[derive(Debug, Clone, PartialEq)]
pub struct ForStatement {
    pub index: Option<Identifier>,
    pub item: Identifier,
    pub iterable: Expression,
    pub body: Block,
    pub span: Span,
}

/// `fn name(params) { body }`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    pub name: Identifier,
    pub parameters: Vec<Identifier>,
    pub body: Rc<Block>,
    pub span: Span,
}

/// `struct Name { a, b }`
#[derive(Debug, Clone, PartialEq)]
pub struct StructDeclaration {
    pub name: Identifier,
    pub properties: Vec<Identifier>,
    pub span: Span,
}

/// `Name -> fn method(params) { body }`
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDeclaration {
    pub struct_name: Identifier,
    pub function: FunctionDeclaration,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TryStatement {
    pub body: Block,
    pub catch_block: Option<Block>,
    pub finally_block: Option<Block>,
    pub span: Span,
}

/// `import "path" as alias`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportStatement {
    pub path: String,
    pub alias: Option<Identifier>,
    pub span: Span,
}

impl ImportStatement {
    /// The binding name: the explicit alias, or the last path segment without extension
    pub fn binding_name(&self) -> String {
        if let Some(alias) = &self.alias {
            return alias.name.clone();
        }
        let segment = self.path.rsplit(['/', '\\']).next().unwrap_or(&self.path);
        match segment.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => segment.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub span: Span,
}

impl Expression {
    pub fn new(kind: ExpressionKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn line(&self) -> usize {
        self.span.line
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Number(f64),
    String(String),
    Boolean(bool),
    Nothing,
    Identifier(Identifier),
    Array(Vec<Expression>),
    Dictionary(Vec<DictionaryEntry>),
    StructLiteral(StructLiteral),
    Function(FunctionLiteral),
    Binary(BinaryOperation),
    Unary(UnaryOperation),
    Ternary(TernaryExpression),
    Call(CallExpression),
    Member(MemberAccess),
    Index(IndexAccess),
    Slice(SliceAccess),
}

impl ExpressionKind {
    /// Stable kind tag, used in diagnostics and AST dumps
    pub fn tag(&self) -> &'static str {
        match self {
            ExpressionKind::Number(_) => "number",
            ExpressionKind::String(_) => "string",
            ExpressionKind::Boolean(_) => "bool",
            ExpressionKind::Nothing => "nothing",
            ExpressionKind::Identifier(_) => "ident",
            ExpressionKind::Array(_) => "array",
            ExpressionKind::Dictionary(_) => "dict",
            ExpressionKind::StructLiteral(_) => "struct-literal",
            ExpressionKind::Function(_) => "fn",
            ExpressionKind::Binary(_) => "binary",
            ExpressionKind::Unary(_) => "unary",
            ExpressionKind::Ternary(_) => "ternary",
            ExpressionKind::Call(_) => "call",
            ExpressionKind::Member(_) => "member",
            ExpressionKind::Index(_) => "index",
            ExpressionKind::Slice(_) => "slice",
        }
    }

    /// Whether the expression may appear on the left of an assignment
    pub fn is_assignable(&self) -> bool {
        matches!(
            self,
            ExpressionKind::Identifier(_) | ExpressionKind::Member(_) | ExpressionKind::Index(_)
        )
    }
}

/// Dictionary literal entry; keys are always strings after parsing
#[derive(Debug, Clone, PartialEq)]
pub struct DictionaryEntry {
    pub key: String,
    pub value: Expression,
    pub span: Span,
}

/// `Name{ field: value, ... }`; `target` is an identifier or a member path
#[derive(Debug, Clone, PartialEq)]
pub struct StructLiteral {
    pub target: Box<Expression>,
    pub fields: Vec<StructField>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: Identifier,
    pub value: Expression,
    pub span: Span,
}

/// `fn(params) { body }`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionLiteral {
    pub parameters: Vec<Identifier>,
    pub body: Rc<Block>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOperation {
    pub left: Box<Expression>,
    pub operator: BinaryOperator,
    pub right: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
        }
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryOperation {
    pub operator: UnaryOperator,
    pub operand: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Not,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOperator::Negate => f.write_str("-"),
            UnaryOperator::Not => f.write_str("not"),
        }
    }
}

/// `condition ? then_value : else_value`
#[derive(Debug, Clone, PartialEq)]
pub struct TernaryExpression {
    pub condition: Box<Expression>,
    pub then_value: Box<Expression>,
    pub else_value: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    pub callee: Box<Expression>,
    pub arguments: Vec<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberAccess {
    pub object: Box<Expression>,
    pub property: Identifier,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexAccess {
    pub object: Box<Expression>,
    pub index: Box<Expression>,
    pub span: Span,
}

/// `object[start:end]`; either bound may be omitted
#[derive(Debug, Clone, PartialEq)]
pub struct SliceAccess {
    pub object: Box<Expression>,
    pub start: Option<Box<Expression>>,
    pub end: Option<Box<Expression>>,
    pub span: Span,
}
