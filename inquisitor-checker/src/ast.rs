use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct SourceSpan {
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl SourceSpan {
    pub fn new(line: usize, column: usize, end_line: usize, end_column: usize) -> Self {
        Self {
            line,
            column,
            end_line,
            end_column,
        }
    }

    pub fn single_point(line: usize, column: usize) -> Self {
        Self::new(line, column, line, column)
    }

    pub fn union(a: &Self, b: &Self) -> Self {
        if a.line == 0 {
            return *b;
        }
        if b.line == 0 {
            return *a;
        }

        let (start_line, start_column) =
            if (a.line < b.line) || (a.line == b.line && a.column <= b.column) {
                (a.line, a.column)
            } else {
                (b.line, b.column)
            };

        let (end_line, end_column) = if (a.end_line > b.end_line)
            || (a.end_line == b.end_line && a.end_column >= b.end_column)
        {
            (a.end_line, a.end_column)
        } else {
            (b.end_line, b.end_column)
        };

        Self::new(start_line, start_column, end_line, end_column)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Module {
    pub statements: Vec<Statement>,
}

impl Module {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }
}

#[derive(Debug, Clone)]
pub enum Statement {
    Function(FunctionStatement),
    Assignment(AssignmentStatement),
    Return(ReturnStatement),
    Conditional(ConditionalStatement),
    Expression(ExpressionStatement),
    Pass(SourceSpan),
    Unsupported(UnsupportedStatement),
}

impl Statement {
    pub fn span(&self) -> SourceSpan {
        match self {
            Statement::Function(function) => function.span,
            Statement::Assignment(assignment) => assignment.span,
            Statement::Return(ret) => ret.span,
            Statement::Conditional(conditional) => conditional.span,
            Statement::Expression(expr) => expr.expression.span,
            Statement::Pass(span) => *span,
            Statement::Unsupported(unsupported) => unsupported.span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FunctionStatement {
    pub name: String,
    pub name_span: SourceSpan,
    /// Span of the `def` header line.
    pub span: SourceSpan,
    pub parameters: Vec<FunctionParameter>,
    pub return_annotation: Option<Expression>,
    pub body: Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    Positional,
    VarPositional,
    VarKeyword,
}

#[derive(Debug, Clone)]
pub struct FunctionParameter {
    pub name: String,
    pub span: SourceSpan,
    pub kind: ParameterKind,
    pub annotation: Option<Expression>,
    pub default_value: Option<Expression>,
}

#[derive(Debug, Clone)]
pub struct AssignmentStatement {
    pub span: SourceSpan,
    pub targets: Vec<Expression>,
    pub annotation: Option<Expression>,
    /// `None` only for a bare annotated declaration such as `x: int`.
    pub value: Option<Expression>,
}

#[derive(Debug, Clone)]
pub struct ReturnStatement {
    pub span: SourceSpan,
    pub expression: Option<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalKind {
    If,
    Elif,
}

#[derive(Debug, Clone)]
pub struct ConditionalStatement {
    pub span: SourceSpan,
    pub kind: ConditionalKind,
    pub condition: Expression,
    pub consequent: Block,
    pub alternative: Option<Block>,
}

impl ConditionalStatement {
    /// True when the alternative is an `elif` continuation rather than a plain `else`.
    pub fn has_elif(&self) -> bool {
        self.alternative
            .as_ref()
            .and_then(|block| block.statements.first())
            .map(|statement| {
                matches!(
                    statement,
                    Statement::Conditional(ConditionalStatement {
                        kind: ConditionalKind::Elif,
                        ..
                    })
                )
            })
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
pub struct ExpressionStatement {
    pub expression: Expression,
}

#[derive(Debug, Clone)]
pub struct UnsupportedStatement {
    pub span: SourceSpan,
    pub construct: String,
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone)]
pub struct Identifier {
    pub name: String,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    Imaginary(f64),
    String(String),
    Bytes(String),
}

#[derive(Debug, Clone, Copy)]
pub enum UnaryOperator {
    Positive,
    Negative,
    Not,
    Invert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    MatrixMultiply,
    Divide,
    FloorDivide,
    Modulo,
    Power,
    BitOr,
    BitAnd,
    BitXor,
    ShiftLeft,
    ShiftRight,
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    In,
    NotIn,
    Is,
    IsNot,
    And,
    Or,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::MatrixMultiply => "@",
            BinaryOperator::Divide => "/",
            BinaryOperator::FloorDivide => "//",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Power => "**",
            BinaryOperator::BitOr => "|",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitXor => "^",
            BinaryOperator::ShiftLeft => "<<",
            BinaryOperator::ShiftRight => ">>",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::In => "in",
            BinaryOperator::NotIn => "not in",
            BinaryOperator::Is => "is",
            BinaryOperator::IsNot => "is not",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Expression {
    pub span: SourceSpan,
    pub kind: ExpressionKind,
}

#[derive(Debug, Clone)]
pub enum ExpressionKind {
    Identifier(Identifier),
    Literal(Literal),
    List(ListLiteral),
    Tuple(ListLiteral),
    Dict(DictLiteral),
    Unary(UnaryExpression),
    Binary(BinaryExpression),
    Call(CallExpression),
    Member(MemberExpression),
    Index(IndexExpression),
    Unsupported(UnsupportedExpression),
}

impl ExpressionKind {
    /// Short human-readable name of the node kind, used in escape messages.
    pub fn describe(&self) -> &'static str {
        match self {
            ExpressionKind::Identifier(_) => "name",
            ExpressionKind::Literal(_) => "literal",
            ExpressionKind::List(_) => "list literal",
            ExpressionKind::Tuple(_) => "tuple",
            ExpressionKind::Dict(_) => "dict literal",
            ExpressionKind::Unary(_) => "unary operation",
            ExpressionKind::Binary(_) => "binary operation",
            ExpressionKind::Call(_) => "call",
            ExpressionKind::Member(_) => "attribute access",
            ExpressionKind::Index(_) => "subscript",
            ExpressionKind::Unsupported(unsupported) => unsupported.construct,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListLiteral {
    pub elements: Vec<Expression>,
}

#[derive(Debug, Clone)]
pub struct DictLiteral {
    pub entries: Vec<DictEntry>,
}

#[derive(Debug, Clone)]
pub struct DictEntry {
    pub key: Expression,
    pub value: Expression,
}

#[derive(Debug, Clone)]
pub struct UnaryExpression {
    pub operator: UnaryOperator,
    pub operand: Box<Expression>,
}

#[derive(Debug, Clone)]
pub struct BinaryExpression {
    pub operator: BinaryOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone)]
pub struct CallExpression {
    pub callee: Box<Expression>,
    pub arguments: Vec<CallArgument>,
}

#[derive(Debug, Clone)]
pub struct CallArgument {
    pub name: Option<String>,
    pub name_span: Option<SourceSpan>,
    pub expression: Expression,
}

#[derive(Debug, Clone)]
pub struct MemberExpression {
    pub object: Box<Expression>,
    pub property: String,
    pub property_span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct IndexExpression {
    pub object: Box<Expression>,
    pub index: Box<Expression>,
}

#[derive(Debug, Clone)]
pub struct UnsupportedExpression {
    pub construct: &'static str,
}
