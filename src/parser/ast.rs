//! Abstract syntax tree (spec.md §3 "AST"). Every node carries a
//! `Location` so runtime errors can always point back at source text
//! (spec.md §4.2, §9).

use crate::error::Location;
use crate::scope::ScopedName;

#[derive(Debug, Clone)]
pub struct Program {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone)]
pub enum Statement {
    Assignment(Assignment),
    Expression(Expression),
    FunctionDefinition(FunctionDefinition),
    StructDefinition(StructDefinition),
    AgentDefinition(AgentDefinition),
    ResourceDefinition(ResourceDefinition),
    Conditional(Conditional),
    WhileLoop(WhileLoop),
    ForLoop(ForLoop),
    TryExcept(TryExcept),
    Raise(Raise),
    Return(Return),
    Import(ImportStatement),
    Pass(Location),
    Break(Location),
    Continue(Location),
}

impl Statement {
    pub fn location(&self) -> &Location {
        match self {
            Statement::Assignment(n) => &n.location,
            Statement::Expression(e) => e.location(),
            Statement::FunctionDefinition(n) => &n.location,
            Statement::StructDefinition(n) => &n.location,
            Statement::AgentDefinition(n) => &n.location,
            Statement::ResourceDefinition(n) => &n.location,
            Statement::Conditional(n) => &n.location,
            Statement::WhileLoop(n) => &n.location,
            Statement::ForLoop(n) => &n.location,
            Statement::TryExcept(n) => &n.location,
            Statement::Raise(n) => &n.location,
            Statement::Return(n) => &n.location,
            Statement::Import(n) => &n.location,
            Statement::Pass(l) | Statement::Break(l) | Statement::Continue(l) => l,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Assignment {
    pub target: Expression,
    pub value: Expression,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub enum Expression {
    Literal(LiteralExpression),
    Identifier(Identifier),
    Binary(BinaryExpression),
    Unary(UnaryExpression),
    FString(FStringExpression),
    Call(FunctionCall),
    FieldAccess(FieldAccess),
    Index(IndexExpression),
    List(ListExpression),
    Dict(DictExpression),
}

impl Expression {
    pub fn location(&self) -> &Location {
        match self {
            Expression::Literal(n) => &n.location,
            Expression::Identifier(n) => &n.location,
            Expression::Binary(n) => &n.location,
            Expression::Unary(n) => &n.location,
            Expression::FString(n) => &n.location,
            Expression::Call(n) => &n.location,
            Expression::FieldAccess(n) => &n.location,
            Expression::Index(n) => &n.location,
            Expression::List(n) => &n.location,
            Expression::Dict(n) => &n.location,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
}

#[derive(Debug, Clone)]
pub struct LiteralExpression {
    pub value: Literal,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct Identifier {
    pub scoped_name: ScopedName,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    And,
    Or,
    In,
    /// The `|` pipeline-composition operator (spec.md §4.6): `f | g` calls
    /// `g(f(x))` when applied.
    Pipe,
}

#[derive(Debug, Clone)]
pub struct BinaryExpression {
    pub op: BinaryOp,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone)]
pub struct UnaryExpression {
    pub op: UnaryOp,
    pub operand: Box<Expression>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub enum FStringPart {
    Literal(String),
    Expr(Expression),
}

#[derive(Debug, Clone)]
pub struct FStringExpression {
    pub parts: Vec<FStringPart>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct FunctionCall {
    pub callee: Box<Expression>,
    pub args: Vec<Expression>,
    pub kwargs: Vec<(String, Expression)>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct FieldAccess {
    pub object: Box<Expression>,
    pub field: String,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct IndexExpression {
    pub object: Box<Expression>,
    pub index: Box<Expression>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct ListExpression {
    pub items: Vec<Expression>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct DictExpression {
    pub entries: Vec<(Expression, Expression)>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct Conditional {
    /// `(condition, body)` pairs for `if` followed by any number of `elif`.
    pub branches: Vec<(Expression, Vec<Statement>)>,
    pub else_branch: Option<Vec<Statement>>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct WhileLoop {
    pub condition: Expression,
    pub body: Vec<Statement>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct ForLoop {
    pub variable: String,
    pub iterable: Expression,
    pub body: Vec<Statement>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct ExceptHandler {
    /// `None` is a bare `except:` catching anything catchable.
    pub exception_type: Option<String>,
    pub binding: Option<String>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone)]
pub struct TryExcept {
    pub try_body: Vec<Statement>,
    pub handlers: Vec<ExceptHandler>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct Raise {
    pub exception_type: Option<String>,
    pub message: Option<Expression>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct Return {
    pub value: Option<Expression>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub type_name: Option<String>,
    pub default: Option<Expression>,
}

#[derive(Debug, Clone)]
pub struct FunctionDefinition {
    pub name: String,
    /// Explicit namespace qualifier on the def (`def public:greet(): ...`),
    /// if any. `None` means the default, module-private registration.
    pub namespace: Option<String>,
    pub params: Vec<Param>,
    pub return_type: Option<String>,
    pub body: Vec<Statement>,
    pub decorators: Vec<Expression>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub type_name: String,
    pub default: Option<Expression>,
}

#[derive(Debug, Clone)]
pub struct StructDefinition {
    pub name: String,
    pub fields: Vec<FieldSpec>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct AgentDefinition {
    pub name: String,
    pub fields: Vec<FieldSpec>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct ResourceDefinition {
    pub name: String,
    pub fields: Vec<FieldSpec>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct ImportStatement {
    pub module: String,
    /// `import module as alias`
    pub alias: Option<String>,
    /// `from module import a, b as c` — empty when importing the whole module.
    pub names: Vec<(String, Option<String>)>,
    pub location: Location,
}
