//! Recursive-descent parser producing the AST in `parser::ast`.
//!
//! Shaped after the teacher's token-stream-with-lookahead parsing style
//! (`why-lang`'s `ParseState`/`FromTokens`), but table-driven precedence
//! climbing replaces the teacher's combinator grammar (`combinators.rs`)
//! since DANA's expression grammar is Python-like rather than brace-delimited.

pub mod ast;

use crate::error::{DanaError, DanaException, Location};
use crate::lexer::{Token, TokenKind};
use crate::scope::{Scope, ScopedName};

use ast::*;

pub type ParseResult<T> = Result<T, DanaError>;

pub fn parse(tokens: Vec<Token>, source: &str) -> ParseResult<Program> {
    let mut parser = Parser::new(tokens, source);
    parser.parse_program()
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    source_lines: Vec<&'a str>,
}

impl<'a> Parser<'a> {
    fn new(tokens: Vec<Token>, source: &'a str) -> Self {
        Self { tokens, pos: 0, source_lines: source.lines().collect() }
    }

    fn excerpt(&self, line: usize) -> String {
        self.source_lines.get(line.saturating_sub(1)).map(|s| s.to_string()).unwrap_or_default()
    }

    fn location_at(&self, idx: usize) -> Location {
        let (line, col) = self.tokens.get(idx).map(|t| t.position).unwrap_or((0, 0));
        Location::new(line, col, self.excerpt(line))
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn loc(&self) -> Location {
        self.location_at(self.pos)
    }

    fn kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.kind() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.err(format!("expected {kind}, found {}", self.kind())))
        }
    }

    fn skip_newlines(&mut self) {
        while matches!(self.kind(), TokenKind::Newline) {
            self.advance();
        }
    }

    fn err(&self, message: impl Into<String>) -> DanaError {
        DanaError::Exception(DanaException::syntax(message, self.loc()))
    }

    // ---- top level ----------------------------------------------------

    fn parse_program(&mut self) -> ParseResult<Program> {
        let mut statements = vec![];
        self.skip_newlines();
        while !matches!(self.kind(), TokenKind::Eof) {
            statements.push(self.parse_statement()?);
            self.skip_newlines();
        }
        Ok(Program { statements })
    }

    fn parse_block(&mut self) -> ParseResult<Vec<Statement>> {
        self.eat(&TokenKind::Colon)?;
        self.skip_newlines();
        self.eat(&TokenKind::Indent)?;
        let mut statements = vec![];
        self.skip_newlines();
        while !matches!(self.kind(), TokenKind::Dedent | TokenKind::Eof) {
            statements.push(self.parse_statement()?);
            self.skip_newlines();
        }
        if matches!(self.kind(), TokenKind::Dedent) {
            self.advance();
        }
        Ok(statements)
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        match self.kind().clone() {
            TokenKind::If => self.parse_conditional(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Try => self.parse_try(),
            TokenKind::Def => self.parse_function_def(vec![]),
            TokenKind::At => self.parse_decorated_function(),
            TokenKind::Struct => self.parse_struct_def(),
            TokenKind::Agent => self.parse_agent_def(),
            TokenKind::Resource => self.parse_resource_def(),
            TokenKind::Import | TokenKind::From => self.parse_import(),
            TokenKind::Raise => self.parse_raise(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Pass => {
                let location = self.loc();
                self.advance();
                Ok(Statement::Pass(location))
            }
            TokenKind::Break => {
                let location = self.loc();
                self.advance();
                Ok(Statement::Break(location))
            }
            TokenKind::Continue => {
                let location = self.loc();
                self.advance();
                Ok(Statement::Continue(location))
            }
            _ => self.parse_assignment_or_expression(),
        }
    }

    fn parse_decorated_function(&mut self) -> ParseResult<Statement> {
        let mut decorators = vec![];
        while matches!(self.kind(), TokenKind::At) {
            self.advance();
            decorators.push(self.parse_expression()?);
            self.skip_newlines();
        }
        self.parse_function_def(decorators)
    }

    fn parse_assignment_or_expression(&mut self) -> ParseResult<Statement> {
        let location = self.loc();
        let expr = self.parse_expression()?;
        if matches!(self.kind(), TokenKind::Assign) {
            self.advance();
            let value = self.parse_expression()?;
            Ok(Statement::Assignment(Assignment { target: expr, value, location }))
        } else {
            Ok(Statement::Expression(expr))
        }
    }

    fn parse_conditional(&mut self) -> ParseResult<Statement> {
        let location = self.loc();
        self.advance(); // if
        let mut branches = vec![];
        let cond = self.parse_expression()?;
        let body = self.parse_block()?;
        branches.push((cond, body));

        let mut else_branch = None;
        loop {
            self.skip_newlines();
            match self.kind() {
                TokenKind::Elif => {
                    self.advance();
                    let cond = self.parse_expression()?;
                    let body = self.parse_block()?;
                    branches.push((cond, body));
                }
                TokenKind::Else => {
                    self.advance();
                    else_branch = Some(self.parse_block()?);
                    break;
                }
                _ => break,
            }
        }
        Ok(Statement::Conditional(Conditional { branches, else_branch, location }))
    }

    fn parse_while(&mut self) -> ParseResult<Statement> {
        let location = self.loc();
        self.advance();
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Statement::WhileLoop(WhileLoop { condition, body, location }))
    }

    fn parse_for(&mut self) -> ParseResult<Statement> {
        let location = self.loc();
        self.advance();
        let variable = self.parse_ident_name()?;
        self.eat(&TokenKind::In)?;
        let iterable = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Statement::ForLoop(ForLoop { variable, iterable, body, location }))
    }

    fn parse_try(&mut self) -> ParseResult<Statement> {
        let location = self.loc();
        self.advance();
        let try_body = self.parse_block()?;
        let mut handlers = vec![];
        self.skip_newlines();
        while matches!(self.kind(), TokenKind::Except) {
            self.advance();
            let mut exception_type = None;
            let mut binding = None;
            if !matches!(self.kind(), TokenKind::Colon) {
                exception_type = Some(self.parse_ident_name()?);
                if matches!(self.kind(), TokenKind::As) {
                    self.advance();
                    binding = Some(self.parse_ident_name()?);
                }
            }
            let body = self.parse_block()?;
            handlers.push(ExceptHandler { exception_type, binding, body });
            self.skip_newlines();
        }
        if handlers.is_empty() {
            return Err(self.err("'try' block requires at least one 'except' handler"));
        }
        Ok(Statement::TryExcept(TryExcept { try_body, handlers, location }))
    }

    fn parse_raise(&mut self) -> ParseResult<Statement> {
        let location = self.loc();
        self.advance();
        let mut exception_type = None;
        let mut message = None;
        if !matches!(self.kind(), TokenKind::Newline | TokenKind::Eof) {
            if let TokenKind::Id(name) = self.kind().clone() {
                if matches!(self.peek_kind(1), TokenKind::LParen) {
                    exception_type = Some(name);
                    self.advance();
                    self.advance(); // (
                    if !matches!(self.kind(), TokenKind::RParen) {
                        message = Some(self.parse_expression()?);
                    }
                    self.eat(&TokenKind::RParen)?;
                } else {
                    message = Some(self.parse_expression()?);
                }
            } else {
                message = Some(self.parse_expression()?);
            }
        }
        Ok(Statement::Raise(Raise { exception_type, message, location }))
    }

    fn parse_return(&mut self) -> ParseResult<Statement> {
        let location = self.loc();
        self.advance();
        let value = if matches!(self.kind(), TokenKind::Newline | TokenKind::Eof | TokenKind::Dedent) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        Ok(Statement::Return(Return { value, location }))
    }

    fn parse_fields(&mut self) -> ParseResult<Vec<FieldSpec>> {
        self.eat(&TokenKind::Colon)?;
        self.skip_newlines();
        self.eat(&TokenKind::Indent)?;
        let mut fields = vec![];
        self.skip_newlines();
        while let TokenKind::Id(name) = self.kind().clone() {
            self.advance();
            self.eat(&TokenKind::Colon)?;
            let type_name = self.parse_type_name()?;
            let default = if matches!(self.kind(), TokenKind::Assign) {
                self.advance();
                Some(self.parse_expression()?)
            } else {
                None
            };
            fields.push(FieldSpec { name, type_name, default });
            self.skip_newlines();
        }
        self.eat(&TokenKind::Dedent)?;
        Ok(fields)
    }

    fn parse_struct_def(&mut self) -> ParseResult<Statement> {
        let location = self.loc();
        self.advance();
        let name = self.parse_ident_name()?;
        let fields = self.parse_fields()?;
        Ok(Statement::StructDefinition(StructDefinition { name, fields, location }))
    }

    fn parse_agent_def(&mut self) -> ParseResult<Statement> {
        let location = self.loc();
        self.advance();
        let name = self.parse_ident_name()?;
        let fields = self.parse_fields()?;
        Ok(Statement::AgentDefinition(AgentDefinition { name, fields, location }))
    }

    fn parse_resource_def(&mut self) -> ParseResult<Statement> {
        let location = self.loc();
        self.advance();
        let name = self.parse_ident_name()?;
        let fields = self.parse_fields()?;
        Ok(Statement::ResourceDefinition(ResourceDefinition { name, fields, location }))
    }

    fn parse_function_def(&mut self, decorators: Vec<Expression>) -> ParseResult<Statement> {
        let location = self.loc();
        self.advance(); // def
        let (namespace, name) = self.parse_function_name()?;
        self.eat(&TokenKind::LParen)?;
        let mut params = vec![];
        while !matches!(self.kind(), TokenKind::RParen) {
            let pname = self.parse_ident_name()?;
            let type_name = if matches!(self.kind(), TokenKind::Colon) {
                self.advance();
                Some(self.parse_type_name()?)
            } else {
                None
            };
            let default = if matches!(self.kind(), TokenKind::Assign) {
                self.advance();
                Some(self.parse_expression()?)
            } else {
                None
            };
            params.push(Param { name: pname, type_name, default });
            if matches!(self.kind(), TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.eat(&TokenKind::RParen)?;
        let return_type = if matches!(self.kind(), TokenKind::Arrow) {
            self.advance();
            Some(self.parse_type_name()?)
        } else {
            None
        };
        let body = self.parse_block()?;
        Ok(Statement::FunctionDefinition(FunctionDefinition { name, namespace, params, return_type, body, decorators, location }))
    }

    /// A `def`'s name, with an optional `scope:` qualifier (e.g.
    /// `def public:greet(): ...`) naming which function namespace it
    /// registers into (spec.md §4.9).
    fn parse_function_name(&mut self) -> ParseResult<(Option<String>, String)> {
        match self.kind().clone() {
            TokenKind::ScopedId { scope, name } => {
                self.advance();
                Ok((Some(scope), name))
            }
            TokenKind::Id(name) => {
                self.advance();
                Ok((None, name))
            }
            other => Err(self.err(format!("expected a function name, found {other}"))),
        }
    }

    fn parse_import(&mut self) -> ParseResult<Statement> {
        let location = self.loc();
        if matches!(self.kind(), TokenKind::From) {
            self.advance();
            let module = self.parse_ident_name()?;
            self.eat(&TokenKind::Import)?;
            let mut names = vec![];
            loop {
                let name = self.parse_ident_name()?;
                let alias = if matches!(self.kind(), TokenKind::As) {
                    self.advance();
                    Some(self.parse_ident_name()?)
                } else {
                    None
                };
                names.push((name, alias));
                if matches!(self.kind(), TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
            Ok(Statement::Import(ImportStatement { module, alias: None, names, location }))
        } else {
            self.advance(); // import
            let module = self.parse_ident_name()?;
            let alias = if matches!(self.kind(), TokenKind::As) {
                self.advance();
                Some(self.parse_ident_name()?)
            } else {
                None
            };
            Ok(Statement::Import(ImportStatement { module, alias, names: vec![], location }))
        }
    }

    fn parse_ident_name(&mut self) -> ParseResult<String> {
        match self.kind().clone() {
            TokenKind::Id(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(self.err(format!("expected an identifier, found {other}"))),
        }
    }

    fn parse_type_name(&mut self) -> ParseResult<String> {
        // type names reuse identifier lexing; `list[int]`-style generics are
        // accepted as a single dotted identifier by the lexer already.
        self.parse_ident_name()
    }

    fn peek_kind(&self, ahead: usize) -> TokenKind {
        self.tokens.get(self.pos + ahead).map(|t| t.kind.clone()).unwrap_or(TokenKind::Eof)
    }

    // ---- expressions (precedence climbing) -----------------------------

    fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_and()?;
        while matches!(self.kind(), TokenKind::Or) {
            let location = self.loc();
            self.advance();
            let right = self.parse_and()?;
            left = Expression::Binary(BinaryExpression { op: BinaryOp::Or, left: Box::new(left), right: Box::new(right), location });
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_not()?;
        while matches!(self.kind(), TokenKind::And) {
            let location = self.loc();
            self.advance();
            let right = self.parse_not()?;
            left = Expression::Binary(BinaryExpression { op: BinaryOp::And, left: Box::new(left), right: Box::new(right), location });
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> ParseResult<Expression> {
        if matches!(self.kind(), TokenKind::Not) {
            let location = self.loc();
            self.advance();
            let operand = self.parse_not()?;
            return Ok(Expression::Unary(UnaryExpression { op: UnaryOp::Not, operand: Box::new(operand), location }));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_pipeline()?;
        loop {
            let op = match self.kind() {
                TokenKind::Eq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::LtEq => BinaryOp::LtEq,
                TokenKind::GtEq => BinaryOp::GtEq,
                TokenKind::In => BinaryOp::In,
                _ => break,
            };
            let location = self.loc();
            self.advance();
            let right = self.parse_pipeline()?;
            left = Expression::Binary(BinaryExpression { op, left: Box::new(left), right: Box::new(right), location });
        }
        Ok(left)
    }

    fn parse_pipeline(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_additive()?;
        while matches!(self.kind(), TokenKind::Pipe) {
            let location = self.loc();
            self.advance();
            let right = self.parse_additive()?;
            left = Expression::Binary(BinaryExpression { op: BinaryOp::Pipe, left: Box::new(left), right: Box::new(right), location });
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            let location = self.loc();
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expression::Binary(BinaryExpression { op, left: Box::new(left), right: Box::new(right), location });
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            let location = self.loc();
            self.advance();
            let right = self.parse_unary()?;
            left = Expression::Binary(BinaryExpression { op, left: Box::new(left), right: Box::new(right), location });
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expression> {
        if matches!(self.kind(), TokenKind::Minus) {
            let location = self.loc();
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expression::Unary(UnaryExpression { op: UnaryOp::Neg, operand: Box::new(operand), location }));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> ParseResult<Expression> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.kind() {
                TokenKind::Dot => {
                    let location = self.loc();
                    self.advance();
                    let field = self.parse_ident_name()?;
                    expr = Expression::FieldAccess(FieldAccess { object: Box::new(expr), field, location });
                }
                TokenKind::LParen => {
                    let location = self.loc();
                    self.advance();
                    let (args, kwargs) = self.parse_call_args()?;
                    self.eat(&TokenKind::RParen)?;
                    expr = Expression::Call(FunctionCall { callee: Box::new(expr), args, kwargs, location });
                }
                TokenKind::LBracket => {
                    let location = self.loc();
                    self.advance();
                    let index = self.parse_expression()?;
                    self.eat(&TokenKind::RBracket)?;
                    expr = Expression::Index(IndexExpression { object: Box::new(expr), index: Box::new(index), location });
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> ParseResult<(Vec<Expression>, Vec<(String, Expression)>)> {
        let mut args = vec![];
        let mut kwargs = vec![];
        while !matches!(self.kind(), TokenKind::RParen) {
            if let TokenKind::Id(name) = self.kind().clone() {
                if matches!(self.peek_kind(1), TokenKind::Assign) {
                    self.advance();
                    self.advance();
                    kwargs.push((name, self.parse_expression()?));
                    if matches!(self.kind(), TokenKind::Comma) {
                        self.advance();
                        continue;
                    }
                    break;
                }
            }
            args.push(self.parse_expression()?);
            if matches!(self.kind(), TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        Ok((args, kwargs))
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        let location = self.loc();
        match self.kind().clone() {
            TokenKind::Int(v) => {
                self.advance();
                Ok(Expression::Literal(LiteralExpression { value: Literal::Int(v), location }))
            }
            TokenKind::Float(v) => {
                self.advance();
                Ok(Expression::Literal(LiteralExpression { value: Literal::Float(v), location }))
            }
            TokenKind::Str(v) => {
                self.advance();
                Ok(Expression::Literal(LiteralExpression { value: Literal::Str(v), location }))
            }
            TokenKind::FString(raw) => {
                self.advance();
                Ok(Expression::FString(parse_fstring(&raw, location)?))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::Literal(LiteralExpression { value: Literal::Bool(true), location }))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::Literal(LiteralExpression { value: Literal::Bool(false), location }))
            }
            TokenKind::None => {
                self.advance();
                Ok(Expression::Literal(LiteralExpression { value: Literal::None, location }))
            }
            TokenKind::Id(name) => {
                self.advance();
                Ok(Expression::Identifier(Identifier { scoped_name: ScopedName::implicit(name), location }))
            }
            TokenKind::ScopedId { scope, name } => {
                self.advance();
                let scope = Scope::parse(&scope).ok_or_else(|| self.err(format!("unknown scope '{scope}'")))?;
                Ok(Expression::Identifier(Identifier { scoped_name: ScopedName::explicit(scope, name), location }))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.eat(&TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::LBracket => {
                self.advance();
                let mut items = vec![];
                while !matches!(self.kind(), TokenKind::RBracket) {
                    items.push(self.parse_expression()?);
                    if matches!(self.kind(), TokenKind::Comma) {
                        self.advance();
                    } else {
                        break;
                    }
                }
                self.eat(&TokenKind::RBracket)?;
                Ok(Expression::List(ListExpression { items, location }))
            }
            TokenKind::LBrace => {
                self.advance();
                let mut entries = vec![];
                while !matches!(self.kind(), TokenKind::RBrace) {
                    let key = self.parse_expression()?;
                    self.eat(&TokenKind::Colon)?;
                    let value = self.parse_expression()?;
                    entries.push((key, value));
                    if matches!(self.kind(), TokenKind::Comma) {
                        self.advance();
                    } else {
                        break;
                    }
                }
                self.eat(&TokenKind::RBrace)?;
                Ok(Expression::Dict(DictExpression { entries, location }))
            }
            other => Err(self.err(format!("unexpected {other} in expression position"))),
        }
    }
}

/// Splits an f-string's raw text into literal/expression parts, re-lexing
/// each `{...}` span as a standalone expression (spec.md §4.1). Brace
/// balance was already validated by the lexer.
fn parse_fstring(raw: &str, location: Location) -> ParseResult<FStringExpression> {
    let mut parts = vec![];
    let mut literal = String::new();
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                if !literal.is_empty() {
                    parts.push(FStringPart::Literal(std::mem::take(&mut literal)));
                }
                let mut expr_src = String::new();
                let mut depth = 1;
                for c in chars.by_ref() {
                    if c == '{' {
                        depth += 1;
                    } else if c == '}' {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    expr_src.push(c);
                }
                let inner_tokens = crate::lexer::Lexer::new(&format!("{expr_src}\n"))
                    .lex()
                    .map_err(|e| DanaError::Exception(DanaException::syntax(e.message, location.clone())))?;
                let mut inner_parser = Parser::new(inner_tokens, &expr_src);
                parts.push(FStringPart::Expr(inner_parser.parse_expression()?));
            }
            other => literal.push(other),
        }
    }
    if !literal.is_empty() {
        parts.push(FStringPart::Literal(literal));
    }
    Ok(FStringExpression { parts, location })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse_src(src: &str) -> Program {
        let tokens = Lexer::new(src).lex().unwrap();
        parse(tokens, src).unwrap()
    }

    #[test]
    fn parses_simple_assignment() {
        let program = parse_src("x = 1 + 2\n");
        assert_eq!(program.statements.len(), 1);
        assert!(matches!(program.statements[0], Statement::Assignment(_)));
    }

    #[test]
    fn parses_if_elif_else() {
        let program = parse_src("if x:\n    y = 1\nelif z:\n    y = 2\nelse:\n    y = 3\n");
        let Statement::Conditional(cond) = &program.statements[0] else { panic!("expected conditional") };
        assert_eq!(cond.branches.len(), 2);
        assert!(cond.else_branch.is_some());
    }

    #[test]
    fn parses_function_definition_with_return_type() {
        let program = parse_src("def add(a: int, b: int) -> int:\n    return a + b\n");
        let Statement::FunctionDefinition(def) = &program.statements[0] else { panic!("expected fn def") };
        assert_eq!(def.name, "add");
        assert_eq!(def.params.len(), 2);
        assert_eq!(def.return_type.as_deref(), Some("int"));
    }

    #[test]
    fn parses_struct_definition() {
        let program = parse_src("struct Point:\n    x: int\n    y: int = 0\n");
        let Statement::StructDefinition(def) = &program.statements[0] else { panic!("expected struct def") };
        assert_eq!(def.fields.len(), 2);
    }

    #[test]
    fn parses_try_except() {
        let program = parse_src("try:\n    x = 1\nexcept ZeroDivisionError as e:\n    y = 2\n");
        assert!(matches!(program.statements[0], Statement::TryExcept(_)));
    }

    #[test]
    fn parses_fstring_with_embedded_expression() {
        let program = parse_src("x = f\"hello {name}\"\n");
        let Statement::Assignment(assign) = &program.statements[0] else { panic!() };
        assert!(matches!(assign.value, Expression::FString(_)));
    }
}
