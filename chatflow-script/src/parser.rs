use std::collections::HashSet;

use serde_json::Value as Json;

use crate::ast::{BinaryOp, Expr, ExprKind, FnDef, Import, Item, Program, Stmt, StmtKind, UnaryOp};
use crate::error::ParseError;
use crate::lexer::{tokenize, Token, TokenKind};

/// Deepest nesting of blocks, brackets and prefix operators the parser accepts.
pub const MAX_NESTING: usize = 64;

/// Parse step-script source into a [`Program`].
pub fn parse(source: &str) -> Result<Program, ParseError> {
    let tokens = tokenize(source)?;
    Parser {
        tokens,
        pos: 0,
        depth: 0,
    }
    .program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // The token stream always ends with `Eof`, and `advance` never moves past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error_here("expression nested too deeply"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        let token = self.peek();
        ParseError::new(token.line, token.column, message)
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> Result<Token, ParseError> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(format!(
                "expected {} {context}, found {}",
                kind.describe(),
                self.peek_kind().describe()
            )))
        }
    }

    fn ident(&mut self, context: &str) -> Result<String, ParseError> {
        match self.peek_kind().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(self.error_here(format!(
                "expected identifier {context}, found {}",
                other.describe()
            ))),
        }
    }

    fn program(mut self) -> Result<Program, ParseError> {
        let mut items = Vec::new();
        while !self.check(&TokenKind::Eof) {
            items.push(self.item()?);
        }
        Ok(Program { items })
    }

    fn item(&mut self) -> Result<Item, ParseError> {
        let line = self.peek().line;
        match self.peek_kind() {
            TokenKind::Fn => self.fn_def().map(Item::Fn),
            TokenKind::Let => {
                self.advance();
                let name = self.ident("after 'let'")?;
                self.expect(TokenKind::Assign, "in let binding")?;
                let value = self.expr()?;
                self.expect(TokenKind::Semicolon, "after let binding")?;
                Ok(Item::Let { name, value, line })
            }
            TokenKind::Import | TokenKind::From => self.import().map(Item::Import),
            other => Err(self.error_here(format!(
                "expected 'fn', 'let' or an import at top level, found {}",
                other.describe()
            ))),
        }
    }

    fn fn_def(&mut self) -> Result<FnDef, ParseError> {
        let line = self.expect(TokenKind::Fn, "")?.line;
        let name = self.ident("after 'fn'")?;
        self.expect(TokenKind::LParen, "after function name")?;
        let mut params = Vec::new();
        let mut seen = HashSet::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let param = self.ident("in parameter list")?;
                if !seen.insert(param.clone()) {
                    return Err(self.error_here(format!("duplicate parameter '{param}'")));
                }
                params.push(param);
                if !self.eat(&TokenKind::Comma) || self.check(&TokenKind::RParen) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "to close parameter list")?;
        let body = self.block()?;
        Ok(FnDef {
            name,
            params,
            body,
            line,
        })
    }

    fn import(&mut self) -> Result<Import, ParseError> {
        let token = self.advance();
        let line = token.line;
        match token.kind {
            TokenKind::Import => {
                let path = self.dotted_path()?;
                self.expect(TokenKind::Semicolon, "after import")?;
                Ok(Import::Module { path, line })
            }
            _ => {
                let path = self.dotted_path()?;
                self.expect(TokenKind::Import, "in 'from ... import'")?;
                let mut names = vec![self.ident("after 'import'")?];
                while self.eat(&TokenKind::Comma) {
                    names.push(self.ident("in import list")?);
                }
                self.expect(TokenKind::Semicolon, "after import")?;
                Ok(Import::From { path, names, line })
            }
        }
    }

    fn dotted_path(&mut self) -> Result<Vec<String>, ParseError> {
        let mut path = vec![self.ident("as module name")?];
        while self.eat(&TokenKind::Dot) {
            path.push(self.ident("in module path")?);
        }
        Ok(path)
    }

    fn block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.nested(Self::block_body)
    }

    fn block_body(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(TokenKind::LBrace, "to open block")?;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            if self.check(&TokenKind::Eof) {
                return Err(self.error_here("unclosed block, expected '}'"));
            }
            stmts.push(self.stmt()?);
        }
        self.expect(TokenKind::RBrace, "to close block")?;
        Ok(stmts)
    }

    fn stmt(&mut self) -> Result<Stmt, ParseError> {
        let line = self.peek().line;
        let kind = match self.peek_kind() {
            TokenKind::Let => {
                self.advance();
                let name = self.ident("after 'let'")?;
                self.expect(TokenKind::Assign, "in let binding")?;
                let value = self.expr()?;
                self.expect(TokenKind::Semicolon, "after let binding")?;
                StmtKind::Let { name, value }
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.check(&TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.expr()?)
                };
                self.expect(TokenKind::Semicolon, "after return")?;
                StmtKind::Return(value)
            }
            TokenKind::If => return self.if_stmt(),
            TokenKind::For => {
                self.advance();
                let var = self.ident("after 'for'")?;
                self.expect(TokenKind::In, "in for loop")?;
                let iter = self.expr()?;
                let body = self.block()?;
                StmtKind::For { var, iter, body }
            }
            TokenKind::Break => {
                self.advance();
                self.expect(TokenKind::Semicolon, "after break")?;
                StmtKind::Break
            }
            TokenKind::Continue => {
                self.advance();
                self.expect(TokenKind::Semicolon, "after continue")?;
                StmtKind::Continue
            }
            TokenKind::Import | TokenKind::From => StmtKind::Import(self.import()?),
            TokenKind::Fn => {
                return Err(self.error_here("functions may only be defined at top level"))
            }
            _ => {
                let expr = self.expr()?;
                if self.eat(&TokenKind::Assign) {
                    if !matches!(
                        expr.kind,
                        ExprKind::Ident(_) | ExprKind::Index { .. } | ExprKind::Attr { .. }
                    ) {
                        return Err(ParseError::new(line, 0, "invalid assignment target"));
                    }
                    let value = self.expr()?;
                    self.expect(TokenKind::Semicolon, "after assignment")?;
                    StmtKind::Assign {
                        target: expr,
                        value,
                    }
                } else {
                    self.expect(TokenKind::Semicolon, "after expression")?;
                    StmtKind::Expr(expr)
                }
            }
        };
        Ok(Stmt { kind, line })
    }

    fn if_stmt(&mut self) -> Result<Stmt, ParseError> {
        let line = self.expect(TokenKind::If, "")?.line;
        let cond = self.expr()?;
        let then_body = self.block()?;
        let else_body = if self.eat(&TokenKind::Else) {
            if self.check(&TokenKind::If) {
                vec![self.if_stmt()?]
            } else {
                self.block()?
            }
        } else {
            Vec::new()
        };
        Ok(Stmt {
            kind: StmtKind::If {
                cond,
                then_body,
                else_body,
            },
            line,
        })
    }

    fn expr(&mut self) -> Result<Expr, ParseError> {
        self.nested(Self::or_expr)
    }

    fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
        let line = left.line;
        Expr {
            kind: ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            line,
        }
    }

    fn or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.and_expr()?;
        while self.eat(&TokenKind::Or) || self.eat(&TokenKind::OrOr) {
            let right = self.and_expr()?;
            left = Self::binary(left, BinaryOp::Or, right);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.not_expr()?;
        while self.eat(&TokenKind::And) || self.eat(&TokenKind::AndAnd) {
            let right = self.not_expr()?;
            left = Self::binary(left, BinaryOp::And, right);
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expr, ParseError> {
        let line = self.peek().line;
        if self.eat(&TokenKind::Not) || self.eat(&TokenKind::Bang) {
            let operand = self.nested(Self::not_expr)?;
            return Ok(Expr {
                kind: ExprKind::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
                line,
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.additive()?;
        let op = match self.peek_kind() {
            TokenKind::EqEq => BinaryOp::Eq,
            TokenKind::NotEq => BinaryOp::NotEq,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Le => BinaryOp::Le,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::Ge => BinaryOp::Ge,
            TokenKind::In => BinaryOp::In,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.additive()?;
        Ok(Self::binary(left, op, right))
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.multiplicative()?;
            left = Self::binary(left, op, right);
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Rem,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.unary()?;
            left = Self::binary(left, op, right);
        }
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let line = self.peek().line;
        if self.eat(&TokenKind::Minus) {
            let operand = self.nested(Self::unary)?;
            return Ok(Expr {
                kind: ExprKind::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                },
                line,
            });
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        loop {
            let line = self.peek().line;
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.advance();
                    let name = self.ident("after '.'")?;
                    let kind = if self.eat(&TokenKind::LParen) {
                        let args = self.args()?;
                        ExprKind::MethodCall {
                            object: Box::new(expr),
                            name,
                            args,
                        }
                    } else {
                        ExprKind::Attr {
                            object: Box::new(expr),
                            name,
                        }
                    };
                    expr = Expr { kind, line };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.expr()?;
                    self.expect(TokenKind::RBracket, "to close index")?;
                    expr = Expr {
                        kind: ExprKind::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                        line,
                    };
                }
                TokenKind::LParen => {
                    self.advance();
                    let args = self.args()?;
                    expr = Expr {
                        kind: ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        line,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Arguments after an opening `(` up to and including the closing `)`.
    fn args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        while !self.check(&TokenKind::RParen) {
            args.push(self.expr()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, "to close argument list")?;
        Ok(args)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.advance();
        let line = token.line;
        let kind = match token.kind {
            TokenKind::Int(value) => ExprKind::Literal(Json::from(value)),
            TokenKind::Float(value) => ExprKind::Literal(
                serde_json::Number::from_f64(value)
                    .map(Json::Number)
                    .ok_or_else(|| ParseError::new(line, token.column, "invalid number"))?,
            ),
            TokenKind::Str(value) => ExprKind::Literal(Json::String(value)),
            TokenKind::True => ExprKind::Literal(Json::Bool(true)),
            TokenKind::False => ExprKind::Literal(Json::Bool(false)),
            TokenKind::Null => ExprKind::Literal(Json::Null),
            TokenKind::Ident(name) => ExprKind::Ident(name),
            TokenKind::LParen => {
                let first = self.expr()?;
                if !self.eat(&TokenKind::Comma) {
                    self.expect(TokenKind::RParen, "to close parenthesis")?;
                    return Ok(first);
                }
                // A comma makes it a tuple, which evaluates to a list.
                let mut elements = vec![first];
                while !self.check(&TokenKind::RParen) {
                    elements.push(self.expr()?);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RParen, "to close tuple")?;
                ExprKind::List(elements)
            }
            TokenKind::LBracket => {
                let mut elements = Vec::new();
                while !self.check(&TokenKind::RBracket) {
                    elements.push(self.expr()?);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RBracket, "to close list")?;
                ExprKind::List(elements)
            }
            TokenKind::LBrace => {
                let mut entries = Vec::new();
                while !self.check(&TokenKind::RBrace) {
                    let key = match self.advance().kind {
                        TokenKind::Str(key) | TokenKind::Ident(key) => key,
                        other => {
                            return Err(self.error_here(format!(
                                "expected map key, found {}",
                                other.describe()
                            )))
                        }
                    };
                    self.expect(TokenKind::Colon, "after map key")?;
                    entries.push((key, self.expr()?));
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RBrace, "to close map")?;
                ExprKind::Map(entries)
            }
            other => {
                return Err(ParseError::new(
                    line,
                    token.column,
                    format!("expected expression, found {}", other.describe()),
                ))
            }
        };
        Ok(Expr { kind, line })
    }
}
