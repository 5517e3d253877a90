//! Surface syntax to [`Expr`] trees.
//!
//! A plain recursive-descent parser over the [`Token`] stream. The machine never sees
//! source text; this module only exists so programs can be written down.
use core::fmt;
use std::rc::Rc;

use crate::{
    expr::{Expr, LogicOp, PrimOp},
    ident::Identifier,
    lexer::{Span, Token},
};

/// A row/column location in source, both 0-based. Columns count characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Position {
    pub row: usize,
    pub column: usize,
}

impl Position {
    fn of(source: &str, offset: usize) -> Self {
        let mut offset = offset.min(source.len());
        while !source.is_char_boundary(offset) {
            offset -= 1;
        }
        let before = &source[..offset];
        let row = before.matches('\n').count();
        let line_start = before.rfind('\n').map_or(0, |idx| idx + 1);
        Self {
            row,
            column: before[line_start..].chars().count(),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row + 1, self.column + 1)
    }
}

/// Why and where parsing stopped. `end` is exclusive.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{start}: {message}")]
pub struct SyntaxError {
    pub message: String,
    pub range: Span,
    pub start: Position,
    pub end: Position,
}

impl SyntaxError {
    fn new(source: &str, message: impl Into<String>, range: Span) -> Self {
        Self {
            message: message.into(),
            start: Position::of(source, range.start),
            end: Position::of(source, range.end),
            range,
        }
    }
}

/// Parses a whole program.
pub fn parse(source: &str) -> Result<Rc<Expr>, SyntaxError> {
    let mut tokens = vec![];
    let mut lexer = Token::lexer(source);
    while let Some(token) = lexer.next() {
        match token {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(err) => return Err(SyntaxError::new(source, err.to_string(), lexer.span())),
        }
    }

    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
        wildcards: 0,
    };
    let expr = parser.expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(parser.error(format!("expected end of input, found {token}"))),
    }
}

struct Parser<'src> {
    source: &'src str,
    tokens: Vec<(Token, Span)>,
    pos: usize,
    // `_` binders get their own tags so they can never be referred to
    wildcards: u64,
}

type ParseResult<T> = Result<T, SyntaxError>;

impl<'src> Parser<'src> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(token, _)| token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> ParseResult<()> {
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(self.unexpected(&expected.to_string()))
        }
    }

    /// Span of the current token, or an empty span at the end of input.
    fn span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.clone())
            .unwrap_or(self.source.len()..self.source.len())
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(self.source, message, self.span())
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        match self.peek() {
            Some(found) => self.error(format!("expected {expected}, found {found}")),
            None => self.error(format!("expected {expected}, found end of input")),
        }
    }

    fn expr(&mut self) -> ParseResult<Rc<Expr>> {
        match self.peek() {
            Some(Token::Fn) => {
                self.bump();
                let param = self.binder()?;
                self.expect(Token::Arrow)?;
                let body = self.expr()?;
                Ok(Rc::new(Expr::Lambda { param, body }))
            }
            Some(Token::Fix) => {
                self.bump();
                let binder = self.name()?;
                self.expect(Token::Arrow)?;
                let body = self.expr()?;
                Ok(Rc::new(Expr::Fix { binder, body }))
            }
            Some(Token::Let) => {
                self.bump();
                let id = self.binder()?;
                self.expect(Token::Assign)?;
                let bound = self.expr()?;
                self.expect(Token::In)?;
                let body = self.expr()?;
                Ok(Rc::new(Expr::Let { id, bound, body }))
            }
            Some(Token::If) => {
                self.bump();
                let cond = self.expr()?;
                self.expect(Token::Then)?;
                let then = self.expr()?;
                self.expect(Token::Else)?;
                let otherwise = self.expr()?;
                Ok(Expr::if_(cond, then, otherwise))
            }
            _ => self.or(),
        }
    }

    fn name(&mut self) -> ParseResult<Identifier> {
        match self.peek() {
            Some(Token::Identifier(name)) => {
                let id = Identifier::raw(name);
                self.bump();
                Ok(id)
            }
            _ => Err(self.unexpected("an identifier")),
        }
    }

    fn binder(&mut self) -> ParseResult<Identifier> {
        if self.eat(&Token::Underscore) {
            let id = Identifier::Generated(self.wildcards);
            self.wildcards += 1;
            Ok(id)
        } else {
            self.name()
        }
    }

    fn or(&mut self) -> ParseResult<Rc<Expr>> {
        let mut left = self.and()?;
        while self.eat(&Token::OrOr) {
            let right = self.and()?;
            left = Expr::logic(LogicOp::Or, left, right);
        }
        Ok(left)
    }

    fn and(&mut self) -> ParseResult<Rc<Expr>> {
        let mut left = self.comparison()?;
        while self.eat(&Token::AndAnd) {
            let right = self.comparison()?;
            left = Expr::logic(LogicOp::And, left, right);
        }
        Ok(left)
    }

    fn comparison(&mut self) -> ParseResult<Rc<Expr>> {
        let left = self.sum()?;
        let op = match self.peek() {
            Some(Token::EqEq) => PrimOp::Eq,
            Some(Token::NotEq) => PrimOp::Ne,
            Some(Token::Less) => PrimOp::Lt,
            Some(Token::LessEq) => PrimOp::Le,
            Some(Token::Greater) => PrimOp::Gt,
            Some(Token::GreaterEq) => PrimOp::Ge,
            _ => return Ok(left),
        };
        self.bump();
        let right = self.sum()?;
        Ok(Expr::prim(op, [left, right]))
    }

    fn sum(&mut self) -> ParseResult<Rc<Expr>> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => PrimOp::Add,
                Some(Token::Minus) => PrimOp::Sub,
                _ => return Ok(left),
            };
            self.bump();
            let right = self.term()?;
            left = Expr::prim(op, [left, right]);
        }
    }

    fn term(&mut self) -> ParseResult<Rc<Expr>> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => PrimOp::Mul,
                Some(Token::Slash) => PrimOp::Div,
                Some(Token::Percent) => PrimOp::Mod,
                _ => return Ok(left),
            };
            self.bump();
            let right = self.unary()?;
            left = Expr::prim(op, [left, right]);
        }
    }

    fn unary(&mut self) -> ParseResult<Rc<Expr>> {
        if self.eat(&Token::Not) {
            let operand = self.unary()?;
            Ok(Expr::prim(PrimOp::Neg, [operand]))
        } else if self.eat(&Token::Minus) {
            let operand = self.unary()?;
            Ok(Expr::prim(PrimOp::Sub, [Expr::int(0), operand]))
        } else {
            self.application()
        }
    }

    fn application(&mut self) -> ParseResult<Rc<Expr>> {
        let mut fun = self.atom()?;
        while self.peek().is_some_and(Token::starts_atom) {
            let arg = self.atom()?;
            fun = Expr::app(fun, arg);
        }
        Ok(fun)
    }

    fn atom(&mut self) -> ParseResult<Rc<Expr>> {
        match self.peek() {
            Some(Token::Integer(n)) => {
                let n = *n;
                self.bump();
                Ok(Expr::int(n))
            }
            Some(Token::Boolean(b)) => {
                let b = *b;
                self.bump();
                Ok(Expr::bool(b))
            }
            Some(Token::Identifier(_)) => Ok(Rc::new(Expr::Var(self.name()?))),
            Some(Token::LParen) => {
                self.bump();
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::QuoteOpen) => {
                self.bump();
                let body = self.expr()?;
                self.expect(Token::RBrace)?;
                Ok(Expr::quote(body))
            }
            Some(Token::Tilde) => {
                self.bump();
                let shift = self.shift()?;
                self.expect(Token::LBrace)?;
                let body = self.expr()?;
                self.expect(Token::RBrace)?;
                Ok(Expr::splice(shift, body))
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn shift(&mut self) -> ParseResult<i64> {
        let negative = self.eat(&Token::Minus);
        match self.peek() {
            Some(Token::Integer(n)) => {
                let n = *n;
                self.bump();
                Ok(if negative { -n } else { n })
            }
            _ if negative => Err(self.unexpected("a shift amount")),
            _ => Ok(1),
        }
    }
}
