use core::fmt;

pub use logos::Span;
use logos::{Lexer, Logos};

fn read_integer(lexer: &mut Lexer<Token>) -> Result<i64, LexerError> {
    lexer
        .slice()
        .parse::<i64>()
        .map_err(|_| LexerError::IntegerTooBig(Box::from(lexer.slice())))
}

#[derive(thiserror::Error, Debug, PartialEq, Clone, Default)]
pub enum LexerError {
    #[default]
    #[error("invalid token encountered")]
    Invalid,
    #[error("integer literal too big: {0}")]
    IntegerTooBig(Box<str>),
}

/// Tokens of the surface syntax. Whitespace and `#` line comments are skipped.
#[derive(Debug, Clone, PartialEq, Logos)]
#[logos(error = LexerError)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"#[^\n]*")]
pub enum Token {
    #[token("fn")]
    Fn,
    #[token("fix")]
    Fix,
    #[token("let")]
    Let,
    #[token("in")]
    In,
    #[token("if")]
    If,
    #[token("then")]
    Then,
    #[token("else")]
    Else,
    #[token("not")]
    Not,
    #[token("true", |_| true)]
    #[token("false", |_| false)]
    Boolean(bool),

    #[token("->")]
    Arrow,
    #[token("=")]
    Assign,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    // quotes always open a brace: `{ ... }
    #[token("`{")]
    QuoteOpen,
    #[token("~")]
    Tilde,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Less,
    #[token("<=")]
    LessEq,
    #[token(">")]
    Greater,
    #[token(">=")]
    GreaterEq,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,

    #[token("_", priority = 3)]
    Underscore,
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_']*", |l| Box::from(l.slice()))]
    Identifier(Box<str>),
    #[regex(r"[0-9]+", read_integer)]
    Integer(i64),
}

impl Token {
    pub fn lexer(source: &str) -> Lexer<Self> {
        <Self as Logos>::lexer(source)
    }

    /// Whether this token can begin an application argument.
    pub fn starts_atom(&self) -> bool {
        matches!(
            self,
            Self::Integer(_)
                | Self::Boolean(_)
                | Self::Identifier(_)
                | Self::LParen
                | Self::QuoteOpen
                | Self::Tilde
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Identifier(name) => return write!(f, "identifier `{name}`"),
            Self::Integer(n) => return write!(f, "integer `{n}`"),
            Self::Boolean(b) => return write!(f, "`{b}`"),
            Self::Fn => "fn",
            Self::Fix => "fix",
            Self::Let => "let",
            Self::In => "in",
            Self::If => "if",
            Self::Then => "then",
            Self::Else => "else",
            Self::Not => "not",
            Self::Arrow => "->",
            Self::Assign => "=",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::QuoteOpen => "`{",
            Self::Tilde => "~",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::EqEq => "==",
            Self::NotEq => "!=",
            Self::Less => "<",
            Self::LessEq => "<=",
            Self::Greater => ">",
            Self::GreaterEq => ">=",
            Self::AndAnd => "&&",
            Self::OrOr => "||",
            Self::Underscore => "_",
        };
        write!(f, "`{text}`")
    }
}

#[cfg(test)]
mod tests {
    use super::{LexerError, Token};
    use arbtest::arbtest;
    use assert2::{check, let_assert};

    fn tokens(source: &str) -> Vec<Result<Token, LexerError>> {
        Token::lexer(source).collect()
    }

    #[test]
    fn keywords_are_not_identifiers() {
        check!(Token::lexer("fn").next() == Some(Ok(Token::Fn)));
        check!(Token::lexer("fix").next() == Some(Ok(Token::Fix)));
        check!(Token::lexer("not").next() == Some(Ok(Token::Not)));
        check!(Token::lexer("true").next() == Some(Ok(Token::Boolean(true))));
        check!(Token::lexer("false").next() == Some(Ok(Token::Boolean(false))));
        // but prefixes of longer names are
        check!(Token::lexer("fnord").next() == Some(Ok(Token::Identifier("fnord".into()))));
        check!(Token::lexer("inner").next() == Some(Ok(Token::Identifier("inner".into()))));
        check!(Token::lexer("_").next() == Some(Ok(Token::Underscore)));
        check!(Token::lexer("_x").next() == Some(Ok(Token::Identifier("_x".into()))));
        check!(Token::lexer("x'").next() == Some(Ok(Token::Identifier("x'".into()))));
    }

    #[test]
    fn staging_tokens() {
        check!(
            tokens("`{ 1 }")
                == [
                    Ok(Token::QuoteOpen),
                    Ok(Token::Integer(1)),
                    Ok(Token::RBrace)
                ]
        );
        check!(
            tokens("~0{x}")
                == [
                    Ok(Token::Tilde),
                    Ok(Token::Integer(0)),
                    Ok(Token::LBrace),
                    Ok(Token::Identifier("x".into())),
                    Ok(Token::RBrace)
                ]
        );
    }

    #[test]
    fn operators_take_the_longest_match() {
        check!(
            tokens("<= < == = -> - && ||")
                == [
                    Ok(Token::LessEq),
                    Ok(Token::Less),
                    Ok(Token::EqEq),
                    Ok(Token::Assign),
                    Ok(Token::Arrow),
                    Ok(Token::Minus),
                    Ok(Token::AndAnd),
                    Ok(Token::OrOr)
                ]
        );
    }

    #[test]
    fn comments_and_whitespace_are_skipped() {
        check!(tokens("1 # one\n\t2 #two") == [Ok(Token::Integer(1)), Ok(Token::Integer(2))]);
    }

    #[test]
    fn errors() {
        let_assert!(
            Some(Err(LexerError::IntegerTooBig(text))) = Token::lexer("99999999999999999999").next()
        );
        check!(text.as_ref() == "99999999999999999999");
        check!(Token::lexer("$").next() == Some(Err(LexerError::Invalid)));
        check!(Token::lexer("`x").next() == Some(Err(LexerError::Invalid)));
    }

    #[test]
    fn spans() {
        let mut lexer = Token::lexer("let x");
        check!(lexer.next() == Some(Ok(Token::Let)));
        check!(lexer.span() == (0..3));
        check!(lexer.next() == Some(Ok(Token::Identifier("x".into()))));
        check!(lexer.span() == (4..5));
    }

    #[test]
    fn integer_arbtest() {
        arbtest(|u| {
            let value: u64 = u.arbitrary()?;
            let text = value.to_string();
            match i64::try_from(value) {
                Ok(value) => {
                    check!(Token::lexer(&text).next() == Some(Ok(Token::Integer(value))));
                }
                Err(_) => {
                    check!(matches!(
                        Token::lexer(&text).next(),
                        Some(Err(LexerError::IntegerTooBig(_)))
                    ));
                }
            }
            Ok(())
        });
    }
}
