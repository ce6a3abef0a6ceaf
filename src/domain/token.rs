//! Tokens produced by the lexer.

use std::fmt;

/// Location of a token or error in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Byte offset into the source.
    pub offset: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
}

impl Position {
    pub fn start() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Entry,
    Exit,
    And,
    Or,
    False,
    CrossAbove,
    CrossBelow,
}

impl Keyword {
    pub fn lookup(word: &str) -> Option<Keyword> {
        let kw = match word {
            "ENTRY" => Keyword::Entry,
            "EXIT" => Keyword::Exit,
            "AND" => Keyword::And,
            "OR" => Keyword::Or,
            "FALSE" => Keyword::False,
            "cross_above" | "CROSS_ABOVE" => Keyword::CrossAbove,
            "cross_below" | "CROSS_BELOW" => Keyword::CrossBelow,
            _ => return None,
        };
        Some(kw)
    }
}

/// Symbolic comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident,
    Number(f64),
    Keyword(Keyword),
    Operator(Operator),
    LParen,
    RParen,
    Comma,
    Dot,
    Colon,
    Minus,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub pos: Position,
}

impl Token<'_> {
    /// The token as it should appear in a "found ..." message.
    pub fn found(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("'{}'", self.text),
        }
    }
}
