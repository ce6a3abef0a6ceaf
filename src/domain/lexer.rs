//! Lazy tokenizer for strategy source text.
//!
//! Skips whitespace and `#` line comments. Always finishes with a single
//! `Eof` token; after a [`LexError`] the lexer resumes at the next character.

use crate::domain::error::LexError;
use crate::domain::token::{Keyword, Operator, Position, Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a str,
    pos: Position,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: Position::start(),
            done: false,
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos.offset..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.remaining().chars().nth(1)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos.offset += ch.len_utf8();
        if ch == '\n' {
            self.pos.line += 1;
            self.pos.column = 1;
        } else {
            self.pos.column += 1;
        }
        Some(ch)
    }

    fn skip_trivia(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '#' {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.advance();
        }
    }

    fn lex_word(&mut self, start: Position) -> Token<'a> {
        self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
        let text = &self.input[start.offset..self.pos.offset];
        let kind = match Keyword::lookup(text) {
            Some(kw) => TokenKind::Keyword(kw),
            None => TokenKind::Ident,
        };
        Token {
            kind,
            text,
            pos: start,
        }
    }

    fn lex_number(&mut self, start: Position) -> Result<Token<'a>, LexError> {
        self.take_while(|c| c.is_ascii_digit());
        if self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            self.take_while(|c| c.is_ascii_digit());
        }
        let text = &self.input[start.offset..self.pos.offset];
        let value = text.parse::<f64>().map_err(|_| LexError {
            position: start,
            unexpected: text.chars().next().unwrap_or('0'),
        })?;
        Ok(Token {
            kind: TokenKind::Number(value),
            text,
            pos: start,
        })
    }

    fn lex_operator(&mut self, start: Position, first: char) -> Option<Token<'a>> {
        let op = match (first, self.peek_second()) {
            ('>', Some('=')) => Operator::Ge,
            ('<', Some('=')) => Operator::Le,
            ('=', Some('=')) => Operator::Eq,
            ('!', Some('=')) => Operator::Ne,
            ('>', _) => Operator::Gt,
            ('<', _) => Operator::Lt,
            _ => return None,
        };
        let width = match op {
            Operator::Gt | Operator::Lt => 1,
            _ => 2,
        };
        for _ in 0..width {
            self.advance();
        }
        Some(Token {
            kind: TokenKind::Operator(op),
            text: &self.input[start.offset..self.pos.offset],
            pos: start,
        })
    }

    fn next_token(&mut self) -> Result<Token<'a>, LexError> {
        self.skip_trivia();
        let start = self.pos;

        let Some(ch) = self.peek() else {
            self.done = true;
            return Ok(Token {
                kind: TokenKind::Eof,
                text: "",
                pos: start,
            });
        };

        if ch.is_ascii_alphabetic() || ch == '_' {
            return Ok(self.lex_word(start));
        }
        if ch.is_ascii_digit() {
            return self.lex_number(start);
        }
        if let Some(tok) = self.lex_operator(start, ch) {
            return Ok(tok);
        }

        let kind = match ch {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            ':' => TokenKind::Colon,
            '-' => TokenKind::Minus,
            _ => {
                self.advance();
                return Err(LexError {
                    position: start,
                    unexpected: ch,
                });
            }
        };
        self.advance();
        Ok(Token {
            kind,
            text: &self.input[start.offset..self.pos.offset],
            pos: start,
        })
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        Some(self.next_token())
    }
}

pub fn tokenize(input: &str) -> Lexer<'_> {
    Lexer::new(input)
}
