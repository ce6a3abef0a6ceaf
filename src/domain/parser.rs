//! Strategy DSL parser.
//!
//! Recursive descent over the lexer's tokens:
//!
//! ```text
//! strategy   := { ("ENTRY" | "EXIT") ":" expr { expr } }
//! expr       := "(" or_expr ")"
//! or_expr    := and_expr { "OR" and_expr }
//! and_expr   := primary { "AND" primary }
//! primary    := "(" or_expr ")" | "FALSE" | comparison
//! comparison := operand comp_op operand
//! operand    := ["-"] number | series | series "." "shift" "(" number ")"
//!             | ident "(" series "," ["-"] number ")"
//! ```
//!
//! Function and field names are accepted as any identifier and checked later
//! by the validator; argument count is part of the grammar. After an error the
//! parser skips to the next block keyword, so one call can report problems in
//! both blocks.
//!
//! Parentheses and AND/OR chains may each nest at most [`MAX_NESTING`] levels;
//! deeper input is a parse error.

use crate::domain::ast::{BinaryOperator, ExtremeKind, MAX_NESTING, Node, Strategy};
use crate::domain::error::{ParseError, SyntaxError};
use crate::domain::lexer::Lexer;
use crate::domain::token::{Keyword, Operator, Position, Token, TokenKind};

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token<'a>,
    errors: Vec<SyntaxError>,
    groups: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        let mut parser = Self {
            lexer: Lexer::new(input),
            current: Token {
                kind: TokenKind::Eof,
                text: "",
                pos: Position::start(),
            },
            errors: Vec::new(),
            groups: 0,
        };
        parser.bump();
        parser
    }

    /// Move to the next token, recording lexical errors on the way.
    fn bump(&mut self) -> Token<'a> {
        loop {
            match self.lexer.next() {
                Some(Ok(tok)) => return std::mem::replace(&mut self.current, tok),
                Some(Err(e)) => self.errors.push(e.into()),
                // Past Eof: keep returning the Eof token.
                None => return self.current.clone(),
            }
        }
    }

    fn error(&self, expected: impl Into<String>) -> ParseError {
        ParseError {
            position: self.current.pos,
            expected: expected.into(),
            found: self.current.found(),
        }
    }

    fn at(&self, kind: &TokenKind) -> bool {
        &self.current.kind == kind
    }

    fn at_keyword(&self, kw: Keyword) -> bool {
        self.current.kind == TokenKind::Keyword(kw)
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token<'a>, ParseError> {
        if self.at(&kind) {
            Ok(self.bump())
        } else {
            Err(self.error(expected))
        }
    }

    fn expect_ident(&mut self, expected: &str) -> Result<&'a str, ParseError> {
        if self.at(&TokenKind::Ident) {
            Ok(self.bump().text)
        } else {
            Err(self.error(expected))
        }
    }

    fn too_deep(&self) -> ParseError {
        self.error(format!("shallower nesting (at most {MAX_NESTING} levels)"))
    }

    fn join(&self, left: Node, op: BinaryOperator, right: Node) -> Result<Node, ParseError> {
        let node = Node::binary(left, op, right);
        if node.depth() > MAX_NESTING {
            return Err(self.too_deep());
        }
        Ok(node)
    }

    /// A number with an optional leading minus sign.
    fn parse_signed_number(&mut self) -> Result<f64, ParseError> {
        let negative = self.at(&TokenKind::Minus);
        if negative {
            self.bump();
        }
        match self.current.kind {
            TokenKind::Number(value) if !value.is_finite() => {
                Err(self.error("number within floating-point range"))
            }
            TokenKind::Number(value) => {
                self.bump();
                Ok(if negative { -value } else { value })
            }
            _ => Err(self.error("number")),
        }
    }

    fn parse_call(&mut self, name: &str) -> Result<Node, ParseError> {
        self.expect(TokenKind::LParen, "'('")?;
        let field = self.expect_ident("field name")?.to_string();
        self.expect(TokenKind::Comma, "','")?;
        let window = self.parse_signed_number()?;
        self.expect(TokenKind::RParen, "')' after two arguments")?;

        let node = match name {
            "min" => Node::RollingExtreme {
                kind: ExtremeKind::Min,
                field,
                window,
            },
            "max" => Node::RollingExtreme {
                kind: ExtremeKind::Max,
                field,
                window,
            },
            _ => Node::Indicator {
                name: name.to_string(),
                field,
                window,
            },
        };
        Ok(node)
    }

    fn parse_shift(&mut self, field: &str) -> Result<Node, ParseError> {
        self.expect(TokenKind::Dot, "'.'")?;
        if !(self.at(&TokenKind::Ident) && self.current.text == "shift") {
            return Err(self.error("'shift'"));
        }
        self.bump();
        self.expect(TokenKind::LParen, "'('")?;
        let periods = self.parse_signed_number()?;
        self.expect(TokenKind::RParen, "')' after one argument")?;
        Ok(Node::Shift {
            field: field.to_string(),
            periods,
        })
    }

    fn parse_operand(&mut self) -> Result<Node, ParseError> {
        match self.current.kind {
            TokenKind::Number(_) | TokenKind::Minus => {
                Ok(Node::number(self.parse_signed_number()?))
            }
            TokenKind::Ident => {
                let name = self.bump().text;
                match self.current.kind {
                    TokenKind::LParen => self.parse_call(name),
                    TokenKind::Dot => self.parse_shift(name),
                    _ => Ok(Node::series(name)),
                }
            }
            _ => Err(self.error("operand")),
        }
    }

    fn parse_comparison_op(&mut self) -> Result<BinaryOperator, ParseError> {
        let op = match self.current.kind {
            TokenKind::Operator(Operator::Gt) => BinaryOperator::Gt,
            TokenKind::Operator(Operator::Lt) => BinaryOperator::Lt,
            TokenKind::Operator(Operator::Ge) => BinaryOperator::Ge,
            TokenKind::Operator(Operator::Le) => BinaryOperator::Le,
            TokenKind::Operator(Operator::Eq) => BinaryOperator::Eq,
            TokenKind::Operator(Operator::Ne) => BinaryOperator::Ne,
            TokenKind::Keyword(Keyword::CrossAbove) => BinaryOperator::CrossAbove,
            TokenKind::Keyword(Keyword::CrossBelow) => BinaryOperator::CrossBelow,
            _ => return Err(self.error("comparison operator")),
        };
        self.bump();
        Ok(op)
    }

    fn parse_comparison(&mut self) -> Result<Node, ParseError> {
        let left = self.parse_operand()?;
        let op = self.parse_comparison_op()?;
        let right = self.parse_operand()?;
        Ok(Node::binary(left, op, right))
    }

    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        if self.at(&TokenKind::LParen) {
            return self.parse_group();
        }
        if self.at_keyword(Keyword::False) {
            self.bump();
            return Ok(Node::Boolean { value: false });
        }
        self.parse_comparison()
    }

    fn parse_and(&mut self) -> Result<Node, ParseError> {
        let mut left = self.parse_primary()?;
        while self.at_keyword(Keyword::And) {
            self.bump();
            let right = self.parse_primary()?;
            left = self.join(left, BinaryOperator::And, right)?;
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Node, ParseError> {
        let mut left = self.parse_and()?;
        while self.at_keyword(Keyword::Or) {
            self.bump();
            let right = self.parse_and()?;
            left = self.join(left, BinaryOperator::Or, right)?;
        }
        Ok(left)
    }

    fn parse_group(&mut self) -> Result<Node, ParseError> {
        if self.groups >= MAX_NESTING {
            return Err(self.too_deep());
        }
        self.groups += 1;
        self.expect(TokenKind::LParen, "'('")?;
        let node = self.parse_or()?;
        self.expect(TokenKind::RParen, "')'")?;
        self.groups -= 1;
        Ok(node)
    }

    fn parse_block(&mut self) -> Result<Vec<Node>, ParseError> {
        // an error inside a group leaves the count raised
        self.groups = 0;
        self.expect(TokenKind::Colon, "':'")?;
        let mut roots = vec![self.parse_group()?];
        while self.at(&TokenKind::LParen) {
            roots.push(self.parse_group()?);
        }
        Ok(roots)
    }

    fn recover(&mut self) {
        while !matches!(
            self.current.kind,
            TokenKind::Keyword(Keyword::Entry | Keyword::Exit) | TokenKind::Eof
        ) {
            self.bump();
        }
    }

    fn parse_strategy(&mut self) -> Strategy {
        let mut strategy = Strategy::default();
        let mut seen = [false, false];

        loop {
            let slot = match self.current.kind {
                TokenKind::Eof => break,
                TokenKind::Keyword(Keyword::Entry) => 0,
                TokenKind::Keyword(Keyword::Exit) => 1,
                _ => {
                    let err = self.error("'ENTRY:' or 'EXIT:'");
                    self.errors.push(err.into());
                    self.recover();
                    continue;
                }
            };

            if seen[slot] {
                let err = self.error("at most one block per keyword");
                self.errors.push(err.into());
            }
            seen[slot] = true;
            self.bump();

            match self.parse_block() {
                Ok(roots) if slot == 0 => strategy.entry = roots,
                Ok(roots) => strategy.exit = roots,
                Err(e) => {
                    self.errors.push(e.into());
                    self.recover();
                }
            }
        }
        strategy
    }

    fn finish<T>(mut self, value: T) -> Result<T, Vec<SyntaxError>> {
        // Drain the lexer so trailing lexical errors are reported too.
        while !matches!(self.current.kind, TokenKind::Eof) {
            self.bump();
        }
        if self.errors.is_empty() {
            Ok(value)
        } else {
            self.errors.sort_by_key(|e| e.position().offset);
            Err(self.errors)
        }
    }
}

/// Parse strategy text into entry and exit condition lists.
pub fn parse(input: &str) -> Result<Strategy, Vec<SyntaxError>> {
    let mut parser = Parser::new(input);
    let strategy = parser.parse_strategy();
    parser.finish(strategy)
}

/// Parse a single condition such as `close > sma(close,20) AND volume > 1000`.
/// Surrounding parentheses are optional.
pub fn parse_condition(input: &str) -> Result<Node, Vec<SyntaxError>> {
    let mut parser = Parser::new(input);
    let node = match parser.parse_or() {
        Ok(node) if parser.at(&TokenKind::Eof) => Some(node),
        Ok(_) => {
            let err = parser.error("end of input");
            parser.errors.push(err.into());
            None
        }
        Err(e) => {
            parser.errors.push(e.into());
            None
        }
    };
    parser.finish(node.unwrap_or(Node::Boolean { value: false }))
}
