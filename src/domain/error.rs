//! Domain error types.

use crate::domain::rule::IndicatorSpec;
use crate::domain::token::Position;

/// An unrecognized character in the source text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("lex error at {position}: unexpected character '{unexpected}'")]
pub struct LexError {
    pub position: Position,
    pub unexpected: char,
}

/// A grammar violation with position and expected-vs-found information.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at {position}: expected {expected}, found {found}")]
pub struct ParseError {
    pub position: Position,
    pub expected: String,
    pub found: String,
}

impl ParseError {
    /// Format the error with a caret pointing at the error column in the
    /// offending source line.
    pub fn display_with_context(&self, input: &str) -> String {
        context(input, self.position, &self.to_string())
    }
}

/// Anything that stops source text from becoming an AST.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyntaxError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl SyntaxError {
    pub fn position(&self) -> Position {
        match self {
            SyntaxError::Lex(e) => e.position,
            SyntaxError::Parse(e) => e.position,
        }
    }

    pub fn display_with_context(&self, input: &str) -> String {
        context(input, self.position(), &self.to_string())
    }
}

fn context(input: &str, position: Position, message: &str) -> String {
    let line = input
        .lines()
        .nth(position.line.saturating_sub(1))
        .unwrap_or_default();
    let caret = " ".repeat(position.column.saturating_sub(1)) + "^";
    format!("{line}\n{caret}\n{message}")
}

/// A semantic problem found while checking a parsed tree.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{location}: {issue}")]
pub struct ValidationError {
    /// Path to the offending node, e.g. `entry[0].left.right`.
    pub location: String,
    pub issue: ValidationIssue,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationIssue {
    #[error("unknown field '{0}' (expected open, high, low, close or volume)")]
    UnknownField(String),
    #[error("unknown function '{0}' (expected sma, ema, rsi, pct_change, min or max)")]
    UnknownFunction(String),
    #[error("{name} window must be a positive integer, got {value}")]
    InvalidWindow { name: String, value: f64 },
    #[error("condition nests {depth} operators deep (at most {limit})")]
    TooDeep { depth: usize, limit: usize },
    #[error("'{context}' expects a {expected} operand, found a {found} expression")]
    TypeMismatch {
        context: String,
        expected: ValueKind,
        found: ValueKind,
    },
}

/// What an expression evaluates to, per bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Numeric,
    Boolean,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueKind::Numeric => f.write_str("numeric"),
            ValueKind::Boolean => f.write_str("boolean"),
        }
    }
}

/// Failure to turn source text into an evaluable strategy.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DslError {
    #[error("{} syntax error(s); first: {}", .0.len(), first(.0))]
    Syntax(Vec<SyntaxError>),
    #[error("{} validation error(s); first: {}", .0.len(), first(.0))]
    Invalid(Vec<ValidationError>),
}

fn first<E: ToString>(errors: &[E]) -> String {
    errors.first().map(|e| e.to_string()).unwrap_or_default()
}

/// A pct_change base of zero at one bar. Non-fatal: the value is undefined.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{indicator} is undefined at bar {bar}: division by zero")]
pub struct EvalDomainError {
    pub indicator: IndicatorSpec,
    pub bar: usize,
}

/// Fatal evaluation failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("insufficient data: have {bars} bars, need at least {required}")]
    InsufficientData { bars: usize, required: usize },
}

/// Top-level error type for barsignal.
#[derive(Debug, thiserror::Error)]
pub enum BarsignalError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error in {source_name}: {reason}")]
    Data { source_name: String, reason: String },

    #[error(transparent)]
    Dsl(#[from] DslError),

    #[error("{instrument}: {error}")]
    Eval { instrument: String, error: EvalError },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&BarsignalError> for std::process::ExitCode {
    fn from(err: &BarsignalError) -> Self {
        let code: u8 = match err {
            BarsignalError::Io(_) => 1,
            BarsignalError::ConfigParse { .. }
            | BarsignalError::ConfigMissing { .. }
            | BarsignalError::ConfigInvalid { .. } => 2,
            BarsignalError::Data { .. } => 3,
            BarsignalError::Dsl(_) => 4,
            BarsignalError::Eval { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
