//! Core domain types and logic.
//!
//! Text flows through [`lexer`] and [`parser`] into an [`ast::Strategy`],
//! [`validator`] turns that into a [`rule::CompiledStrategy`], and [`eval`]
//! runs it over bars using the [`indicator`] engine.

pub mod ast;
pub mod batch;
pub mod error;
pub mod eval;
pub mod indicator;
pub mod lexer;
pub mod ohlcv;
pub mod parser;
pub mod rule;
pub mod signal;
pub mod token;
pub mod validator;

use error::DslError;
use rule::CompiledStrategy;

/// Parse and validate strategy text in one step.
pub fn compile(src: &str) -> Result<CompiledStrategy, DslError> {
    let strategy = parser::parse(src).map_err(DslError::Syntax)?;
    validator::validate(&strategy).map_err(DslError::Invalid)
}
