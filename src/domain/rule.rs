//! Typed conditions produced by the validator.
//!
//! - `Operand`: what can be compared (price fields, constants, derived series)
//! - `IndicatorSpec`: a derived series with its parameters; also the
//!   evaluator's cache key
//! - `Condition`: comparison, logical combination, or constant
//! - `CompiledStrategy`: validated entry/exit blocks ready for evaluation

use crate::domain::ohlcv::Field;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndicatorKind {
    Sma,
    Ema,
    Rsi,
    PctChange,
    Shift,
    RollingMin,
    RollingMax,
}

impl IndicatorKind {
    pub fn name(self) -> &'static str {
        match self {
            IndicatorKind::Sma => "sma",
            IndicatorKind::Ema => "ema",
            IndicatorKind::Rsi => "rsi",
            IndicatorKind::PctChange => "pct_change",
            IndicatorKind::Shift => "shift",
            IndicatorKind::RollingMin => "min",
            IndicatorKind::RollingMax => "max",
        }
    }

    /// Number of leading bars left undefined for a window of `window`.
    pub fn warmup(self, window: usize) -> usize {
        match self {
            IndicatorKind::Sma
            | IndicatorKind::Ema
            | IndicatorKind::RollingMin
            | IndicatorKind::RollingMax => window.saturating_sub(1),
            IndicatorKind::Rsi | IndicatorKind::PctChange | IndicatorKind::Shift => window,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndicatorSpec {
    pub kind: IndicatorKind,
    pub field: Field,
    pub window: usize,
}

impl IndicatorSpec {
    pub fn new(kind: IndicatorKind, field: Field, window: usize) -> Self {
        Self {
            kind,
            field,
            window,
        }
    }

    pub fn warmup(&self) -> usize {
        self.kind.warmup(self.window)
    }
}

impl fmt::Display for IndicatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            IndicatorKind::Shift => write!(f, "{}.shift({})", self.field, self.window),
            kind => write!(f, "{}({},{})", kind.name(), self.field, self.window),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Field(Field),
    Constant(f64),
    Indicator(IndicatorSpec),
}

impl Operand {
    /// Bars needed before this operand has a defined value.
    fn history(&self) -> usize {
        match self {
            Operand::Constant(_) => 0,
            Operand::Field(_) => 1,
            Operand::Indicator(spec) => spec.warmup().saturating_add(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
    CrossAbove,
    CrossBelow,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare {
        op: CompareOp,
        left: Operand,
        right: Operand,
    },
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Constant(bool),
}

impl Condition {
    /// Minimum number of bars before this condition can be defined anywhere.
    pub fn required_history(&self) -> usize {
        match self {
            Condition::Compare { op, left, right } => {
                let base = left.history().max(right.history());
                match op {
                    CompareOp::CrossAbove | CompareOp::CrossBelow => base.max(1).saturating_add(1),
                    _ => base,
                }
            }
            Condition::And(a, b) | Condition::Or(a, b) => {
                a.required_history().max(b.required_history())
            }
            Condition::Constant(_) => 0,
        }
    }

    pub fn collect_indicators(&self, out: &mut BTreeSet<IndicatorSpec>) {
        match self {
            Condition::Compare { left, right, .. } => {
                for operand in [left, right] {
                    if let Operand::Indicator(spec) = operand {
                        out.insert(*spec);
                    }
                }
            }
            Condition::And(a, b) | Condition::Or(a, b) => {
                a.collect_indicators(out);
                b.collect_indicators(out);
            }
            Condition::Constant(_) => {}
        }
    }
}

/// A validated strategy. Only [`crate::domain::validator::validate`] builds one.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStrategy {
    pub(crate) entry: Vec<Condition>,
    pub(crate) exit: Vec<Condition>,
}

impl CompiledStrategy {
    pub fn entry(&self) -> &[Condition] {
        &self.entry
    }

    pub fn exit(&self) -> &[Condition] {
        &self.exit
    }

    pub fn required_history(&self) -> usize {
        self.entry
            .iter()
            .chain(&self.exit)
            .map(Condition::required_history)
            .max()
            .unwrap_or(0)
    }

    /// Distinct derived series used anywhere in the strategy.
    pub fn indicators(&self) -> Vec<IndicatorSpec> {
        let mut set = BTreeSet::new();
        for cond in self.entry.iter().chain(&self.exit) {
            cond.collect_indicators(&mut set);
        }
        set.into_iter().collect()
    }
}
