//! Strategy evaluation over a bar series.
//!
//! # Evaluation Semantics
//!
//! - Comparisons are `Undefined` wherever either operand is undefined
//! - `==`/`!=` compare within [`EPSILON`]
//! - `cross_above`/`cross_below` look at bar `i` and `i-1`; `Undefined` at
//!   bar 0 or when any of the four values is undefined
//! - `AND`/`OR` use three-valued (Kleene) logic
//! - `FALSE` is `False` at every bar
//! - A block's roots are combined with `AND`; an empty block never fires
//!
//! Each indicator is computed at most once per call to [`evaluate`].

use crate::domain::error::{EvalDomainError, EvalError};
use crate::domain::indicator::{self, IndicatorSeries};
use crate::domain::ohlcv::{column, Bar, Field};
use crate::domain::rule::{CompareOp, CompiledStrategy, Condition, IndicatorSpec, Operand};
use crate::domain::signal::{Signal, SignalSeries};
use std::collections::HashMap;
use std::rc::Rc;

pub const EPSILON: f64 = 1e-9;

/// Entry and exit signals for one bar series.
#[derive(Debug, Clone, PartialEq)]
pub struct Signals {
    pub entry: SignalSeries,
    pub exit: SignalSeries,
    /// Numeric-domain faults hit while computing indicators, ordered by bar.
    pub domain_errors: Vec<EvalDomainError>,
}

/// Evaluate `strategy` against `bars`.
///
/// Fails with [`EvalError::InsufficientData`] when `bars` is shorter than
/// [`CompiledStrategy::required_history`].
pub fn evaluate(strategy: &CompiledStrategy, bars: &[Bar]) -> Result<Signals, EvalError> {
    let required = strategy.required_history();
    if bars.len() < required {
        return Err(EvalError::InsufficientData {
            bars: bars.len(),
            required,
        });
    }

    let mut ctx = EvalContext::new(bars);
    let entry = ctx.block("entry", strategy.entry());
    let exit = ctx.block("exit", strategy.exit());

    let mut domain_errors = ctx.domain_errors;
    domain_errors.sort_by_key(|e| (e.bar, e.indicator));

    Ok(Signals {
        entry,
        exit,
        domain_errors,
    })
}

/// An operand resolved to a per-bar lookup.
enum Resolved {
    Column(Rc<Vec<f64>>),
    Constant(f64),
    Indicator(Rc<IndicatorSeries>),
}

impl Resolved {
    /// Value at bar `i`; NaN inputs read as undefined.
    fn at(&self, i: usize) -> Option<f64> {
        let value = match self {
            Resolved::Column(values) => values.get(i).copied(),
            Resolved::Constant(value) => Some(*value),
            Resolved::Indicator(series) => series.get(i),
        };
        value.filter(|v| !v.is_nan())
    }
}

struct EvalContext<'a> {
    bars: &'a [Bar],
    columns: HashMap<Field, Rc<Vec<f64>>>,
    indicators: HashMap<IndicatorSpec, Rc<IndicatorSeries>>,
    domain_errors: Vec<EvalDomainError>,
}

impl<'a> EvalContext<'a> {
    fn new(bars: &'a [Bar]) -> Self {
        Self {
            bars,
            columns: HashMap::new(),
            indicators: HashMap::new(),
            domain_errors: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        self.bars.len()
    }

    fn indicator(&mut self, spec: IndicatorSpec) -> Rc<IndicatorSeries> {
        if let Some(series) = self.indicators.get(&spec) {
            tracing::debug!(indicator = %spec, "indicator cache hit");
            return Rc::clone(series);
        }

        let series = Rc::new(indicator::compute(spec, self.bars));
        for &bar in &series.domain_errors {
            tracing::warn!(indicator = %spec, bar, "zero base in pct_change, value undefined");
            self.domain_errors.push(EvalDomainError {
                indicator: spec,
                bar,
            });
        }
        self.indicators.insert(spec, Rc::clone(&series));
        series
    }

    fn resolve(&mut self, operand: &Operand) -> Resolved {
        match operand {
            Operand::Constant(value) => Resolved::Constant(*value),
            Operand::Field(field) => {
                let bars = self.bars;
                let values = self
                    .columns
                    .entry(*field)
                    .or_insert_with(|| Rc::new(column(bars, *field)));
                Resolved::Column(Rc::clone(values))
            }
            Operand::Indicator(spec) => Resolved::Indicator(self.indicator(*spec)),
        }
    }

    fn condition(&mut self, cond: &Condition) -> SignalSeries {
        match cond {
            Condition::Constant(value) => SignalSeries::new(vec![Signal::from(*value); self.len()]),
            Condition::And(a, b) => {
                let a = self.condition(a);
                a.and(&self.condition(b))
            }
            Condition::Or(a, b) => {
                let a = self.condition(a);
                a.or(&self.condition(b))
            }
            Condition::Compare { op, left, right } => {
                let left = self.resolve(left);
                let right = self.resolve(right);
                (0..self.len())
                    .map(|i| compare_at(*op, &left, &right, i))
                    .collect()
            }
        }
    }

    fn block(&mut self, name: &str, roots: &[Condition]) -> SignalSeries {
        let mut combined: Option<SignalSeries> = None;
        for root in roots {
            let series = self.condition(root);
            combined = Some(match combined {
                Some(acc) => acc.and(&series),
                None => series,
            });
        }
        let series = combined.unwrap_or_else(|| SignalSeries::never(self.len()));
        tracing::debug!(
            block = name,
            roots = roots.len(),
            fired = series.true_indices().len(),
            "evaluated block"
        );
        series
    }
}

fn compare_at(op: CompareOp, left: &Resolved, right: &Resolved, i: usize) -> Signal {
    let (Some(l), Some(r)) = (left.at(i), right.at(i)) else {
        return Signal::Undefined;
    };
    let result = match op {
        CompareOp::Gt => l > r,
        CompareOp::Lt => l < r,
        CompareOp::Ge => l >= r,
        CompareOp::Le => l <= r,
        CompareOp::Eq => (l - r).abs() < EPSILON,
        CompareOp::Ne => (l - r).abs() >= EPSILON,
        CompareOp::CrossAbove | CompareOp::CrossBelow => {
            let Some(prev) = i.checked_sub(1) else {
                return Signal::Undefined;
            };
            let (Some(lp), Some(rp)) = (left.at(prev), right.at(prev)) else {
                return Signal::Undefined;
            };
            if op == CompareOp::CrossAbove {
                l > r && lp <= rp
            } else {
                l < r && lp >= rp
            }
        }
    };
    Signal::from(result)
}
