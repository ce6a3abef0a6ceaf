//! Semantic checks that turn a parsed [`Strategy`] into a [`CompiledStrategy`].
//!
//! Checks run depth-first, per node, in this order: field names, function
//! names, window parameters, then operand types. Every problem is collected
//! so one pass reports all of them.

use crate::domain::ast::{BinaryOperator, ExtremeKind, MAX_NESTING, Node, Strategy};
use crate::domain::error::{ValidationError, ValidationIssue, ValueKind};
use crate::domain::ohlcv::Field;
use crate::domain::rule::{
    CompareOp, CompiledStrategy, Condition, IndicatorKind, IndicatorSpec, Operand,
};

struct Checker {
    errors: Vec<ValidationError>,
}

/// Result of checking one subtree: its value kind plus the typed form when
/// the subtree itself is error-free.
enum Checked {
    Numeric(Option<Operand>),
    Boolean(Option<Condition>),
}

impl Checked {
    fn kind(&self) -> ValueKind {
        match self {
            Checked::Numeric(_) => ValueKind::Numeric,
            Checked::Boolean(_) => ValueKind::Boolean,
        }
    }
}

impl Checker {
    fn report(&mut self, location: &str, issue: ValidationIssue) {
        self.errors.push(ValidationError {
            location: location.to_string(),
            issue,
        });
    }

    fn field(&mut self, location: &str, name: &str) -> Option<Field> {
        match name.parse::<Field>() {
            Ok(field) => Some(field),
            Err(()) => {
                self.report(location, ValidationIssue::UnknownField(name.to_string()));
                None
            }
        }
    }

    fn window(&mut self, location: &str, name: &str, value: f64) -> Option<usize> {
        if value.is_finite() && value >= 1.0 && value.fract() == 0.0 && value <= usize::MAX as f64 {
            Some(value as usize)
        } else {
            self.report(
                location,
                ValidationIssue::InvalidWindow {
                    name: name.to_string(),
                    value,
                },
            );
            None
        }
    }

    fn indicator(
        &mut self,
        location: &str,
        kind: Option<IndicatorKind>,
        name: &str,
        field: &str,
        window: f64,
    ) -> Checked {
        let field = self.field(location, field);
        if kind.is_none() {
            self.report(location, ValidationIssue::UnknownFunction(name.to_string()));
        }
        let window = self.window(location, name, window);
        let spec = match (kind, field, window) {
            (Some(kind), Some(field), Some(window)) => {
                Some(Operand::Indicator(IndicatorSpec::new(kind, field, window)))
            }
            _ => None,
        };
        Checked::Numeric(spec)
    }

    fn expect_kind(&mut self, location: &str, context: BinaryOperator, expected: ValueKind, found: &Checked) {
        if found.kind() != expected {
            self.report(
                location,
                ValidationIssue::TypeMismatch {
                    context: context.as_str().to_string(),
                    expected,
                    found: found.kind(),
                },
            );
        }
    }

    fn binary(&mut self, location: &str, left: &Node, op: BinaryOperator, right: &Node) -> Checked {
        let left_loc = format!("{location}.left");
        let right_loc = format!("{location}.right");
        let l = self.node(&left_loc, left);
        let r = self.node(&right_loc, right);

        let Some(cmp) = compare_op(op) else {
            self.expect_kind(&left_loc, op, ValueKind::Boolean, &l);
            self.expect_kind(&right_loc, op, ValueKind::Boolean, &r);
            let cond = match (l, r) {
                (Checked::Boolean(Some(a)), Checked::Boolean(Some(b))) => {
                    let (a, b) = (Box::new(a), Box::new(b));
                    Some(match op {
                        BinaryOperator::And => Condition::And(a, b),
                        _ => Condition::Or(a, b),
                    })
                }
                _ => None,
            };
            return Checked::Boolean(cond);
        };

        self.expect_kind(&left_loc, op, ValueKind::Numeric, &l);
        self.expect_kind(&right_loc, op, ValueKind::Numeric, &r);
        let cond = match (l, r) {
            (Checked::Numeric(Some(left)), Checked::Numeric(Some(right))) => Some(Condition::Compare {
                op: cmp,
                left,
                right,
            }),
            _ => None,
        };
        Checked::Boolean(cond)
    }

    fn node(&mut self, location: &str, node: &Node) -> Checked {
        match node {
            Node::BinaryOp { left, op, right } => self.binary(location, left, *op, right),
            Node::Series { field } => Checked::Numeric(self.field(location, field).map(Operand::Field)),
            Node::Number { value } => Checked::Numeric(Some(Operand::Constant(*value))),
            Node::Boolean { value } => Checked::Boolean(Some(Condition::Constant(*value))),
            Node::Indicator { name, field, window } => {
                let kind = match name.as_str() {
                    "sma" => Some(IndicatorKind::Sma),
                    "ema" => Some(IndicatorKind::Ema),
                    "rsi" => Some(IndicatorKind::Rsi),
                    "pct_change" => Some(IndicatorKind::PctChange),
                    // `min`/`max` normally arrive as RollingExtreme, but a
                    // hand-built tree may spell them as indicators.
                    "min" => Some(IndicatorKind::RollingMin),
                    "max" => Some(IndicatorKind::RollingMax),
                    _ => None,
                };
                self.indicator(location, kind, name, field, *window)
            }
            Node::Shift { field, periods } => {
                self.indicator(location, Some(IndicatorKind::Shift), "shift", field, *periods)
            }
            Node::RollingExtreme { kind, field, window } => {
                let indicator = match kind {
                    ExtremeKind::Min => IndicatorKind::RollingMin,
                    ExtremeKind::Max => IndicatorKind::RollingMax,
                };
                self.indicator(location, Some(indicator), kind.as_str(), field, *window)
            }
        }
    }

    fn block(&mut self, name: &str, roots: &[Node]) -> Vec<Condition> {
        let mut out = Vec::with_capacity(roots.len());
        for (i, root) in roots.iter().enumerate() {
            let location = format!("{name}[{i}]");
            let depth = root.depth();
            if depth > MAX_NESTING {
                self.report(
                    &location,
                    ValidationIssue::TooDeep {
                        depth,
                        limit: MAX_NESTING,
                    },
                );
                continue;
            }
            match self.node(&location, root) {
                Checked::Boolean(Some(cond)) => out.push(cond),
                Checked::Boolean(None) => {}
                Checked::Numeric(_) => self.report(
                    &location,
                    ValidationIssue::TypeMismatch {
                        context: name.to_string(),
                        expected: ValueKind::Boolean,
                        found: ValueKind::Numeric,
                    },
                ),
            }
        }
        out
    }
}

/// The comparison behind a binary operator; `None` for AND/OR.
fn compare_op(op: BinaryOperator) -> Option<CompareOp> {
    let cmp = match op {
        BinaryOperator::Gt => CompareOp::Gt,
        BinaryOperator::Lt => CompareOp::Lt,
        BinaryOperator::Ge => CompareOp::Ge,
        BinaryOperator::Le => CompareOp::Le,
        BinaryOperator::Eq => CompareOp::Eq,
        BinaryOperator::Ne => CompareOp::Ne,
        BinaryOperator::CrossAbove => CompareOp::CrossAbove,
        BinaryOperator::CrossBelow => CompareOp::CrossBelow,
        BinaryOperator::And | BinaryOperator::Or => return None,
    };
    Some(cmp)
}

/// Check a parsed strategy, returning its typed form or every problem found.
pub fn validate(strategy: &Strategy) -> Result<CompiledStrategy, Vec<ValidationError>> {
    let mut checker = Checker { errors: Vec::new() };
    let entry = checker.block("entry", &strategy.entry);
    let exit = checker.block("exit", &strategy.exit);
    if checker.errors.is_empty() {
        Ok(CompiledStrategy { entry, exit })
    } else {
        Err(checker.errors)
    }
}
