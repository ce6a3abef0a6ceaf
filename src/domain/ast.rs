//! Strategy syntax tree.
//!
//! This is the tree exchanged with collaborators: it serializes to tagged JSON
//! (`{"type": "binary_op", "op": ">", ...}`) and prints as canonical DSL text.
//! Names and windows stay loosely typed here because a tree may come from
//! outside the parser; [`crate::domain::validator`] turns it into the typed
//! form used for evaluation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Deepest chain of operators, or of parentheses, allowed in one condition.
pub const MAX_NESTING: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "cross_above")]
    CrossAbove,
    #[serde(rename = "cross_below")]
    CrossBelow,
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl BinaryOperator {
    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOperator::Gt => ">",
            BinaryOperator::Lt => "<",
            BinaryOperator::Ge => ">=",
            BinaryOperator::Le => "<=",
            BinaryOperator::Eq => "==",
            BinaryOperator::Ne => "!=",
            BinaryOperator::CrossAbove => "cross_above",
            BinaryOperator::CrossBelow => "cross_below",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtremeKind {
    Min,
    Max,
}

impl ExtremeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExtremeKind::Min => "min",
            ExtremeKind::Max => "max",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    BinaryOp {
        left: Box<Node>,
        op: BinaryOperator,
        right: Box<Node>,
    },
    Series {
        field: String,
    },
    Number {
        value: f64,
    },
    /// Constant condition; the parser produces it for `FALSE`.
    Boolean {
        value: bool,
    },
    Indicator {
        name: String,
        field: String,
        window: f64,
    },
    Shift {
        field: String,
        periods: f64,
    },
    #[serde(rename = "rolling")]
    RollingExtreme {
        kind: ExtremeKind,
        field: String,
        window: f64,
    },
}

impl Node {
    pub fn binary(left: Node, op: BinaryOperator, right: Node) -> Node {
        Node::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Operator levels on the longest root-to-leaf path; a leaf is 0.
    /// Walks with an explicit stack so arbitrarily deep trees are safe to measure.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 0)];
        while let Some((node, level)) = stack.pop() {
            deepest = deepest.max(level);
            if let Node::BinaryOp { left, right, .. } = node {
                stack.push((left.as_ref(), level + 1));
                stack.push((right.as_ref(), level + 1));
            }
        }
        deepest
    }

    pub fn series(field: &str) -> Node {
        Node::Series {
            field: field.to_string(),
        }
    }

    pub fn number(value: f64) -> Node {
        Node::Number { value }
    }

    pub fn indicator(name: &str, field: &str, window: f64) -> Node {
        Node::Indicator {
            name: name.to_string(),
            field: field.to_string(),
            window,
        }
    }

    fn logical_op(&self) -> Option<BinaryOperator> {
        match self {
            Node::BinaryOp { op, .. } if op.is_logical() => Some(*op),
            _ => None,
        }
    }

    /// Write `child` as an operand of a logical `parent`, adding parentheses
    /// where precedence or associativity would otherwise change the tree.
    fn fmt_logical_child(
        f: &mut fmt::Formatter<'_>,
        parent: BinaryOperator,
        child: &Node,
        is_right: bool,
    ) -> fmt::Result {
        let needs_parens = match child.logical_op() {
            Some(BinaryOperator::Or) => parent == BinaryOperator::And || is_right,
            Some(_) => is_right,
            None => false,
        };
        if needs_parens {
            write!(f, "({child})")
        } else {
            write!(f, "{child}")
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::BinaryOp { left, op, right } if op.is_logical() => {
                Node::fmt_logical_child(f, *op, left, false)?;
                write!(f, " {op} ")?;
                Node::fmt_logical_child(f, *op, right, true)
            }
            Node::BinaryOp { left, op, right } => write!(f, "{left} {op} {right}"),
            Node::Series { field } => f.write_str(field),
            Node::Number { value } => write!(f, "{value}"),
            Node::Boolean { value: false } => f.write_str("FALSE"),
            // The grammar has no TRUE keyword; `0 == 0` is the same constant.
            Node::Boolean { value: true } => f.write_str("0 == 0"),
            Node::Indicator {
                name,
                field,
                window,
            } => write!(f, "{name}({field},{window})"),
            Node::Shift { field, periods } => write!(f, "{field}.shift({periods})"),
            Node::RollingExtreme {
                kind,
                field,
                window,
            } => write!(f, "{}({field},{window})", kind.as_str()),
        }
    }
}

/// Parsed entry and exit conditions.
///
/// Each list is an implicit conjunction of its roots. An empty list means the
/// block was omitted and never fires; `(FALSE)` is a one-element list instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub entry: Vec<Node>,
    pub exit: Vec<Node>,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (keyword, roots) in [("ENTRY", &self.entry), ("EXIT", &self.exit)] {
            if roots.is_empty() {
                continue;
            }
            writeln!(f, "{keyword}:")?;
            for root in roots {
                writeln!(f, "    ({root})")?;
            }
        }
        Ok(())
    }
}
