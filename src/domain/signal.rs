//! Three-valued boolean signals.
//!
//! A bar's signal is `True`, `False`, or `Undefined` when the inputs it
//! depends on lack history (warm-up) or hit a numeric-domain fault.
//! `AND`/`OR` follow Kleene logic: a known `False` decides `AND`, a known
//! `True` decides `OR`, otherwise `Undefined` propagates.

use std::ops::Index;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    True,
    False,
    Undefined,
}

impl Signal {
    pub fn and(self, other: Signal) -> Signal {
        match (self, other) {
            (Signal::False, _) | (_, Signal::False) => Signal::False,
            (Signal::True, Signal::True) => Signal::True,
            _ => Signal::Undefined,
        }
    }

    pub fn or(self, other: Signal) -> Signal {
        match (self, other) {
            (Signal::True, _) | (_, Signal::True) => Signal::True,
            (Signal::False, Signal::False) => Signal::False,
            _ => Signal::Undefined,
        }
    }

    pub fn as_option(self) -> Option<bool> {
        match self {
            Signal::True => Some(true),
            Signal::False => Some(false),
            Signal::Undefined => None,
        }
    }

    pub fn is_true(self) -> bool {
        self == Signal::True
    }
}

impl From<bool> for Signal {
    fn from(value: bool) -> Self {
        if value { Signal::True } else { Signal::False }
    }
}

impl From<Option<bool>> for Signal {
    fn from(value: Option<bool>) -> Self {
        value.map_or(Signal::Undefined, Signal::from)
    }
}

/// How a caller wants `Undefined` bars treated when collapsing to plain booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UndefinedPolicy {
    /// `Undefined` reads as "no signal".
    #[default]
    False,
    /// `Undefined` is preserved as `None`.
    Keep,
}

/// A signal per bar, aligned to the bar series it was evaluated on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignalSeries(Vec<Signal>);

impl SignalSeries {
    pub fn new(signals: Vec<Signal>) -> Self {
        Self(signals)
    }

    /// All-`False` series of length `len`.
    pub fn never(len: usize) -> Self {
        Self(vec![Signal::False; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Signal> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[Signal] {
        &self.0
    }

    /// Bar-by-bar three-valued AND. Both series must have the same length.
    pub fn and(&self, other: &SignalSeries) -> SignalSeries {
        self.zip_with(other, Signal::and)
    }

    pub fn or(&self, other: &SignalSeries) -> SignalSeries {
        self.zip_with(other, Signal::or)
    }

    fn zip_with(&self, other: &SignalSeries, f: impl Fn(Signal, Signal) -> Signal) -> SignalSeries {
        debug_assert_eq!(self.len(), other.len());
        SignalSeries(self.iter().zip(other.iter()).map(|(a, b)| f(a, b)).collect())
    }

    /// Bar indices where the signal is `True`.
    pub fn true_indices(&self) -> Vec<usize> {
        self.iter()
            .enumerate()
            .filter_map(|(i, s)| s.is_true().then_some(i))
            .collect()
    }

    pub fn collapse(&self, policy: UndefinedPolicy) -> Vec<Option<bool>> {
        self.iter()
            .map(|s| match (s, policy) {
                (Signal::Undefined, UndefinedPolicy::False) => Some(false),
                (s, _) => s.as_option(),
            })
            .collect()
    }
}

impl Index<usize> for SignalSeries {
    type Output = Signal;

    fn index(&self, index: usize) -> &Signal {
        &self.0[index]
    }
}

impl FromIterator<Signal> for SignalSeries {
    fn from_iter<I: IntoIterator<Item = Signal>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
