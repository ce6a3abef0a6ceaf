//! Derived series computed from one bar field.
//!
//! Every function here maps an input column of length *n* to an output of
//! length *n*. Positions without enough history are `None`; they never
//! default to zero.

pub mod ema;
pub mod pct_change;
pub mod rolling;
pub mod rsi;
pub mod shift;
pub mod sma;

use crate::domain::ohlcv::{column, Bar};
use crate::domain::rule::{IndicatorKind, IndicatorSpec};

/// Output of one indicator over a bar series.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub spec: IndicatorSpec,
    pub values: Vec<Option<f64>>,
    /// Bars where the value is undefined because of a numeric-domain fault
    /// rather than warm-up.
    pub domain_errors: Vec<usize>,
}

impl IndicatorSeries {
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }

    /// Index of the first defined value, if any.
    pub fn first_defined(&self) -> Option<usize> {
        self.values.iter().position(Option::is_some)
    }
}

/// Compute `spec` over `bars`.
pub fn compute(spec: IndicatorSpec, bars: &[Bar]) -> IndicatorSeries {
    let input = column(bars, spec.field);
    let n = spec.window;
    let mut domain_errors = Vec::new();
    let values = match spec.kind {
        IndicatorKind::Sma => sma::calculate_sma(&input, n),
        IndicatorKind::Ema => ema::calculate_ema(&input, n),
        IndicatorKind::Rsi => rsi::calculate_rsi(&input, n),
        IndicatorKind::PctChange => {
            let out = pct_change::calculate_pct_change(&input, n);
            domain_errors = out.zero_base;
            out.values
        }
        IndicatorKind::Shift => shift::calculate_shift(&input, n),
        IndicatorKind::RollingMin => rolling::rolling_min(&input, n),
        IndicatorKind::RollingMax => rolling::rolling_max(&input, n),
    };
    IndicatorSeries {
        spec,
        values,
        domain_errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::Field;

    fn bars(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .map(|&c| Bar::new(c, c + 1.0, c - 1.0, c, 1000.0))
            .collect()
    }

    #[test]
    fn output_length_matches_input() {
        let data = bars(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        for kind in [
            IndicatorKind::Sma,
            IndicatorKind::Ema,
            IndicatorKind::Rsi,
            IndicatorKind::PctChange,
            IndicatorKind::Shift,
            IndicatorKind::RollingMin,
            IndicatorKind::RollingMax,
        ] {
            let series = compute(IndicatorSpec::new(kind, Field::Close, 3), &data);
            assert_eq!(series.values.len(), 5, "{kind:?}");
        }
    }

    #[test]
    fn first_defined_matches_warmup() {
        let data = bars(&[5.0, 4.0, 6.0, 7.0, 3.0, 8.0, 9.0, 2.0]);
        for kind in [
            IndicatorKind::Sma,
            IndicatorKind::Ema,
            IndicatorKind::Rsi,
            IndicatorKind::PctChange,
            IndicatorKind::Shift,
            IndicatorKind::RollingMin,
            IndicatorKind::RollingMax,
        ] {
            let spec = IndicatorSpec::new(kind, Field::Close, 3);
            let series = compute(spec, &data);
            assert_eq!(series.first_defined(), Some(spec.warmup()), "{kind:?}");
        }
    }

    #[test]
    fn reads_the_requested_field() {
        let data = bars(&[10.0, 20.0]);
        let high = compute(IndicatorSpec::new(IndicatorKind::Shift, Field::High, 1), &data);
        assert_eq!(high.values, vec![None, Some(11.0)]);
        let low = compute(IndicatorSpec::new(IndicatorKind::RollingMin, Field::Low, 1), &data);
        assert_eq!(low.values, vec![Some(9.0), Some(19.0)]);
    }

    #[test]
    fn pct_change_reports_zero_base() {
        let data = bars(&[0.0, 5.0, 10.0]);
        let series = compute(IndicatorSpec::new(IndicatorKind::PctChange, Field::Close, 1), &data);
        assert_eq!(series.values, vec![None, None, Some(100.0)]);
        assert_eq!(series.domain_errors, vec![1]);
        assert_eq!(series.get(2), Some(100.0));
        assert_eq!(series.get(9), None);
    }

    #[test]
    fn short_input_is_all_undefined() {
        let data = bars(&[1.0, 2.0]);
        let series = compute(IndicatorSpec::new(IndicatorKind::Sma, Field::Close, 5), &data);
        assert_eq!(series.values, vec![None, None]);
        assert_eq!(series.first_defined(), None);
    }
}
