//! Percentage change over n bars.
//!
//! PCT[i] = ((x[i] - x[i-n]) / x[i-n]) * 100
//! If x[i-n] == 0 the value is undefined and the bar is reported.
//! Warmup: first n values are undefined.

#[derive(Debug, Clone, PartialEq)]
pub struct PctChange {
    pub values: Vec<Option<f64>>,
    /// Bars whose base value was zero.
    pub zero_base: Vec<usize>,
}

pub fn calculate_pct_change(input: &[f64], period: usize) -> PctChange {
    let mut values = Vec::with_capacity(input.len());
    let mut zero_base = Vec::new();

    for (i, &curr) in input.iter().enumerate() {
        if period == 0 || i < period {
            values.push(None);
            continue;
        }
        let base = input[i - period];
        if base == 0.0 {
            zero_base.push(i);
            values.push(None);
        } else {
            values.push(Some(((curr - base) / base) * 100.0));
        }
    }

    PctChange { values, zero_base }
}
