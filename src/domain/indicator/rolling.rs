//! Rolling extremes over the last n values, current bar inclusive.
//!
//! A monotonic deque of indices keeps each pass linear in the input length.
//! Warmup: first (n-1) values are undefined.
//! A window holding a NaN or infinite input is undefined until that bar
//! leaves it.

use std::collections::VecDeque;

pub fn rolling_min(input: &[f64], period: usize) -> Vec<Option<f64>> {
    rolling_extreme(input, period, |candidate, kept| candidate <= kept)
}

pub fn rolling_max(input: &[f64], period: usize) -> Vec<Option<f64>> {
    rolling_extreme(input, period, |candidate, kept| candidate >= kept)
}

/// `dominates(a, b)` is true when `a` makes the older `b` irrelevant.
fn rolling_extreme(
    input: &[f64],
    period: usize,
    dominates: impl Fn(f64, f64) -> bool,
) -> Vec<Option<f64>> {
    let mut values = Vec::with_capacity(input.len());
    if period == 0 {
        values.resize(input.len(), None);
        return values;
    }

    let mut window: VecDeque<usize> = VecDeque::with_capacity(period.min(input.len()));
    let mut last_bad: Option<usize> = None;
    for (i, &x) in input.iter().enumerate() {
        if x.is_finite() {
            while window.back().is_some_and(|&j| dominates(x, input[j])) {
                window.pop_back();
            }
            window.push_back(i);
        } else {
            last_bad = Some(i);
        }
        if window.front().is_some_and(|&j| i - j >= period) {
            window.pop_front();
        }

        if i + 1 >= period && last_bad.is_none_or(|b| i - b >= period) {
            values.push(window.front().map(|&j| input[j]));
        } else {
            values.push(None);
        }
    }
    values
}
