//! Lagged series: SHIFT[i] = x[i-n]. Undefined for the first n values.

pub fn calculate_shift(input: &[f64], periods: usize) -> Vec<Option<f64>> {
    (0..input.len())
        .map(|i| i.checked_sub(periods).map(|j| input[j]))
        .collect()
}
