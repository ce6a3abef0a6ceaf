//! Exponential Moving Average.
//!
//! k = 2/(n+1), seed with the SMA of the first n values, then
//! EMA[i] = x[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) values are undefined.
//! A NaN or infinite input is undefined and restarts the warmup, so the next
//! value is the SMA seed of the following n finite inputs.

pub fn calculate_ema(input: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut values = Vec::with_capacity(input.len());
    if period == 0 {
        values.resize(input.len(), None);
        return values;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = 0.0;
    let mut sum = 0.0;
    let mut seen = 0usize;

    for &x in input {
        if !x.is_finite() {
            seen = 0;
            sum = 0.0;
            values.push(None);
            continue;
        }
        seen += 1;
        if seen < period {
            sum += x;
            values.push(None);
        } else if seen == period {
            sum += x;
            ema = sum / period as f64;
            values.push(Some(ema));
        } else {
            ema = x * k + ema * (1.0 - k);
            values.push(Some(ema));
        }
    }
    values
}
