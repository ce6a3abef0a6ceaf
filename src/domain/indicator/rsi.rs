//! RSI (Relative Strength Index) using Wilder's smoothing.
//!
//! - First average: simple mean of gains/losses over the first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100, unless avg_gain == 0 too, then RSI = 50.
//!
//! Warmup: first n values are undefined (n changes need n+1 inputs).
//! A NaN or infinite input is undefined and restarts the warmup: the next
//! value needs n fresh changes between finite inputs.

pub fn calculate_rsi(input: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut values = vec![None; input.len()];
    if period == 0 {
        return values;
    }

    let n = period as f64;
    let mut prev: Option<f64> = None;
    let mut changes = 0usize;
    let (mut avg_gain, mut avg_loss) = (0.0, 0.0);

    for (i, &x) in input.iter().enumerate() {
        if !x.is_finite() {
            prev = None;
            continue;
        }
        let Some(last) = prev.replace(x) else {
            changes = 0;
            avg_gain = 0.0;
            avg_loss = 0.0;
            continue;
        };

        let c = x - last;
        let (gain, loss) = (c.max(0.0), (-c).max(0.0));
        changes += 1;
        if changes < period {
            avg_gain += gain;
            avg_loss += loss;
        } else if changes == period {
            avg_gain = (avg_gain + gain) / n;
            avg_loss = (avg_loss + loss) / n;
            values[i] = Some(rsi_from_averages(avg_gain, avg_loss));
        } else {
            avg_gain = (avg_gain * (n - 1.0) + gain) / n;
            avg_loss = (avg_loss * (n - 1.0) + loss) / n;
            values[i] = Some(rsi_from_averages(avg_gain, avg_loss));
        }
    }
    values
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 { 50.0 } else { 100.0 }
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rsi_empty_and_single() {
        assert!(calculate_rsi(&[], 14).is_empty());
        assert_eq!(calculate_rsi(&[100.0], 14), vec![None]);
    }

    #[test]
    fn rsi_warmup_period() {
        let input: Vec<f64> = (1..=15).map(|i| 100.0 + (i as f64 % 5.0) * 2.0).collect();
        let values = calculate_rsi(&input, 14);

        assert_eq!(values.len(), 15);
        for (i, v) in values.iter().enumerate().take(14) {
            assert!(v.is_none(), "bar {i} should be undefined");
        }
        assert!(values[14].is_some(), "bar 14 should be defined");
    }

    #[test]
    fn rsi_all_gains_no_losses() {
        let input: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let values = calculate_rsi(&input, 14);
        assert_relative_eq!(values[14].unwrap(), 100.0);
    }

    #[test]
    fn rsi_all_losses_no_gains() {
        let input: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        let values = calculate_rsi(&input, 14);
        assert_relative_eq!(values[14].unwrap(), 0.0);
    }

    #[test]
    fn rsi_flat_series_is_50() {
        let values = calculate_rsi(&[42.0; 20], 14);
        for v in &values[14..] {
            assert_relative_eq!(v.unwrap(), 50.0);
        }
    }

    #[test]
    fn rsi_in_range() {
        let input: Vec<f64> = (1..=40)
            .map(|i| 100.0 + (i as f64 % 7.0 - 3.0) * 2.0)
            .collect();
        for v in calculate_rsi(&input, 14).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&v), "RSI {v} out of range");
        }
    }

    #[test]
    fn rsi_zero_period() {
        assert_eq!(calculate_rsi(&[100.0, 101.0], 0), vec![None, None]);
    }

    #[test]
    fn rsi_known_calculation() {
        let input = [
            44.0, 44.25, 44.50, 43.75, 44.50, 44.25, 44.75, 45.25, 45.50, 45.25, 45.50, 46.0,
            46.25, 46.0, 46.50,
        ];
        let values = calculate_rsi(&input, 14);
        // gains sum 4.0, losses sum 1.5 over the first 14 changes
        assert_relative_eq!(values[14].unwrap(), 100.0 * 4.0 / 5.5, epsilon = 1e-9);
    }

    #[test]
    fn rsi_wilder_smoothing_step() {
        let input = [10.0, 11.0, 10.0, 12.0];
        let values = calculate_rsi(&input, 2);
        // seed: gain 0.5, loss 0.5 -> 50
        assert_relative_eq!(values[2].unwrap(), 50.0);
        // next change +2: gain (0.5 + 2) / 2 = 1.25, loss 0.25
        assert_relative_eq!(values[3].unwrap(), 100.0 - 100.0 / 6.0, epsilon = 1e-9);
    }

    #[test]
    fn rsi_restarts_after_non_finite_input() {
        let input = [10.0, 11.0, 10.0, f64::NAN, 10.0, 12.0, 11.0, 13.0];
        let values = calculate_rsi(&input, 2);
        assert_relative_eq!(values[2].unwrap(), 50.0);
        assert_eq!(values[3..6], [None, None, None]);
        // fresh seed from changes +2 and -1
        assert_relative_eq!(values[6].unwrap(), 100.0 - 100.0 / 3.0, epsilon = 1e-9);
        assert!(values[7].is_some());
    }
}
