//! Simple Moving Average.
//!
//! SMA[i] = mean(x[i-n+1..=i]), kept as a running sum of the finite inputs.
//! Warmup: first (n-1) values are undefined.
//! A window holding a NaN or infinite input is undefined; the average comes
//! back once that bar leaves the window.

pub fn calculate_sma(input: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut values = Vec::with_capacity(input.len());
    if period == 0 {
        values.resize(input.len(), None);
        return values;
    }

    let mut sum = 0.0;
    let mut last_bad: Option<usize> = None;
    for (i, &x) in input.iter().enumerate() {
        if x.is_finite() {
            sum += x;
        } else {
            last_bad = Some(i);
        }
        if i >= period {
            let leaving = input[i - period];
            if leaving.is_finite() {
                sum -= leaving;
            }
        }

        let clean = last_bad.is_none_or(|b| i - b >= period);
        if i + 1 >= period && clean {
            values.push(Some(sum / period as f64));
        } else {
            values.push(None);
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sma_warmup() {
        let values = calculate_sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert!(values[0].is_none());
        assert!(values[1].is_none());
        assert!(values[2..].iter().all(Option::is_some));
    }

    #[test]
    fn sma_window_mean() {
        let values = calculate_sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_relative_eq!(values[2].unwrap(), 2.0);
        assert_relative_eq!(values[3].unwrap(), 3.0);
        assert_relative_eq!(values[4].unwrap(), 4.0);
    }

    #[test]
    fn sma_period_1_is_identity() {
        let input = [3.5, 7.25, 1.0];
        let values = calculate_sma(&input, 1);
        assert_eq!(values, vec![Some(3.5), Some(7.25), Some(1.0)]);
    }

    #[test]
    fn sma_running_sum_matches_direct_mean() {
        let input: Vec<f64> = (0..50).map(|i| ((i * 37) % 11) as f64 + 0.1 * i as f64).collect();
        let values = calculate_sma(&input, 7);
        for i in 6..input.len() {
            let direct = input[i - 6..=i].iter().sum::<f64>() / 7.0;
            assert_relative_eq!(values[i].unwrap(), direct, epsilon = 1e-9);
        }
    }

    #[test]
    fn sma_empty_and_period_0() {
        assert!(calculate_sma(&[], 3).is_empty());
        assert_eq!(calculate_sma(&[1.0, 2.0], 0), vec![None, None]);
    }

    #[test]
    fn sma_recovers_after_nan() {
        let input = [1.0, f64::NAN, 1.0, 1.0, 1.0, 1.0];
        let values = calculate_sma(&input, 2);
        assert_eq!(values, vec![None, None, None, Some(1.0), Some(1.0), Some(1.0)]);
    }

    #[test]
    fn sma_recovers_after_infinity() {
        let input = [1.0, f64::INFINITY, 3.0, 5.0, f64::NEG_INFINITY, 2.0, 4.0];
        let values = calculate_sma(&input, 2);
        assert_eq!(
            values,
            vec![None, None, None, Some(4.0), None, None, Some(3.0)]
        );
    }
}
