//! Parallel evaluation of independent (strategy, instrument) pairs.
//!
//! Each job only reads its own strategy and bars, so jobs run on the rayon
//! pool with no coordination. A compiled strategy is shared across jobs via
//! `Arc`.

use crate::domain::error::EvalError;
use crate::domain::eval::{evaluate, Signals};
use crate::domain::ohlcv::Bar;
use crate::domain::rule::CompiledStrategy;
use rayon::prelude::*;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct BatchJob {
    pub instrument: String,
    pub strategy: Arc<CompiledStrategy>,
    pub bars: Vec<Bar>,
}

#[derive(Debug, Clone)]
pub struct BatchResult {
    pub instrument: String,
    pub outcome: Result<Signals, EvalError>,
}

/// Evaluate every job on the current rayon pool. Results keep job order.
pub fn evaluate_batch(jobs: &[BatchJob]) -> Vec<BatchResult> {
    tracing::info!(jobs = jobs.len(), "evaluating batch");
    jobs.par_iter()
        .map(|job| {
            let outcome = evaluate(&job.strategy, &job.bars);
            if let Err(e) = &outcome {
                tracing::warn!(instrument = %job.instrument, error = %e, "evaluation failed");
            }
            BatchResult {
                instrument: job.instrument.clone(),
                outcome,
            }
        })
        .collect()
}

/// A dedicated pool with `threads` workers; 0 lets rayon choose.
pub fn build_pool(threads: usize) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new().num_threads(threads).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::compile;

    fn closes(values: &[f64]) -> Vec<Bar> {
        values.iter().map(|&c| Bar::new(c, c, c, c, 1.0)).collect()
    }

    #[test]
    fn batch_matches_sequential() {
        let strategy = Arc::new(compile("ENTRY: (close > sma(close,3))").unwrap());
        let jobs: Vec<BatchJob> = (0..16)
            .map(|k| BatchJob {
                instrument: format!("I{k}"),
                strategy: Arc::clone(&strategy),
                bars: closes(&(0..10).map(|i| ((i * (k + 3)) % 7) as f64).collect::<Vec<_>>()),
            })
            .collect();

        let results = evaluate_batch(&jobs);
        assert_eq!(results.len(), jobs.len());
        for (job, result) in jobs.iter().zip(&results) {
            assert_eq!(result.instrument, job.instrument);
            let expected = evaluate(&strategy, &job.bars).unwrap();
            assert_eq!(result.outcome.as_ref().unwrap(), &expected);
        }
    }

    #[test]
    fn one_failure_does_not_stop_others() {
        let strategy = Arc::new(compile("ENTRY: (close > sma(close,5))").unwrap());
        let jobs = vec![
            BatchJob {
                instrument: "SHORT".into(),
                strategy: Arc::clone(&strategy),
                bars: closes(&[1.0, 2.0]),
            },
            BatchJob {
                instrument: "LONG".into(),
                strategy,
                bars: closes(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            },
        ];
        let results = evaluate_batch(&jobs);
        assert_eq!(
            results[0].outcome,
            Err(EvalError::InsufficientData {
                bars: 2,
                required: 5
            })
        );
        assert!(results[1].outcome.is_ok());
    }

    #[test]
    fn runs_inside_dedicated_pool() {
        let pool = build_pool(2).unwrap();
        let strategy = Arc::new(compile("EXIT: (close < 2)").unwrap());
        let jobs = vec![BatchJob {
            instrument: "A".into(),
            strategy,
            bars: closes(&[1.0, 3.0]),
        }];
        let results = pool.install(|| evaluate_batch(&jobs));
        let signals = results[0].outcome.as_ref().unwrap();
        assert_eq!(signals.exit.true_indices(), vec![0]);
    }
}
