//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::csv_adapter::{CsvBarSource, CsvSignalWriter, SignalTarget};
use crate::config::{DataSource, RunConfig};
use crate::domain;
use crate::domain::batch::{self, BatchJob};
use crate::domain::error::{BarsignalError, DslError};
use crate::domain::eval;
use crate::domain::parser;
use crate::domain::rule::CompiledStrategy;
use crate::domain::signal::UndefinedPolicy;
use crate::ports::data_port::BarSource;
use crate::ports::signal_port::SignalSink;

#[derive(Parser, Debug)]
#[command(name = "barsignal", about = "Evaluate trading-rule strategies over OHLCV bars")]
pub struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse a strategy file and print its canonical form
    Parse {
        file: PathBuf,
        /// Print the syntax tree as JSON instead
        #[arg(long)]
        json: bool,
    },
    /// Parse and validate a strategy file
    Check { file: PathBuf },
    /// Evaluate a strategy over bar data
    Eval {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long, required_unless_present = "config")]
        strategy: Option<PathBuf>,
        #[arg(short, long, required_unless_present = "config")]
        bars: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Leave undefined bars blank instead of writing false
        #[arg(long)]
        keep_undefined: bool,
    },
    /// Evaluate a strategy over every configured instrument in parallel
    Batch {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Parse { file, json } => run_parse(&file, json),
        Command::Check { file } => run_check(&file),
        Command::Eval {
            config,
            strategy,
            bars,
            output,
            keep_undefined,
        } => eval_config(config.as_deref(), strategy, bars, output, keep_undefined)
            .and_then(|config| run_eval(&config)),
        Command::Batch { config } => {
            RunConfig::from_file(&config).and_then(|config| run_batch(&config))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

fn read_strategy(path: &Path) -> Result<String, BarsignalError> {
    tracing::info!(path = %path.display(), "reading strategy");
    Ok(fs::read_to_string(path)?)
}

/// Print every diagnostic, with caret context for syntax errors.
fn report_dsl(err: &DslError, src: &str) {
    match err {
        DslError::Syntax(errors) => {
            for e in errors {
                eprintln!("{}\n", e.display_with_context(src));
            }
        }
        DslError::Invalid(errors) => {
            for e in errors {
                eprintln!("validation error at {e}");
            }
        }
    }
}

fn compile_file(path: &Path) -> Result<CompiledStrategy, BarsignalError> {
    let src = read_strategy(path)?;
    domain::compile(&src).map_err(|e| {
        report_dsl(&e, &src);
        BarsignalError::Dsl(e)
    })
}

fn run_parse(path: &Path, json: bool) -> Result<(), BarsignalError> {
    let src = read_strategy(path)?;
    let strategy = parser::parse(&src).map_err(|errors| {
        let e = DslError::Syntax(errors);
        report_dsl(&e, &src);
        BarsignalError::Dsl(e)
    })?;

    if json {
        let text = serde_json::to_string_pretty(&strategy).map_err(std::io::Error::from)?;
        println!("{text}");
    } else {
        print!("{strategy}");
    }
    Ok(())
}

fn run_check(path: &Path) -> Result<(), BarsignalError> {
    let strategy = compile_file(path)?;
    println!("{}: ok", path.display());
    println!(
        "  entry conditions: {}, exit conditions: {}",
        strategy.entry().len(),
        strategy.exit().len()
    );
    println!("  required history: {} bars", strategy.required_history());
    let indicators = strategy.indicators();
    if !indicators.is_empty() {
        let names: Vec<String> = indicators.iter().map(ToString::to_string).collect();
        println!("  indicators: {}", names.join(", "));
    }
    Ok(())
}

/// Merge `--config` with command-line overrides.
fn eval_config(
    config: Option<&Path>,
    strategy: Option<PathBuf>,
    bars: Option<PathBuf>,
    output: Option<PathBuf>,
    keep_undefined: bool,
) -> Result<RunConfig, BarsignalError> {
    let mut run = match config {
        Some(path) => RunConfig::from_file(path)?,
        None => {
            let missing = |key: &str| BarsignalError::ConfigMissing {
                section: "command line".to_string(),
                key: key.to_string(),
            };
            RunConfig {
                strategy_file: strategy.clone().ok_or_else(|| missing("strategy"))?,
                data: DataSource::Single(bars.clone().ok_or_else(|| missing("bars"))?),
                undefined: UndefinedPolicy::False,
                threads: 0,
                output: None,
            }
        }
    };
    if let Some(strategy) = strategy {
        run.strategy_file = strategy;
    }
    if let Some(bars) = bars {
        run.data = DataSource::Single(bars);
    }
    if output.is_some() {
        run.output = output;
    }
    if keep_undefined {
        run.undefined = UndefinedPolicy::Keep;
    }
    Ok(run)
}

fn signal_target(config: &RunConfig) -> Result<SignalTarget, BarsignalError> {
    match (&config.data, &config.output) {
        (DataSource::Single(_), None) => Ok(SignalTarget::Stdout),
        (DataSource::Single(_), Some(path)) => Ok(SignalTarget::File(path.clone())),
        (DataSource::Directory { .. }, Some(dir)) => Ok(SignalTarget::Directory(dir.clone())),
        (DataSource::Directory { .. }, None) => Err(BarsignalError::ConfigMissing {
            section: "output".to_string(),
            key: "path".to_string(),
        }),
    }
}

fn run_eval(config: &RunConfig) -> Result<(), BarsignalError> {
    let strategy = compile_file(&config.strategy_file)?;
    let source = CsvBarSource::new(config.data.instruments());
    let sink = CsvSignalWriter::new(signal_target(config)?);

    for instrument in source.list_instruments() {
        let bars = source.fetch_bars(&instrument)?;
        let signals = eval::evaluate(&strategy, &bars).map_err(|error| BarsignalError::Eval {
            instrument: instrument.clone(),
            error,
        })?;
        tracing::info!(
            instrument = %instrument,
            bars = bars.len(),
            entries = signals.entry.true_indices().len(),
            exits = signals.exit.true_indices().len(),
            domain_errors = signals.domain_errors.len(),
            "evaluated"
        );
        sink.write(&instrument, &bars, &signals, config.undefined)?;
    }
    Ok(())
}

fn run_batch(config: &RunConfig) -> Result<(), BarsignalError> {
    let strategy = Arc::new(compile_file(&config.strategy_file)?);
    let source = CsvBarSource::new(config.data.instruments());
    let sink = CsvSignalWriter::new(signal_target(config)?);

    let mut jobs = Vec::new();
    for instrument in source.list_instruments() {
        let bars = source.fetch_bars(&instrument)?;
        jobs.push(BatchJob {
            instrument,
            strategy: Arc::clone(&strategy),
            bars,
        });
    }

    tracing::info!(threads = config.threads, "configuring rayon thread pool");
    let pool = batch::build_pool(config.threads).map_err(|e| BarsignalError::ConfigInvalid {
        section: "evaluation".to_string(),
        key: "threads".to_string(),
        reason: e.to_string(),
    })?;
    let results = pool.install(|| batch::evaluate_batch(&jobs));

    // Write every successful instrument, then report the first failure.
    let mut first_error = None;
    for (job, result) in jobs.iter().zip(results) {
        match result.outcome {
            Ok(signals) => sink.write(&job.instrument, &job.bars, &signals, config.undefined)?,
            Err(error) => {
                eprintln!("{}: {error}", job.instrument);
                first_error.get_or_insert(BarsignalError::Eval {
                    instrument: result.instrument,
                    error,
                });
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
