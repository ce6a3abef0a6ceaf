//! Run configuration loaded from an INI file.
//!
//! ```ini
//! [strategy]
//! file = strategy.dsl
//!
//! ; either one instrument
//! [data]
//! bars = ohlcv.csv
//!
//! ; or one CSV per instrument, named <instrument>.csv
//! [data]
//! dir = data/
//! instruments = AAA, BBB
//!
//! [evaluation]
//! undefined = false
//! threads = 0
//!
//! [output]
//! path = signals.csv
//! ```
//!
//! `undefined` is `false` (undefined bars read as no signal) or `keep`.
//! `threads = 0` leaves the pool size to rayon. With `dir`, the output path
//! names a directory.
//!
//! Relative paths are resolved against the directory holding the INI file.

use crate::domain::error::BarsignalError;
use crate::domain::signal::UndefinedPolicy;
use configparser::ini::Ini;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Single(PathBuf),
    Directory {
        dir: PathBuf,
        instruments: Vec<String>,
    },
}

impl DataSource {
    /// (instrument name, CSV path) for every configured instrument.
    pub fn instruments(&self) -> Vec<(String, PathBuf)> {
        match self {
            DataSource::Single(path) => {
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                vec![(name, path.clone())]
            }
            DataSource::Directory { dir, instruments } => instruments
                .iter()
                .map(|code| (code.clone(), dir.join(format!("{code}.csv"))))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub strategy_file: PathBuf,
    pub data: DataSource,
    pub undefined: UndefinedPolicy,
    pub threads: usize,
    pub output: Option<PathBuf>,
}

impl RunConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BarsignalError> {
        let path = path.as_ref();
        let mut ini = Ini::new();
        ini.load(path).map_err(|reason| BarsignalError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_ini(&ini, base)
    }

    /// Parse INI text; relative paths are resolved against `base`.
    pub fn from_string(content: &str, base: &Path) -> Result<Self, BarsignalError> {
        let mut ini = Ini::new();
        ini.read(content.to_string())
            .map_err(|reason| BarsignalError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Self::from_ini(&ini, base)
    }

    fn from_ini(ini: &Ini, base: &Path) -> Result<Self, BarsignalError> {
        let strategy_file = base.join(required(ini, "strategy", "file")?);
        let data = parse_data(ini, base)?;
        let undefined = parse_undefined(ini)?;
        let threads = parse_threads(ini)?;
        let output = non_empty(ini, "output", "path").map(|p| base.join(p));

        tracing::debug!(
            strategy = %strategy_file.display(),
            ?data,
            ?undefined,
            threads,
            "loaded run config"
        );

        Ok(Self {
            strategy_file,
            data,
            undefined,
            threads,
            output,
        })
    }
}

fn non_empty(ini: &Ini, section: &str, key: &str) -> Option<String> {
    ini.get(section, key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(ini: &Ini, section: &str, key: &str) -> Result<String, BarsignalError> {
    non_empty(ini, section, key).ok_or_else(|| BarsignalError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    })
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> BarsignalError {
    BarsignalError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn parse_data(ini: &Ini, base: &Path) -> Result<DataSource, BarsignalError> {
    match (non_empty(ini, "data", "bars"), non_empty(ini, "data", "dir")) {
        (Some(bars), None) => Ok(DataSource::Single(base.join(bars))),
        (None, Some(dir)) => {
            let list = required(ini, "data", "instruments")?;
            let instruments: Vec<String> = list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if instruments.is_empty() {
                return Err(invalid("data", "instruments", "instruments list is empty"));
            }
            Ok(DataSource::Directory {
                dir: base.join(dir),
                instruments,
            })
        }
        (Some(_), Some(_)) => Err(invalid("data", "dir", "set either bars or dir, not both")),
        (None, None) => Err(BarsignalError::ConfigMissing {
            section: "data".to_string(),
            key: "bars".to_string(),
        }),
    }
}

fn parse_undefined(ini: &Ini) -> Result<UndefinedPolicy, BarsignalError> {
    match non_empty(ini, "evaluation", "undefined").as_deref() {
        None | Some("false") => Ok(UndefinedPolicy::False),
        Some("keep") => Ok(UndefinedPolicy::Keep),
        Some(other) => Err(invalid(
            "evaluation",
            "undefined",
            format!("expected 'false' or 'keep', got '{other}'"),
        )),
    }
}

fn parse_threads(ini: &Ini) -> Result<usize, BarsignalError> {
    match non_empty(ini, "evaluation", "threads") {
        None => Ok(0),
        Some(value) => value
            .parse::<usize>()
            .map_err(|_| invalid("evaluation", "threads", "threads must be a non-negative integer")),
    }
}
