//! CSV bar input and signal output.
//!
//! Bar files are header-addressed: `open,high,low,close,volume` are required
//! in any order, `date` (`YYYY-MM-DD`) is optional, other columns are ignored.

use crate::domain::error::BarsignalError;
use crate::domain::eval::Signals;
use crate::domain::ohlcv::{Bar, Field};
use crate::domain::signal::UndefinedPolicy;
use crate::ports::data_port::BarSource;
use crate::ports::signal_port::SignalSink;
use chrono::NaiveDate;
use std::fs::{self, File};
use std::io;
use std::path::PathBuf;

pub struct CsvBarSource {
    files: Vec<(String, PathBuf)>,
}

impl CsvBarSource {
    /// `files` maps instrument names to CSV paths.
    pub fn new(files: Vec<(String, PathBuf)>) -> Self {
        Self { files }
    }
}

impl BarSource for CsvBarSource {
    fn fetch_bars(&self, instrument: &str) -> Result<Vec<Bar>, BarsignalError> {
        let (_, path) = self
            .files
            .iter()
            .find(|(name, _)| name == instrument)
            .ok_or_else(|| BarsignalError::Data {
                source_name: instrument.to_string(),
                reason: "unknown instrument".into(),
            })?;
        let source_name = path.display().to_string();
        let file = File::open(path).map_err(|e| BarsignalError::Data {
            source_name: source_name.clone(),
            reason: format!("failed to open: {e}"),
        })?;
        let bars = read_bars(file, &source_name)?;
        tracing::debug!(instrument, bars = bars.len(), "loaded bars");
        Ok(bars)
    }

    fn list_instruments(&self) -> Vec<String> {
        self.files.iter().map(|(name, _)| name.clone()).collect()
    }
}

struct Columns {
    date: Option<usize>,
    fields: [usize; 5],
}

fn locate_columns(headers: &csv::StringRecord, source_name: &str) -> Result<Columns, BarsignalError> {
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    };
    let mut fields = [0; 5];
    for (slot, field) in fields.iter_mut().zip(Field::ALL) {
        *slot = find(field.as_str()).ok_or_else(|| BarsignalError::Data {
            source_name: source_name.to_string(),
            reason: format!("missing column '{field}'"),
        })?;
    }
    Ok(Columns {
        date: find("date"),
        fields,
    })
}

/// Read bars from CSV text. Rows are sorted by date when every row has one.
pub fn read_bars<R: io::Read>(reader: R, source_name: &str) -> Result<Vec<Bar>, BarsignalError> {
    let data_err = |row: usize, reason: String| BarsignalError::Data {
        source_name: source_name.to_string(),
        reason: format!("row {row}: {reason}"),
    };

    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers().map_err(|e| BarsignalError::Data {
        source_name: source_name.to_string(),
        reason: format!("CSV header error: {e}"),
    })?;
    let columns = locate_columns(headers, source_name)?;

    let mut bars = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let row = i + 1;
        let record = result.map_err(|e| data_err(row, format!("CSV parse error: {e}")))?;

        let mut values = [0.0; 5];
        for ((value, &col), field) in values.iter_mut().zip(&columns.fields).zip(Field::ALL) {
            let text = record.get(col).unwrap_or_default().trim();
            *value = text
                .parse()
                .map_err(|e| data_err(row, format!("invalid {field} value '{text}': {e}")))?;
        }

        let date = match columns.date.and_then(|col| record.get(col)).map(str::trim) {
            None | Some("") => None,
            Some(text) => Some(
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .map_err(|e| data_err(row, format!("invalid date '{text}': {e}")))?,
            ),
        };

        let [open, high, low, close, volume] = values;
        bars.push(Bar {
            date,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    if bars.iter().all(|b| b.date.is_some()) {
        bars.sort_by_key(|b| b.date);
    }
    Ok(bars)
}

fn cell(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "true",
        Some(false) => "false",
        None => "",
    }
}

/// Write `index,date,entry,exit` rows, one per bar.
pub fn write_signals<W: io::Write>(
    writer: W,
    bars: &[Bar],
    signals: &Signals,
    policy: UndefinedPolicy,
) -> Result<(), BarsignalError> {
    let entry = signals.entry.collapse(policy);
    let exit = signals.exit.collapse(policy);

    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["index", "date", "entry", "exit"])
        .map_err(io::Error::from)?;
    for (i, bar) in bars.iter().enumerate() {
        let date = bar.date.map(|d| d.to_string()).unwrap_or_default();
        let index = i.to_string();
        let row = [
            index.as_str(),
            date.as_str(),
            cell(entry.get(i).copied().flatten()),
            cell(exit.get(i).copied().flatten()),
        ];
        wtr.write_record(row).map_err(io::Error::from)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Where a [`CsvSignalWriter`] sends its rows.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalTarget {
    Stdout,
    File(PathBuf),
    /// One `<instrument>.csv` per instrument.
    Directory(PathBuf),
}

pub struct CsvSignalWriter {
    target: SignalTarget,
}

impl CsvSignalWriter {
    pub fn new(target: SignalTarget) -> Self {
        Self { target }
    }
}

impl SignalSink for CsvSignalWriter {
    fn write(
        &self,
        instrument: &str,
        bars: &[Bar],
        signals: &Signals,
        policy: UndefinedPolicy,
    ) -> Result<(), BarsignalError> {
        let path = match &self.target {
            SignalTarget::Stdout => {
                return write_signals(io::stdout().lock(), bars, signals, policy);
            }
            SignalTarget::File(path) => path.clone(),
            SignalTarget::Directory(dir) => {
                fs::create_dir_all(dir)?;
                dir.join(format!("{instrument}.csv"))
            }
        };
        write_signals(File::create(&path)?, bars, signals, policy)?;
        tracing::info!(instrument, path = %path.display(), "wrote signals");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::{Signal, SignalSeries};
    use tempfile::TempDir;

    const SAMPLE: &str = "date,open,high,low,close,volume\n\
        2024-01-16,105.0,115.0,100.0,110.0,60000\n\
        2024-01-15,100.0,110.0,90.0,105.0,50000\n\
        2024-01-17,110.0,120.0,105.0,115.0,55000\n";

    #[test]
    fn read_bars_sorts_by_date() {
        let bars = read_bars(SAMPLE.as_bytes(), "sample").unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].high, 110.0);
        assert_eq!(bars[0].low, 90.0);
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[0].volume, 50000.0);
        assert_eq!(bars[2].close, 115.0);
    }

    #[test]
    fn columns_by_header_without_date() {
        let csv = "Volume,Close,Low,High,Open,extra\n10,4,1,5,2,x\n20,6,3,7,4,y\n";
        let bars = read_bars(csv.as_bytes(), "nodate").unwrap();
        assert_eq!(bars, vec![Bar::new(2.0, 5.0, 1.0, 4.0, 10.0), Bar::new(4.0, 7.0, 3.0, 6.0, 20.0)]);
    }

    #[test]
    fn missing_column_is_data_error() {
        let err = read_bars("open,high,low,close\n1,2,3,4\n".as_bytes(), "bad").unwrap_err();
        match err {
            BarsignalError::Data { source_name, reason } => {
                assert_eq!(source_name, "bad");
                assert!(reason.contains("volume"), "{reason}");
            }
            other => panic!("expected Data error, got {other:?}"),
        }
    }

    #[test]
    fn bad_number_reports_row() {
        let csv = "open,high,low,close,volume\n1,2,3,4,5\n1,2,x,4,5\n";
        let err = read_bars(csv.as_bytes(), "bad").unwrap_err();
        assert!(err.to_string().contains("row 2"), "{err}");
    }

    #[test]
    fn bad_date_is_data_error() {
        let csv = "date,open,high,low,close,volume\n15/01/2024,1,2,3,4,5\n";
        assert!(matches!(
            read_bars(csv.as_bytes(), "bad"),
            Err(BarsignalError::Data { .. })
        ));
    }

    #[test]
    fn header_only_is_empty() {
        let bars = read_bars("open,high,low,close,volume\n".as_bytes(), "empty").unwrap();
        assert!(bars.is_empty());
    }

    #[test]
    fn source_fetches_by_instrument() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("BHP.csv");
        fs::write(&path, SAMPLE).unwrap();
        let source = CsvBarSource::new(vec![("BHP".into(), path)]);

        assert_eq!(source.list_instruments(), vec!["BHP".to_string()]);
        assert_eq!(source.fetch_bars("BHP").unwrap().len(), 3);
        assert!(matches!(
            source.fetch_bars("CBA"),
            Err(BarsignalError::Data { .. })
        ));
    }

    #[test]
    fn missing_file_is_data_error() {
        let source = CsvBarSource::new(vec![("X".into(), PathBuf::from("/nonexistent/X.csv"))]);
        assert!(matches!(
            source.fetch_bars("X"),
            Err(BarsignalError::Data { .. })
        ));
    }

    fn sample_signals() -> Signals {
        Signals {
            entry: SignalSeries::new(vec![Signal::Undefined, Signal::True]),
            exit: SignalSeries::new(vec![Signal::False, Signal::Undefined]),
            domain_errors: vec![],
        }
    }

    #[test]
    fn write_signals_keep_leaves_blank_cells() {
        let mut bars = vec![Bar::new(1.0, 1.0, 1.0, 1.0, 1.0); 2];
        bars[0].date = NaiveDate::from_ymd_opt(2024, 3, 1);
        let mut out = Vec::new();
        write_signals(&mut out, &bars, &sample_signals(), UndefinedPolicy::Keep).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "index,date,entry,exit\n0,2024-03-01,,false\n1,,true,\n"
        );
    }

    #[test]
    fn write_signals_false_policy() {
        let bars = vec![Bar::new(1.0, 1.0, 1.0, 1.0, 1.0); 2];
        let mut out = Vec::new();
        write_signals(&mut out, &bars, &sample_signals(), UndefinedPolicy::False).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "index,date,entry,exit\n0,,false,false\n1,,true,false\n"
        );
    }

    #[test]
    fn directory_target_writes_per_instrument() {
        let dir = TempDir::new().unwrap();
        let out_dir = dir.path().join("out");
        let writer = CsvSignalWriter::new(SignalTarget::Directory(out_dir.clone()));
        let bars = vec![Bar::new(1.0, 1.0, 1.0, 1.0, 1.0); 2];
        writer
            .write("AAA", &bars, &sample_signals(), UndefinedPolicy::False)
            .unwrap();
        let text = fs::read_to_string(out_dir.join("AAA.csv")).unwrap();
        assert!(text.starts_with("index,date,entry,exit\n"));
    }
}
