#![allow(dead_code)]

use barsignal::domain::error::BarsignalError;
pub use barsignal::domain::ohlcv::Bar;
use barsignal::ports::data_port::BarSource;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::io::Write;

pub struct MockBarSource {
    pub data: HashMap<String, Vec<Bar>>,
    pub order: Vec<String>,
}

impl MockBarSource {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn with_bars(mut self, instrument: &str, bars: Vec<Bar>) -> Self {
        self.order.push(instrument.to_string());
        self.data.insert(instrument.to_string(), bars);
        self
    }
}

impl BarSource for MockBarSource {
    fn fetch_bars(&self, instrument: &str) -> Result<Vec<Bar>, BarsignalError> {
        self.data
            .get(instrument)
            .cloned()
            .ok_or_else(|| BarsignalError::Data {
                source_name: instrument.to_string(),
                reason: "no such instrument".into(),
            })
    }

    fn list_instruments(&self) -> Vec<String> {
        self.order.clone()
    }
}

/// Bars with every price field equal to `close` and constant volume.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .map(|&c| Bar::new(c, c, c, c, 1000.0))
        .collect()
}

pub fn make_bar(day: u32, close: f64, volume: f64) -> Bar {
    Bar {
        date: NaiveDate::from_ymd_opt(2024, 1, 1).map(|d| d + chrono::Days::new(day as u64)),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume,
    }
}

/// Render bars as a CSV file body with a date column.
pub fn bars_csv(bars: &[Bar]) -> String {
    let mut out = String::from("date,open,high,low,close,volume\n");
    for bar in bars {
        let date = bar.date.map(|d| d.to_string()).unwrap_or_default();
        out.push_str(&format!(
            "{date},{},{},{},{},{}\n",
            bar.open, bar.high, bar.low, bar.close, bar.volume
        ));
    }
    out
}

pub fn write_file(dir: &std::path::Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

/// 25 bars, flat at 100 with low volume, then bar 24 jumps to 110 on high volume.
pub fn breakout_bars() -> Vec<Bar> {
    let mut bars: Vec<Bar> = (0..24).map(|d| make_bar(d, 100.0, 500_000.0)).collect();
    bars.push(make_bar(24, 110.0, 2_000_000.0));
    bars
}

/// Rises by 1 for 15 bars, then falls by 4.7 per bar; RSI(14) first drops
/// below 30 at bar 20.
pub fn rsi_collapse_closes() -> Vec<f64> {
    (0..25)
        .map(|i| {
            if i <= 14 {
                100.0 + i as f64
            } else {
                114.0 - 4.7 * (i - 14) as f64
            }
        })
        .collect()
}
