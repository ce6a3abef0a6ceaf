//! Bar data access port.

use crate::domain::error::BarsignalError;
use crate::domain::ohlcv::Bar;

pub trait BarSource {
    /// Bars for `instrument`, oldest first.
    fn fetch_bars(&self, instrument: &str) -> Result<Vec<Bar>, BarsignalError>;

    fn list_instruments(&self) -> Vec<String>;
}
