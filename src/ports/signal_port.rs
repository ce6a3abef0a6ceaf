//! Signal output port.

use crate::domain::error::BarsignalError;
use crate::domain::eval::Signals;
use crate::domain::ohlcv::Bar;
use crate::domain::signal::UndefinedPolicy;

/// Port for writing evaluated signals next to the bars they were computed on.
pub trait SignalSink {
    fn write(
        &self,
        instrument: &str,
        bars: &[Bar],
        signals: &Signals,
        policy: UndefinedPolicy,
    ) -> Result<(), BarsignalError>;
}
