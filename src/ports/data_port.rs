//! Price data access port trait.

use crate::domain::error::StratgateError;
use crate::domain::ohlcv::{PriceSeries, Timeframe};
use crate::domain::signal::InstrumentMeta;

pub trait DataPort {
    fn fetch_series(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<PriceSeries, StratgateError>;

    fn instrument_meta(&self, symbol: &str) -> Result<InstrumentMeta, StratgateError>;

    fn list_symbols(&self) -> Result<Vec<String>, StratgateError>;
}
