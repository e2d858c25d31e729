//! CSV file data adapter.
//!
//! Expects one file per (symbol, timeframe) named `SYMBOL_TF.csv` with
//! columns `timestamp,open,high,low,close,volume` (unix seconds), plus an
//! optional `instruments.csv` with per-symbol exchange metadata.

use crate::domain::error::StratgateError;
use crate::domain::ohlcv::{Candle, PriceSeries, Timeframe};
use crate::domain::signal::InstrumentMeta;
use crate::ports::data_port::DataPort;
use chrono::{TimeZone, Utc};
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn series_path(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.base_path
            .join(format!("{}_{}.csv", symbol, timeframe.label()))
    }

    fn data_err(reason: String) -> StratgateError {
        StratgateError::Data { reason }
    }
}

fn field<'r>(
    record: &'r csv::StringRecord,
    index: usize,
    name: &str,
) -> Result<&'r str, StratgateError> {
    record.get(index).ok_or_else(|| StratgateError::Data {
        reason: format!("missing {name} column"),
    })
}

fn numeric(record: &csv::StringRecord, index: usize, name: &str) -> Result<f64, StratgateError> {
    field(record, index, name)?
        .trim()
        .parse()
        .map_err(|e| StratgateError::Data {
            reason: format!("invalid {name} value: {e}"),
        })
}

impl DataPort for CsvAdapter {
    fn fetch_series(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<PriceSeries, StratgateError> {
        let path = self.series_path(symbol, timeframe);
        if !path.exists() {
            return Err(StratgateError::NoData {
                symbol: symbol.to_string(),
                timeframe: timeframe.label().to_string(),
            });
        }

        let mut reader = csv::Reader::from_path(&path).map_err(|e| {
            Self::data_err(format!("failed to open {}: {e}", path.display()))
        })?;

        let mut candles = Vec::new();
        for result in reader.records() {
            let record =
                result.map_err(|e| Self::data_err(format!("CSV parse error: {e}")))?;

            let ts_secs: i64 = field(&record, 0, "timestamp")?
                .trim()
                .parse()
                .map_err(|e| Self::data_err(format!("invalid timestamp: {e}")))?;
            let ts = Utc
                .timestamp_opt(ts_secs, 0)
                .single()
                .ok_or_else(|| Self::data_err(format!("timestamp {ts_secs} out of range")))?;

            let candle = Candle {
                ts,
                open: numeric(&record, 1, "open")?,
                high: numeric(&record, 2, "high")?,
                low: numeric(&record, 3, "low")?,
                close: numeric(&record, 4, "close")?,
                volume: numeric(&record, 5, "volume")?,
            };
            if candle.high < candle.low {
                return Err(Self::data_err(format!(
                    "bar at {ts} has high below low"
                )));
            }
            candles.push(candle);
        }

        candles.sort_by_key(|c| c.ts);
        Ok(PriceSeries::new(symbol, timeframe, candles))
    }

    fn instrument_meta(&self, symbol: &str) -> Result<InstrumentMeta, StratgateError> {
        let path = self.base_path.join("instruments.csv");
        if !path.exists() {
            return Ok(InstrumentMeta::new(symbol));
        }

        let mut reader = csv::Reader::from_path(&path).map_err(|e| {
            Self::data_err(format!("failed to open {}: {e}", path.display()))
        })?;
        for result in reader.records() {
            let record =
                result.map_err(|e| Self::data_err(format!("CSV parse error: {e}")))?;
            if field(&record, 0, "symbol")? != symbol {
                continue;
            }
            return Ok(InstrumentMeta {
                symbol: symbol.to_string(),
                max_leverage: numeric(&record, 1, "max_leverage")?,
                min_notional: numeric(&record, 2, "min_notional")?,
                is_tradable: matches!(
                    field(&record, 3, "is_tradable")?.trim().to_lowercase().as_str(),
                    "true" | "yes" | "1"
                ),
            });
        }
        Ok(InstrumentMeta::new(symbol))
    }

    fn list_symbols(&self) -> Result<Vec<String>, StratgateError> {
        let entries = std::fs::read_dir(&self.base_path).map_err(|e| {
            Self::data_err(format!(
                "failed to read directory {}: {e}",
                self.base_path.display()
            ))
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| Self::data_err(format!("directory entry error: {e}")))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(stem) = name.strip_suffix(".csv") else {
                continue;
            };
            if stem == "instruments" {
                continue;
            }
            // SYMBOL_TF.csv; anything without a timeframe suffix is skipped.
            if let Some((symbol, tf)) = stem.rsplit_once('_') {
                if Timeframe::parse(tf).is_some() && !symbols.contains(&symbol.to_string()) {
                    symbols.push(symbol.to_string());
                }
            }
        }
        symbols.sort();
        Ok(symbols)
    }
}
