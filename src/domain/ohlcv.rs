//! OHLCV candle and price series types.

use chrono::{DateTime, Utc};

/// Candle timeframe for a continuously traded (24/7) market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeframe {
    M5,
    M15,
    H1,
    H4,
    D1,
}

impl Timeframe {
    pub fn bars_per_year(&self) -> f64 {
        match self {
            Timeframe::M5 => 105_120.0,
            Timeframe::M15 => 35_040.0,
            Timeframe::H1 => 8_760.0,
            Timeframe::H4 => 2_190.0,
            Timeframe::D1 => 365.0,
        }
    }

    /// Minimum trade count a backtest window must produce before its
    /// metrics are considered statistically meaningful. Coarser timeframes
    /// produce fewer bars, so they require fewer trades.
    pub fn default_min_trades(&self) -> usize {
        match self {
            Timeframe::M5 => 40,
            Timeframe::M15 => 30,
            Timeframe::H1 => 20,
            Timeframe::H4 => 12,
            Timeframe::D1 => 8,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }

    pub fn parse(s: &str) -> Option<Timeframe> {
        match s {
            "5m" => Some(Timeframe::M5),
            "15m" => Some(Timeframe::M15),
            "1h" => Some(Timeframe::H1),
            "4h" => Some(Timeframe::H4),
            "1d" => Some(Timeframe::D1),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Candle {
    pub ts: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

/// Immutable, time-ordered candle history for one instrument.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub candles: Vec<Candle>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe, candles: Vec<Candle>) -> Self {
        PriceSeries {
            symbol: symbol.into(),
            timeframe,
            candles,
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// First `fraction` of the series (expanding-window prefix).
    pub fn prefix(&self, fraction: f64) -> PriceSeries {
        let bars = ((self.candles.len() as f64) * fraction).round() as usize;
        let bars = bars.min(self.candles.len());
        PriceSeries {
            symbol: self.symbol.clone(),
            timeframe: self.timeframe,
            candles: self.candles[..bars].to_vec(),
        }
    }

    /// Last `bars` candles (or the whole series when shorter).
    pub fn tail(&self, bars: usize) -> &[Candle] {
        let start = self.candles.len().saturating_sub(bars);
        &self.candles[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_candle() -> Candle {
        Candle {
            ts: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            open: 100.0,
            high: 110.0,
            low: 90.0,
            close: 105.0,
            volume: 50_000.0,
        }
    }

    fn sample_series(n: usize) -> PriceSeries {
        let candles = (0..n)
            .map(|i| Candle {
                ts: Utc.timestamp_opt(1_700_000_000 + i as i64 * 300, 0).unwrap(),
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.0,
                volume: 1.0,
            })
            .collect();
        PriceSeries::new("BTCUSDT", Timeframe::M5, candles)
    }

    #[test]
    fn true_range_hl_dominates() {
        let c = sample_candle();
        // high-low=20, |110-100|=10, |90-100|=10 → 20
        assert!((c.true_range(100.0) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let c = sample_candle();
        // |110-70|=40 dominates
        assert!((c.true_range(70.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bars_per_year_continuous_market() {
        assert!((Timeframe::M5.bars_per_year() - 105_120.0).abs() < f64::EPSILON);
        assert!((Timeframe::D1.bars_per_year() - 365.0).abs() < f64::EPSILON);
    }

    #[test]
    fn coarser_timeframes_require_fewer_trades() {
        assert!(Timeframe::M5.default_min_trades() > Timeframe::H1.default_min_trades());
        assert!(Timeframe::H1.default_min_trades() > Timeframe::D1.default_min_trades());
    }

    #[test]
    fn timeframe_parse_round_trip() {
        for tf in [
            Timeframe::M5,
            Timeframe::M15,
            Timeframe::H1,
            Timeframe::H4,
            Timeframe::D1,
        ] {
            assert_eq!(Timeframe::parse(tf.label()), Some(tf));
        }
        assert_eq!(Timeframe::parse("2h"), None);
    }

    #[test]
    fn prefix_takes_leading_fraction() {
        let series = sample_series(100);
        assert_eq!(series.prefix(0.25).len(), 25);
        assert_eq!(series.prefix(1.0).len(), 100);
        assert_eq!(series.prefix(0.0).len(), 0);
    }

    #[test]
    fn tail_returns_trailing_bars() {
        let series = sample_series(100);
        assert_eq!(series.tail(30).len(), 30);
        assert_eq!(series.tail(500).len(), 100);
        assert_eq!(series.tail(30)[0].ts, series.candles[70].ts);
    }
}
