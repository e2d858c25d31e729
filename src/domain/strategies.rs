//! Built-in reference strategies.
//!
//! Production strategy code arrives from an external generator through
//! [`SignalStrategy`]; these two implementations exist for the CLI and
//! for exercising the pipeline end to end.

use crate::domain::ohlcv::Candle;
use crate::domain::parameter_space::StrategyClass;
use crate::domain::signal::{Direction, Signal, SignalStrategy};

/// Long when the latest close breaks above the highest close of the
/// previous `lookback` bars.
pub struct MomentumBreakout {
    id: String,
    hash: String,
    universe: Vec<String>,
    lookback: usize,
}

impl MomentumBreakout {
    pub fn new(universe: Vec<String>, lookback: usize) -> Self {
        MomentumBreakout {
            id: format!("momentum-breakout-{lookback}"),
            hash: format!("mbrk:{lookback}"),
            universe,
            lookback,
        }
    }
}

impl SignalStrategy for MomentumBreakout {
    fn id(&self) -> &str {
        &self.id
    }

    fn base_code_hash(&self) -> &str {
        &self.hash
    }

    fn universe(&self) -> &[String] {
        &self.universe
    }

    fn class(&self) -> StrategyClass {
        StrategyClass::Generic
    }

    fn indicator_count(&self) -> usize {
        1
    }

    fn warmup_bars(&self) -> usize {
        self.lookback + 1
    }

    fn signal(&self, window: &[Candle]) -> Option<Signal> {
        let n = window.len();
        if n < self.lookback + 1 {
            return None;
        }
        let last = window[n - 1].close;
        let prior_high = window[n - 1 - self.lookback..n - 1]
            .iter()
            .map(|c| c.close)
            .fold(f64::MIN, f64::max);
        if last > prior_high {
            Some(Signal {
                direction: Direction::Long,
                size_hint: 1.0,
                stop_loss: 0.0,
                take_profit: 0.0,
                reason: format!("close {last:.4} above {}-bar high", self.lookback),
            })
        } else {
            None
        }
    }
}

/// Fades stretches away from the simple moving average: long below the
/// band, short above it.
pub struct MeanReversion {
    id: String,
    hash: String,
    universe: Vec<String>,
    lookback: usize,
    band_pct: f64,
}

impl MeanReversion {
    pub fn new(universe: Vec<String>, lookback: usize, band_pct: f64) -> Self {
        MeanReversion {
            id: format!("mean-reversion-{lookback}"),
            hash: format!("mrev:{lookback}:{band_pct}"),
            universe,
            lookback,
            band_pct,
        }
    }
}

impl SignalStrategy for MeanReversion {
    fn id(&self) -> &str {
        &self.id
    }

    fn base_code_hash(&self) -> &str {
        &self.hash
    }

    fn universe(&self) -> &[String] {
        &self.universe
    }

    fn class(&self) -> StrategyClass {
        StrategyClass::Generic
    }

    fn indicator_count(&self) -> usize {
        2
    }

    fn warmup_bars(&self) -> usize {
        self.lookback
    }

    fn signal(&self, window: &[Candle]) -> Option<Signal> {
        let n = window.len();
        if n < self.lookback {
            return None;
        }
        let sma: f64 = window[n - self.lookback..]
            .iter()
            .map(|c| c.close)
            .sum::<f64>()
            / self.lookback as f64;
        let last = window[n - 1].close;
        if last < sma * (1.0 - self.band_pct) {
            Some(Signal {
                direction: Direction::Long,
                size_hint: 1.0,
                stop_loss: 0.0,
                take_profit: 0.0,
                reason: format!("close {last:.4} below sma band"),
            })
        } else if last > sma * (1.0 + self.band_pct) {
            Some(Signal {
                direction: Direction::Short,
                size_hint: 1.0,
                stop_loss: 0.0,
                take_profit: 0.0,
                reason: format!("close {last:.4} above sma band"),
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn candles(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                ts: Utc.timestamp_opt(1_700_000_000 + i as i64 * 300, 0).unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1.0,
            })
            .collect()
    }

    #[test]
    fn breakout_fires_on_new_high() {
        let strategy = MomentumBreakout::new(vec!["BTCUSDT".into()], 3);
        let window = candles(&[100.0, 101.0, 99.0, 102.0]);
        let signal = strategy.signal(&window).expect("new high should fire");
        assert_eq!(signal.direction, Direction::Long);
    }

    #[test]
    fn breakout_silent_inside_range() {
        let strategy = MomentumBreakout::new(vec!["BTCUSDT".into()], 3);
        let window = candles(&[100.0, 101.0, 99.0, 100.5]);
        assert!(strategy.signal(&window).is_none());
    }

    #[test]
    fn breakout_silent_during_warmup() {
        let strategy = MomentumBreakout::new(vec!["BTCUSDT".into()], 5);
        let window = candles(&[100.0, 101.0]);
        assert!(strategy.signal(&window).is_none());
    }

    #[test]
    fn mean_reversion_longs_below_band() {
        let strategy = MeanReversion::new(vec!["BTCUSDT".into()], 4, 0.02);
        let window = candles(&[100.0, 100.0, 100.0, 90.0]);
        let signal = strategy.signal(&window).expect("stretch below band");
        assert_eq!(signal.direction, Direction::Long);
    }

    #[test]
    fn mean_reversion_shorts_above_band() {
        let strategy = MeanReversion::new(vec!["BTCUSDT".into()], 4, 0.02);
        let window = candles(&[100.0, 100.0, 100.0, 112.0]);
        let signal = strategy.signal(&window).expect("stretch above band");
        assert_eq!(signal.direction, Direction::Short);
    }

    #[test]
    fn mean_reversion_silent_inside_band() {
        let strategy = MeanReversion::new(vec!["BTCUSDT".into()], 4, 0.02);
        let window = candles(&[100.0, 100.0, 100.0, 100.5]);
        assert!(strategy.signal(&window).is_none());
    }

    #[test]
    fn hashes_distinguish_code_variants() {
        let a = MomentumBreakout::new(vec![], 3);
        let b = MomentumBreakout::new(vec![], 5);
        assert_ne!(a.base_code_hash(), b.base_code_hash());
    }
}
