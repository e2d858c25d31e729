//! Signal contract between strategy code and the simulator.
//!
//! Strategy logic is authored externally; this crate only sees it through
//! [`SignalStrategy`]: a pure function from a price-history window to an
//! optional trade signal, plus identity metadata used for caching and
//! parameter-space selection.

use crate::domain::ohlcv::Candle;
use crate::domain::parameter_space::StrategyClass;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

/// A trade signal emitted by strategy code.
///
/// `stop_loss` and `take_profit` are advisory hints from the strategy
/// author; the simulator always applies the parameter combo under test so
/// that optimization controls exits.
#[derive(Debug, Clone)]
pub struct Signal {
    pub direction: Direction,
    pub size_hint: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub reason: String,
}

/// The single contract strategy code must satisfy.
///
/// `signal` must be pure: same window in, same signal out. The base code
/// hash fingerprints the signal logic only (not parameters) and keys the
/// lookahead-test cache.
pub trait SignalStrategy: Send + Sync {
    fn id(&self) -> &str;
    fn base_code_hash(&self) -> &str;
    fn universe(&self) -> &[String];
    fn class(&self) -> StrategyClass;
    /// Number of distinct indicators the logic computes; feeds the
    /// simplicity term of the robustness score.
    fn indicator_count(&self) -> usize;
    /// Bars required before the first `signal` call makes sense.
    fn warmup_bars(&self) -> usize;
    fn signal(&self, window: &[Candle]) -> Option<Signal>;
}

/// Per-instrument exchange metadata.
#[derive(Debug, Clone)]
pub struct InstrumentMeta {
    pub symbol: String,
    pub max_leverage: f64,
    pub min_notional: f64,
    pub is_tradable: bool,
}

impl InstrumentMeta {
    pub fn new(symbol: impl Into<String>) -> Self {
        InstrumentMeta {
            symbol: symbol.into(),
            max_leverage: 20.0,
            min_notional: 10.0,
            is_tradable: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_sign() {
        assert!((Direction::Long.sign() - 1.0).abs() < f64::EPSILON);
        assert!((Direction::Short.sign() + 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn instrument_meta_defaults() {
        let meta = InstrumentMeta::new("BTCUSDT");
        assert_eq!(meta.symbol, "BTCUSDT");
        assert!((meta.max_leverage - 20.0).abs() < f64::EPSILON);
        assert!((meta.min_notional - 10.0).abs() < f64::EPSILON);
        assert!(meta.is_tradable);
    }
}
