#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Mutex;
use stratgate::domain::ohlcv::{Candle, PriceSeries, Timeframe};
use stratgate::domain::parameter_space::StrategyClass;
use stratgate::domain::signal::{Direction, InstrumentMeta, Signal, SignalStrategy};
use stratgate::domain::simulator::SimConfig;
use stratgate::domain::strategy::Status;
use stratgate::ports::event_port::EventPort;

/// Periodic wiggle layered over a steady drift so per-trade returns vary
/// but stay positive over multi-bar holds.
pub const WIGGLE: [f64; 7] = [0.0, 0.8, 0.3, 1.0, 0.5, 1.2, 0.2];

pub fn ts(i: usize) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + i as i64 * 300, 0).unwrap()
}

pub fn series_with(symbol: &str, n: usize, f: impl Fn(usize) -> f64) -> PriceSeries {
    let candles = (0..n)
        .map(|i| {
            let close = f(i);
            Candle {
                ts: ts(i),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1.0,
            }
        })
        .collect();
    PriceSeries::new(symbol, Timeframe::M5, candles)
}

pub fn drift_series(symbol: &str, n: usize) -> PriceSeries {
    series_with(symbol, n, |i| {
        100.0 + 0.15 * i as f64 + WIGGLE[i % WIGGLE.len()]
    })
}

pub fn flat_series(symbol: &str, n: usize) -> PriceSeries {
    series_with(symbol, n, |_| 100.0)
}

pub fn no_friction_sim() -> SimConfig {
    SimConfig {
        fee_rate: 0.0,
        slippage_rate: 0.0,
        ..SimConfig::default()
    }
}

pub fn single_universe(series: PriceSeries) -> Vec<(InstrumentMeta, PriceSeries)> {
    let meta = InstrumentMeta::new(series.symbol.clone());
    vec![(meta, series)]
}

/// Goes long whenever the latest close exceeds the previous one; the
/// simplest order-dependent signal.
pub struct DriftMomentum {
    hash: String,
    indicators: usize,
}

impl DriftMomentum {
    pub fn new() -> Self {
        Self::with_indicators(1)
    }

    pub fn with_indicators(indicators: usize) -> Self {
        DriftMomentum {
            hash: format!("hash-drift-momentum-{indicators}"),
            indicators,
        }
    }
}

impl SignalStrategy for DriftMomentum {
    fn id(&self) -> &str {
        "drift-momentum"
    }

    fn base_code_hash(&self) -> &str {
        &self.hash
    }

    fn universe(&self) -> &[String] {
        &[]
    }

    fn class(&self) -> StrategyClass {
        StrategyClass::CloseTimeBased {
            target_magnitude: 0.02,
            holding_period_bars: 10,
            atr_at_signal: None,
        }
    }

    fn indicator_count(&self) -> usize {
        self.indicators
    }

    fn warmup_bars(&self) -> usize {
        2
    }

    fn signal(&self, window: &[Candle]) -> Option<Signal> {
        let n = window.len();
        if n >= 2 && window[n - 1].close > window[n - 2].close {
            Some(Signal {
                direction: Direction::Long,
                size_hint: 1.0,
                stop_loss: 0.0,
                take_profit: 0.0,
                reason: "up bar".into(),
            })
        } else {
            None
        }
    }
}

/// Fires on every n-th window length, ignoring the data entirely; its
/// signal sequence is invariant under row shuffling.
pub struct EveryNthBar {
    hash: String,
    n: usize,
}

impl EveryNthBar {
    pub fn new(n: usize) -> Self {
        EveryNthBar {
            hash: format!("hash-every-{n}"),
            n,
        }
    }
}

impl SignalStrategy for EveryNthBar {
    fn id(&self) -> &str {
        "every-nth-bar"
    }

    fn base_code_hash(&self) -> &str {
        &self.hash
    }

    fn universe(&self) -> &[String] {
        &[]
    }

    fn class(&self) -> StrategyClass {
        StrategyClass::CloseTimeBased {
            target_magnitude: 0.02,
            holding_period_bars: 10,
            atr_at_signal: None,
        }
    }

    fn indicator_count(&self) -> usize {
        1
    }

    fn warmup_bars(&self) -> usize {
        2
    }

    fn signal(&self, window: &[Candle]) -> Option<Signal> {
        if window.len() % self.n == 0 {
            Some(Signal {
                direction: Direction::Long,
                size_hint: 1.0,
                stop_loss: 0.0,
                take_profit: 0.0,
                reason: "cadence".into(),
            })
        } else {
            None
        }
    }
}

/// Collects every status transition for assertion.
#[derive(Default)]
pub struct RecordingEvents {
    pub statuses: Mutex<Vec<(String, Status)>>,
    pub pool_changes: Mutex<Vec<(String, bool, Option<String>)>>,
}

impl RecordingEvents {
    pub fn new() -> Self {
        RecordingEvents::default()
    }

    pub fn status_history(&self) -> Vec<Status> {
        self.statuses
            .lock()
            .map(|v| v.iter().map(|(_, s)| *s).collect())
            .unwrap_or_default()
    }
}

impl EventPort for RecordingEvents {
    fn status_changed(&self, strategy_id: &str, status: Status) {
        if let Ok(mut statuses) = self.statuses.lock() {
            statuses.push((strategy_id.to_string(), status));
        }
    }

    fn pool_changed(&self, strategy_id: &str, admitted: bool, evicted: Option<&str>) {
        if let Ok(mut changes) = self.pool_changes.lock() {
            changes.push((strategy_id.to_string(), admitted, evicted.map(String::from)));
        }
    }
}
