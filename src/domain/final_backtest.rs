//! Full-fidelity in-sample / out-of-sample backtest of the chosen combo.
//!
//! Re-simulates the optimizer's winning parameters with the portfolio
//! simulator over the strategy's whole universe, once per window. The
//! in-sample gate failing is fatal; out-of-sample failures (including
//! excessive Sharpe degradation) are soft.

use tracing::debug;

use crate::domain::metrics::{MetricsConfig, MetricsSet, compute_metrics};
use crate::domain::ohlcv::{PriceSeries, Timeframe};
use crate::domain::parameter_space::ParameterCombo;
use crate::domain::signal::{InstrumentMeta, SignalStrategy};
use crate::domain::simulator::{SimConfig, simulate_portfolio};
use crate::domain::thresholds::{GateFailure, ThresholdConfig, check_thresholds};

#[derive(Debug, Clone)]
pub struct FinalBacktestConfig {
    /// Leading fraction of every series used as the in-sample window; the
    /// remainder is out-of-sample.
    pub is_fraction: f64,
    /// Maximum tolerated `(is_sharpe - oos_sharpe) / is_sharpe`.
    pub max_degradation: f64,
    /// OOS trade-count floor as a fraction of the in-sample floor; the
    /// OOS window is shorter, so it is allowed fewer trades.
    pub oos_min_trades_factor: f64,
}

impl Default for FinalBacktestConfig {
    fn default() -> Self {
        FinalBacktestConfig {
            is_fraction: 0.7,
            max_degradation: 0.50,
            oos_min_trades_factor: 0.4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FinalBacktestReport {
    pub is_metrics: MetricsSet,
    pub oos_metrics: MetricsSet,
    pub degradation: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BacktestFailure {
    /// Fatal: the combo does not even hold up on the data it was fitted on.
    InSample(GateFailure),
    /// Soft: fitted edge does not generalize.
    OutOfSample(GateFailure),
    /// Soft: OOS Sharpe fell too far below IS Sharpe.
    Degradation { degradation: f64 },
}

/// Sharpe degradation from in-sample to out-of-sample.
pub fn sharpe_degradation(is_sharpe: f64, oos_sharpe: f64) -> f64 {
    if is_sharpe <= 0.0 {
        return 1.0;
    }
    (is_sharpe - oos_sharpe) / is_sharpe
}

pub fn run_final_backtest(
    data: &[(InstrumentMeta, PriceSeries)],
    strategy: &dyn SignalStrategy,
    combo: &ParameterCombo,
    sim_config: &SimConfig,
    thresholds: &ThresholdConfig,
    metrics_config: &MetricsConfig,
    config: &FinalBacktestConfig,
) -> Result<FinalBacktestReport, BacktestFailure> {
    let timeframe = data
        .first()
        .map(|(_, series)| series.timeframe)
        .unwrap_or(Timeframe::H1);

    let mut is_data: Vec<(InstrumentMeta, PriceSeries)> = Vec::with_capacity(data.len());
    let mut oos_data: Vec<(InstrumentMeta, PriceSeries)> = Vec::with_capacity(data.len());
    for (meta, series) in data {
        let split = ((series.len() as f64) * config.is_fraction).round() as usize;
        let split = split.min(series.len());
        is_data.push((
            meta.clone(),
            PriceSeries::new(&series.symbol, series.timeframe, series.candles[..split].to_vec()),
        ));
        oos_data.push((
            meta.clone(),
            PriceSeries::new(&series.symbol, series.timeframe, series.candles[split..].to_vec()),
        ));
    }

    let is_result = simulate_portfolio(&is_data, strategy, combo, sim_config);
    let is_metrics = compute_metrics(&is_result, timeframe, metrics_config);
    check_thresholds(&is_metrics, thresholds).map_err(BacktestFailure::InSample)?;

    let oos_thresholds = ThresholdConfig {
        min_trades: ((thresholds.min_trades as f64) * config.oos_min_trades_factor).ceil()
            as usize,
        ..thresholds.clone()
    };
    let oos_result = simulate_portfolio(&oos_data, strategy, combo, sim_config);
    let oos_metrics = compute_metrics(&oos_result, timeframe, metrics_config);
    check_thresholds(&oos_metrics, &oos_thresholds).map_err(BacktestFailure::OutOfSample)?;

    let degradation = sharpe_degradation(is_metrics.sharpe, oos_metrics.sharpe);
    debug!(
        strategy = strategy.id(),
        is_sharpe = is_metrics.sharpe,
        oos_sharpe = oos_metrics.sharpe,
        degradation,
        "final backtest windows complete"
    );
    if degradation > config.max_degradation {
        return Err(BacktestFailure::Degradation { degradation });
    }

    Ok(FinalBacktestReport {
        is_metrics,
        oos_metrics,
        degradation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::Candle;
    use crate::domain::parameter_space::StrategyClass;
    use crate::domain::signal::{Direction, Signal};
    use chrono::{TimeZone, Utc};

    struct AlwaysLong;

    impl SignalStrategy for AlwaysLong {
        fn id(&self) -> &str {
            "always-long"
        }
        fn base_code_hash(&self) -> &str {
            "hash-always-long"
        }
        fn universe(&self) -> &[String] {
            &[]
        }
        fn class(&self) -> StrategyClass {
            StrategyClass::Generic
        }
        fn indicator_count(&self) -> usize {
            1
        }
        fn warmup_bars(&self) -> usize {
            2
        }
        fn signal(&self, _window: &[Candle]) -> Option<Signal> {
            Some(Signal {
                direction: Direction::Long,
                size_hint: 1.0,
                stop_loss: 0.0,
                take_profit: 0.0,
                reason: "always".into(),
            })
        }
    }

    const WIGGLE: [f64; 7] = [0.0, 0.8, 0.3, 1.0, 0.5, 1.2, 0.2];

    fn series_with(f: impl Fn(usize) -> f64, n: usize) -> PriceSeries {
        let candles = (0..n)
            .map(|i| {
                let close = f(i);
                Candle {
                    ts: Utc.timestamp_opt(1_700_000_000 + i as i64 * 300, 0).unwrap(),
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: 1.0,
                }
            })
            .collect();
        PriceSeries::new("TEST", Timeframe::M5, candles)
    }

    fn drift(n: usize) -> PriceSeries {
        series_with(|i| 100.0 + 0.15 * i as f64 + WIGGLE[i % WIGGLE.len()], n)
    }

    fn no_friction() -> SimConfig {
        SimConfig {
            fee_rate: 0.0,
            slippage_rate: 0.0,
            ..SimConfig::default()
        }
    }

    fn combo() -> ParameterCombo {
        ParameterCombo {
            stop_loss_pct: 0.02,
            take_profit_pct: 0.0,
            leverage: 2.0,
            exit_timeout_bars: 12,
        }
    }

    #[test]
    fn degradation_formula() {
        assert!((sharpe_degradation(2.5, 2.25) - 0.1).abs() < 1e-9);
        assert!((sharpe_degradation(4.0, 1.5) - 0.625).abs() < 1e-9);
    }

    #[test]
    fn degradation_saturates_on_nonpositive_is_sharpe() {
        assert!((sharpe_degradation(0.0, 1.0) - 1.0).abs() < f64::EPSILON);
        assert!((sharpe_degradation(-1.0, 1.0) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn consistent_trend_passes_both_windows() {
        let data = vec![(InstrumentMeta::new("TEST"), drift(2_000))];
        let report = run_final_backtest(
            &data,
            &AlwaysLong,
            &combo(),
            &no_friction(),
            &ThresholdConfig::for_timeframe(Timeframe::M5),
            &MetricsConfig::default(),
            &FinalBacktestConfig::default(),
        )
        .expect("consistent uptrend should pass both windows");
        assert!(report.is_metrics.total_trades >= 40);
        assert!(report.degradation <= 0.50);
    }

    #[test]
    fn flat_in_sample_window_is_fatal() {
        // Flat for the IS window, trending afterwards.
        let data = vec![(
            InstrumentMeta::new("TEST"),
            series_with(
                |i| {
                    if i < 1_400 {
                        100.0
                    } else {
                        100.0 + 0.2 * (i - 1_400) as f64
                    }
                },
                2_000,
            ),
        )];
        let err = run_final_backtest(
            &data,
            &AlwaysLong,
            &combo(),
            &no_friction(),
            &ThresholdConfig::for_timeframe(Timeframe::M5),
            &MetricsConfig::default(),
            &FinalBacktestConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, BacktestFailure::InSample(_)));
    }

    #[test]
    fn edge_vanishing_out_of_sample_is_soft() {
        // Trending IS, dead-flat OOS: no OOS trades clear the floor.
        let data = vec![(
            InstrumentMeta::new("TEST"),
            series_with(
                |i| {
                    if i < 1_400 {
                        100.0 + 0.15 * i as f64 + WIGGLE[i % WIGGLE.len()]
                    } else {
                        310.0
                    }
                },
                2_000,
            ),
        )];
        let err = run_final_backtest(
            &data,
            &AlwaysLong,
            &combo(),
            &no_friction(),
            &ThresholdConfig::for_timeframe(Timeframe::M5),
            &MetricsConfig::default(),
            &FinalBacktestConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            BacktestFailure::OutOfSample(_) | BacktestFailure::Degradation { .. }
        ));
    }

    #[test]
    fn oos_trade_floor_is_scaled_down() {
        let config = FinalBacktestConfig::default();
        let thresholds = ThresholdConfig::for_timeframe(Timeframe::M5);
        let oos_floor =
            ((thresholds.min_trades as f64) * config.oos_min_trades_factor).ceil() as usize;
        assert_eq!(oos_floor, 16);
    }
}
