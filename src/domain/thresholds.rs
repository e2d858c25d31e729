//! Pass/fail gate over a metrics set.

use crate::domain::metrics::MetricsSet;
use crate::domain::ohlcv::Timeframe;

#[derive(Debug, Clone)]
pub struct ThresholdConfig {
    pub min_sharpe: f64,
    pub min_win_rate: f64,
    pub min_expectancy: f64,
    pub max_drawdown: f64,
    pub min_trades: usize,
}

impl ThresholdConfig {
    /// Default minimums with the trade-count floor taken from the
    /// timeframe.
    pub fn for_timeframe(timeframe: Timeframe) -> Self {
        ThresholdConfig {
            min_sharpe: 0.3,
            min_win_rate: 0.35,
            min_expectancy: 0.002,
            max_drawdown: 0.50,
            min_trades: timeframe.default_min_trades(),
        }
    }
}

/// Which predicate rejected the metrics set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateFailure {
    Sharpe,
    WinRate,
    Expectancy,
    Drawdown,
    TradeCount,
}

impl std::fmt::Display for GateFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            GateFailure::Sharpe => "sharpe below minimum",
            GateFailure::WinRate => "win rate below minimum",
            GateFailure::Expectancy => "expectancy below minimum",
            GateFailure::Drawdown => "drawdown above cap",
            GateFailure::TradeCount => "too few trades",
        };
        f.write_str(label)
    }
}

/// All five predicates must hold; the first failing one is reported.
pub fn check_thresholds(
    metrics: &MetricsSet,
    config: &ThresholdConfig,
) -> Result<(), GateFailure> {
    if metrics.total_trades < config.min_trades {
        return Err(GateFailure::TradeCount);
    }
    if metrics.sharpe < config.min_sharpe {
        return Err(GateFailure::Sharpe);
    }
    if metrics.win_rate < config.min_win_rate {
        return Err(GateFailure::WinRate);
    }
    if metrics.expectancy < config.min_expectancy {
        return Err(GateFailure::Expectancy);
    }
    if metrics.max_drawdown > config.max_drawdown {
        return Err(GateFailure::Drawdown);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passing_metrics() -> MetricsSet {
        MetricsSet {
            sharpe: 1.5,
            win_rate: 0.55,
            max_drawdown: 0.20,
            expectancy: 0.005,
            total_trades: 100,
            total_return: 0.30,
            profit_factor: 1.8,
        }
    }

    fn config() -> ThresholdConfig {
        ThresholdConfig::for_timeframe(Timeframe::M5)
    }

    #[test]
    fn passing_set_accepted() {
        assert!(check_thresholds(&passing_metrics(), &config()).is_ok());
    }

    #[test]
    fn each_predicate_rejects_alone() {
        let cases = [
            (
                MetricsSet {
                    sharpe: 0.1,
                    ..passing_metrics()
                },
                GateFailure::Sharpe,
            ),
            (
                MetricsSet {
                    win_rate: 0.2,
                    ..passing_metrics()
                },
                GateFailure::WinRate,
            ),
            (
                MetricsSet {
                    expectancy: 0.001,
                    ..passing_metrics()
                },
                GateFailure::Expectancy,
            ),
            (
                MetricsSet {
                    max_drawdown: 0.6,
                    ..passing_metrics()
                },
                GateFailure::Drawdown,
            ),
            (
                MetricsSet {
                    total_trades: 10,
                    ..passing_metrics()
                },
                GateFailure::TradeCount,
            ),
        ];
        for (metrics, expected) in cases {
            assert_eq!(check_thresholds(&metrics, &config()), Err(expected));
        }
    }

    #[test]
    fn trade_floor_follows_timeframe() {
        let metrics = MetricsSet {
            total_trades: 15,
            ..passing_metrics()
        };
        assert_eq!(
            check_thresholds(&metrics, &ThresholdConfig::for_timeframe(Timeframe::M5)),
            Err(GateFailure::TradeCount)
        );
        assert!(
            check_thresholds(&metrics, &ThresholdConfig::for_timeframe(Timeframe::H4)).is_ok()
        );
    }

    #[test]
    fn boundary_values_pass() {
        let config = config();
        let metrics = MetricsSet {
            sharpe: config.min_sharpe,
            win_rate: config.min_win_rate,
            expectancy: config.min_expectancy,
            max_drawdown: config.max_drawdown,
            total_trades: config.min_trades,
            total_return: 0.1,
            profit_factor: 1.0,
        };
        assert!(check_thresholds(&metrics, &config).is_ok());
    }
}
