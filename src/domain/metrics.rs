//! Performance metrics reduced from a trade ledger and equity curve.

use crate::domain::ohlcv::Timeframe;
use crate::domain::simulator::SimResult;

#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Upper bound on annualized Sharpe; short test windows otherwise
    /// produce runaway values.
    pub sharpe_cap: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        MetricsConfig {
            sharpe_cap: 250.0_f64.sqrt(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MetricsSet {
    pub sharpe: f64,
    pub win_rate: f64,
    pub max_drawdown: f64,
    pub expectancy: f64,
    pub total_trades: usize,
    pub total_return: f64,
    pub profit_factor: f64,
}

/// Pure reduction of a simulation result to scalar metrics.
///
/// Zero trades yields the default (all-zero) set, which fails every
/// downstream gate on the trade-count minimum.
pub fn compute_metrics(
    result: &SimResult,
    timeframe: Timeframe,
    config: &MetricsConfig,
) -> MetricsSet {
    let trades = &result.trades;
    if trades.is_empty() {
        return MetricsSet::default();
    }

    let total_trades = trades.len();
    let total_return = (result.final_equity - result.initial_equity) / result.initial_equity;

    // Per-trade returns relative to position notional.
    let returns: Vec<f64> = trades.iter().map(|t| t.pnl / t.notional).collect();

    let wins: Vec<f64> = returns.iter().copied().filter(|&r| r > 0.0).collect();
    let losses: Vec<f64> = returns.iter().copied().filter(|&r| r <= 0.0).collect();
    let win_rate = wins.len() as f64 / total_trades as f64;

    let avg_win_pct = mean(&wins);
    let avg_loss_pct = mean(&losses).abs();
    let expectancy = win_rate * avg_win_pct - (1.0 - win_rate) * avg_loss_pct;

    let gross_profit: f64 = trades.iter().map(|t| t.pnl.max(0.0)).sum();
    let gross_loss: f64 = trades.iter().map(|t| (-t.pnl).max(0.0)).sum();
    let profit_factor = if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    let sharpe = trade_sharpe(&returns, total_return, result.bars, timeframe, config);
    let max_drawdown = max_drawdown(result);

    MetricsSet {
        sharpe,
        win_rate,
        max_drawdown,
        expectancy,
        total_trades,
        total_return,
        profit_factor,
    }
}

/// Trade-based Sharpe, annualized by the trade frequency implied by the
/// window length and the timeframe's bars-per-year, capped, and clamped
/// to at most zero whenever the run lost money overall.
fn trade_sharpe(
    returns: &[f64],
    total_return: f64,
    bars: usize,
    timeframe: Timeframe,
    config: &MetricsConfig,
) -> f64 {
    if returns.len() < 2 || bars == 0 {
        return 0.0;
    }
    let mean_r = mean(returns);
    let variance = returns.iter().map(|r| (r - mean_r).powi(2)).sum::<f64>()
        / (returns.len() - 1) as f64;
    let std = variance.sqrt();
    if std <= f64::EPSILON {
        return 0.0;
    }

    let trades_per_year = returns.len() as f64 * timeframe.bars_per_year() / bars as f64;
    let mut sharpe = mean_r / std * trades_per_year.sqrt();
    sharpe = sharpe.clamp(-config.sharpe_cap, config.sharpe_cap);
    if total_return < 0.0 {
        sharpe = sharpe.min(0.0);
    }
    sharpe
}

/// Max of `(running_peak - equity) / running_peak`, clamped to [0, 1].
fn max_drawdown(result: &SimResult) -> f64 {
    let mut peak = result.initial_equity;
    let mut worst = 0.0_f64;
    for point in &result.equity_curve {
        if point.equity > peak {
            peak = point.equity;
        }
        if peak > 0.0 {
            let dd = (peak - point.equity) / peak;
            if dd > worst {
                worst = dd;
            }
        }
    }
    worst.clamp(0.0, 1.0)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
