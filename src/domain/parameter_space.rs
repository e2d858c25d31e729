//! Parameter grid construction for the optimizer.
//!
//! Builds the finite set of stop-loss / take-profit / leverage /
//! exit-timeout combinations searched for each strategy, using
//! strategy-class-specific rules.

use crate::domain::ohlcv::Timeframe;
use std::collections::HashSet;

pub const LEVERAGE_LADDER: [f64; 7] = [1.0, 2.0, 3.0, 5.0, 10.0, 20.0, 40.0];

/// Stop-loss may risk at most 2.5× the take-profit target.
const MAX_RISK_REWARD: f64 = 2.5;

/// One point in the search grid. Percentages are fractions of entry price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterCombo {
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub leverage: f64,
    pub exit_timeout_bars: usize,
}

/// How the strategy's source pattern was validated, which determines the
/// grid-building rule.
#[derive(Debug, Clone)]
pub enum StrategyClass {
    /// Pattern validated with touch semantics: the target magnitude is a
    /// price level the market actually reached.
    ExecutionAligned {
        target_magnitude: f64,
        holding_period_bars: usize,
    },
    /// Pattern validated on closes over a holding period: the exit is
    /// time-driven and take-profit is disabled.
    CloseTimeBased {
        target_magnitude: f64,
        holding_period_bars: usize,
        atr_at_signal: Option<f64>,
    },
    /// No pattern statistics; fall back to timeframe-specific empirical
    /// ranges.
    Generic,
}

#[derive(Debug, Clone)]
pub struct ParameterSpaceConfig {
    /// When true (the default) close/time-based stops are derived from the
    /// pattern's ATR at signal time, falling back to target magnitude when
    /// volatility stats are absent. When false, magnitude is the primary
    /// basis.
    pub prefer_atr_stops: bool,
    pub leverage_ladder: Vec<f64>,
}

impl Default for ParameterSpaceConfig {
    fn default() -> Self {
        ParameterSpaceConfig {
            prefer_atr_stops: true,
            leverage_ladder: LEVERAGE_LADDER.to_vec(),
        }
    }
}

/// Build the candidate grid for one strategy.
///
/// Combos with take-profit = 0 AND exit-timeout = 0 are excluded: such a
/// trade could only ever exit through its stop.
pub fn build_grid(
    class: &StrategyClass,
    timeframe: Timeframe,
    config: &ParameterSpaceConfig,
) -> Vec<ParameterCombo> {
    let mut combos = match class {
        StrategyClass::ExecutionAligned {
            target_magnitude,
            holding_period_bars,
        } => execution_aligned_grid(*target_magnitude, *holding_period_bars, config),
        StrategyClass::CloseTimeBased {
            target_magnitude,
            holding_period_bars,
            atr_at_signal,
        } => close_time_grid(*target_magnitude, *holding_period_bars, *atr_at_signal, config),
        StrategyClass::Generic => generic_grid(timeframe, config),
    };

    combos.retain(|c| c.take_profit_pct > 0.0 || c.exit_timeout_bars > 0);
    dedup_combos(combos)
}

fn execution_aligned_grid(
    magnitude: f64,
    holding_period: usize,
    config: &ParameterSpaceConfig,
) -> Vec<ParameterCombo> {
    const TP_MULTS: [f64; 5] = [0.5, 0.75, 1.0, 1.25, 1.5];
    const SL_MULTS: [f64; 4] = [1.0, 1.5, 2.0, 2.5];
    const TIMEOUT_MULTS: [f64; 4] = [0.0, 1.0, 1.5, 2.0];

    let mut combos = Vec::new();
    for &tp_mult in &TP_MULTS {
        let take_profit = tp_mult * magnitude;
        for &sl_mult in &SL_MULTS {
            // Risk:reward capped at 2.5:1.
            let stop_loss = (sl_mult * magnitude).min(MAX_RISK_REWARD * take_profit);
            for &to_mult in &TIMEOUT_MULTS {
                let timeout = scale_bars(holding_period, to_mult);
                for &leverage in &config.leverage_ladder {
                    combos.push(ParameterCombo {
                        stop_loss_pct: stop_loss,
                        take_profit_pct: take_profit,
                        leverage,
                        exit_timeout_bars: timeout,
                    });
                }
            }
        }
    }
    combos
}

fn close_time_grid(
    magnitude: f64,
    holding_period: usize,
    atr_at_signal: Option<f64>,
    config: &ParameterSpaceConfig,
) -> Vec<ParameterCombo> {
    const SL_MULTS: [f64; 4] = [4.0, 6.0, 8.0, 10.0];
    const TIMEOUT_MULTS: [f64; 5] = [0.5, 0.75, 1.0, 1.25, 1.5];

    let stop_basis = if config.prefer_atr_stops {
        atr_at_signal.unwrap_or(magnitude)
    } else {
        magnitude
    };

    let mut combos = Vec::new();
    for &sl_mult in &SL_MULTS {
        for &to_mult in &TIMEOUT_MULTS {
            // Exit is time-driven: timeout never zero, take-profit disabled.
            let timeout = scale_bars(holding_period, to_mult).max(1);
            for &leverage in &config.leverage_ladder {
                combos.push(ParameterCombo {
                    stop_loss_pct: sl_mult * stop_basis,
                    take_profit_pct: 0.0,
                    leverage,
                    exit_timeout_bars: timeout,
                });
            }
        }
    }
    combos
}

fn generic_grid(timeframe: Timeframe, config: &ParameterSpaceConfig) -> Vec<ParameterCombo> {
    // Empirical per-timeframe ranges; wider for coarser timeframes.
    let (sls, tps, timeouts): (&[f64], &[f64], &[usize]) = match timeframe {
        Timeframe::M5 => (
            &[0.004, 0.006, 0.01, 0.015, 0.02],
            &[0.0, 0.008, 0.012, 0.02, 0.03],
            &[0, 12, 24, 48],
        ),
        Timeframe::M15 => (
            &[0.005, 0.0075, 0.0125, 0.02, 0.03],
            &[0.0, 0.01, 0.015, 0.025, 0.04],
            &[0, 8, 16, 32],
        ),
        Timeframe::H1 => (
            &[0.0075, 0.0125, 0.02, 0.03, 0.045],
            &[0.0, 0.015, 0.025, 0.04, 0.06],
            &[0, 6, 12, 24],
        ),
        Timeframe::H4 => (
            &[0.01, 0.02, 0.03, 0.045, 0.06],
            &[0.0, 0.02, 0.035, 0.055, 0.08],
            &[0, 4, 8, 16],
        ),
        Timeframe::D1 => (
            &[0.02, 0.03, 0.05, 0.07, 0.10],
            &[0.0, 0.04, 0.06, 0.09, 0.14],
            &[0, 3, 6, 10],
        ),
    };

    let mut combos = Vec::new();
    for &stop_loss in sls {
        for &take_profit in tps {
            for &timeout in timeouts {
                for &leverage in &config.leverage_ladder {
                    combos.push(ParameterCombo {
                        stop_loss_pct: stop_loss,
                        take_profit_pct: take_profit,
                        leverage,
                        exit_timeout_bars: timeout,
                    });
                }
            }
        }
    }
    combos
}

fn scale_bars(bars: usize, mult: f64) -> usize {
    (bars as f64 * mult).round() as usize
}

fn dedup_combos(combos: Vec<ParameterCombo>) -> Vec<ParameterCombo> {
    let mut seen = HashSet::new();
    combos
        .into_iter()
        .filter(|c| {
            seen.insert((
                c.stop_loss_pct.to_bits(),
                c.take_profit_pct.to_bits(),
                c.leverage.to_bits(),
                c.exit_timeout_bars,
            ))
        })
        .collect()
}
