//! Parameter grid search.
//!
//! Drives the grid builder, single-instrument simulator, metrics reduction
//! and threshold gate across every combo in parallel, then keeps the
//! highest-scoring survivor. Zero survivors is the fatal outcome for a
//! strategy.

use rayon::prelude::*;
use tracing::debug;

use crate::domain::metrics::{MetricsConfig, MetricsSet, compute_metrics};
use crate::domain::ohlcv::PriceSeries;
use crate::domain::parameter_space::{ParameterCombo, ParameterSpaceConfig, build_grid};
use crate::domain::signal::{InstrumentMeta, SignalStrategy};
use crate::domain::simulator::{SimConfig, simulate_single};
use crate::domain::thresholds::{ThresholdConfig, check_thresholds};

#[derive(Debug, Clone)]
pub struct OptimizerOutcome {
    pub combo: ParameterCombo,
    pub metrics: MetricsSet,
    pub coarse_score: f64,
}

/// Coarse ranking applied to combos that already passed the gate.
/// Expectancy is normalized against a 0-10% reference range, Sharpe
/// against 0-3.
pub fn coarse_score(metrics: &MetricsSet) -> f64 {
    let edge_norm = (metrics.expectancy / 0.10).clamp(0.0, 1.0);
    let sharpe_norm = (metrics.sharpe / 3.0).clamp(0.0, 1.0);
    0.50 * edge_norm
        + 0.25 * sharpe_norm
        + 0.15 * metrics.win_rate
        + 0.10 * (1.0 - metrics.max_drawdown)
}

/// Evaluates the whole grid and returns every combo surviving the gate,
/// scored. Combo evaluations share no mutable state, so the grid is
/// mapped in parallel.
pub fn evaluate_grid(
    series: &PriceSeries,
    strategy: &dyn SignalStrategy,
    meta: &InstrumentMeta,
    sim_config: &SimConfig,
    thresholds: &ThresholdConfig,
    metrics_config: &MetricsConfig,
    space_config: &ParameterSpaceConfig,
) -> Vec<OptimizerOutcome> {
    let grid = build_grid(&strategy.class(), series.timeframe, space_config);
    debug!(
        strategy = strategy.id(),
        combos = grid.len(),
        "evaluating parameter grid"
    );

    let survivors: Vec<OptimizerOutcome> = grid
        .par_iter()
        .filter_map(|combo| {
            let result = simulate_single(series, strategy, combo, meta, sim_config);
            let metrics = compute_metrics(&result, series.timeframe, metrics_config);
            check_thresholds(&metrics, thresholds).ok()?;
            let coarse_score = coarse_score(&metrics);
            Some(OptimizerOutcome {
                combo: *combo,
                metrics,
                coarse_score,
            })
        })
        .collect();

    debug!(
        strategy = strategy.id(),
        survivors = survivors.len(),
        "grid evaluation complete"
    );
    survivors
}

/// Runs the grid search and keeps the single best surviving combo.
/// Returns `None` when nothing survives the gate.
pub fn optimize(
    series: &PriceSeries,
    strategy: &dyn SignalStrategy,
    meta: &InstrumentMeta,
    sim_config: &SimConfig,
    thresholds: &ThresholdConfig,
    metrics_config: &MetricsConfig,
    space_config: &ParameterSpaceConfig,
) -> Option<OptimizerOutcome> {
    evaluate_grid(
        series,
        strategy,
        meta,
        sim_config,
        thresholds,
        metrics_config,
        space_config,
    )
    .into_iter()
    .max_by(|a, b| {
        a.coarse_score
            .partial_cmp(&b.coarse_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}
