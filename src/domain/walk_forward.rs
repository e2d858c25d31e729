//! Walk-forward validation over expanding in-sample prefixes.
//!
//! The best combo is re-simulated, unchanged, over progressively larger
//! leading slices of the in-sample window. A real edge should already be
//! present in the early history; every window must clear the expectancy
//! floor on its own.

use tracing::debug;

use crate::domain::metrics::{MetricsConfig, compute_metrics};
use crate::domain::ohlcv::{PriceSeries, Timeframe};
use crate::domain::parameter_space::ParameterCombo;
use crate::domain::signal::{InstrumentMeta, SignalStrategy};
use crate::domain::simulator::{SimConfig, simulate_portfolio};

#[derive(Debug, Clone)]
pub struct WalkForwardConfig {
    pub window_fractions: Vec<f64>,
    pub min_expectancy: f64,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        WalkForwardConfig {
            window_fractions: vec![0.25, 0.50, 0.75, 1.0],
            min_expectancy: 0.002,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WindowOutcome {
    pub fraction: f64,
    pub expectancy: f64,
    pub total_trades: usize,
}

#[derive(Debug, Clone)]
pub struct WalkForwardReport {
    pub windows: Vec<WindowOutcome>,
    pub passed: bool,
}

/// One failing window fails the whole set.
pub fn all_windows_pass(expectancies: &[f64], floor: f64) -> bool {
    !expectancies.is_empty() && expectancies.iter().all(|&e| e >= floor)
}

/// Re-validates fixed parameters over each expanding prefix. All windows
/// are evaluated even after a failure so the report shows the full
/// stability profile.
pub fn walk_forward(
    is_data: &[(InstrumentMeta, PriceSeries)],
    strategy: &dyn SignalStrategy,
    combo: &ParameterCombo,
    sim_config: &SimConfig,
    metrics_config: &MetricsConfig,
    config: &WalkForwardConfig,
) -> WalkForwardReport {
    let timeframe = is_data
        .first()
        .map(|(_, series)| series.timeframe)
        .unwrap_or(Timeframe::H1);

    let mut windows = Vec::with_capacity(config.window_fractions.len());
    for &fraction in &config.window_fractions {
        let slice: Vec<(InstrumentMeta, PriceSeries)> = is_data
            .iter()
            .map(|(meta, series)| (meta.clone(), series.prefix(fraction)))
            .collect();
        let result = simulate_portfolio(&slice, strategy, combo, sim_config);
        let metrics = compute_metrics(&result, timeframe, metrics_config);
        debug!(
            strategy = strategy.id(),
            fraction,
            expectancy = metrics.expectancy,
            trades = metrics.total_trades,
            "walk-forward window"
        );
        windows.push(WindowOutcome {
            fraction,
            expectancy: metrics.expectancy,
            total_trades: metrics.total_trades,
        });
    }

    let expectancies: Vec<f64> = windows.iter().map(|w| w.expectancy).collect();
    let passed = all_windows_pass(&expectancies, config.min_expectancy);
    WalkForwardReport { windows, passed }
}
