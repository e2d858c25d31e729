//! Composite strategy score.

use crate::domain::metrics::MetricsSet;

#[derive(Debug, Clone)]
pub struct ScorerConfig {
    /// Strategies scoring below this are retired before the costlier
    /// validation stages run.
    pub min_score: f64,
    /// Drawdown normalization cap; matches the threshold gate's cap.
    pub drawdown_cap: f64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        ScorerConfig {
            min_score: 40.0,
            drawdown_cap: 0.50,
        }
    }
}

/// Composite score in [0, 100] over the out-of-sample metrics plus the
/// IS/OOS degradation. Expectancy is normalized against 0-10%, Sharpe
/// against 0-3; the recency term rewards low degradation.
pub fn composite_score(metrics: &MetricsSet, degradation: f64, config: &ScorerConfig) -> f64 {
    let expectancy_norm = (metrics.expectancy / 0.10).clamp(0.0, 1.0);
    let sharpe_norm = (metrics.sharpe / 3.0).clamp(0.0, 1.0);
    let win_rate = metrics.win_rate.clamp(0.0, 1.0);
    let drawdown_term = (1.0 - metrics.max_drawdown / config.drawdown_cap).clamp(0.0, 1.0);
    let recency_norm = (0.5 - degradation).clamp(0.0, 1.0);

    100.0
        * (0.40 * expectancy_norm
            + 0.25 * sharpe_norm
            + 0.10 * win_rate
            + 0.15 * drawdown_term
            + 0.10 * recency_norm)
}
