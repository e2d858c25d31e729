//! Robustness confidence score.

#[derive(Debug, Clone)]
pub struct RobustnessConfig {
    pub oos_ratio_weight: f64,
    pub trade_weight: f64,
    pub simplicity_weight: f64,
    /// Trade count at which statistical significance saturates.
    pub trade_target: f64,
    pub threshold: f64,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        RobustnessConfig {
            oos_ratio_weight: 0.50,
            trade_weight: 0.35,
            simplicity_weight: 0.15,
            trade_target: 150.0,
            threshold: 0.80,
        }
    }
}

/// Weighted blend of generalization, trade-count significance and model
/// simplicity, clamped to [0, 1].
pub fn robustness_score(
    is_sharpe: f64,
    oos_sharpe: f64,
    total_trades: usize,
    indicator_count: usize,
    config: &RobustnessConfig,
) -> f64 {
    let oos_ratio = if is_sharpe > 0.0 {
        (oos_sharpe / is_sharpe).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let trade_score = (total_trades as f64 / config.trade_target).min(1.0);
    let simplicity = 1.0 / indicator_count.max(1) as f64;

    (config.oos_ratio_weight * oos_ratio
        + config.trade_weight * trade_score
        + config.simplicity_weight * simplicity)
        .clamp(0.0, 1.0)
}
