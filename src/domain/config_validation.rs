//! Configuration loading and validation.
//!
//! Every recognized option has a default, so an empty config is valid;
//! validation rejects values that would make the pipeline nonsensical
//! before any backtest runs.

use crate::domain::error::StratgateError;
use crate::domain::pipeline::PipelineConfig;
use crate::domain::pool::PoolConfig;
use crate::domain::thresholds::ThresholdConfig;
use crate::ports::config_port::ConfigPort;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), StratgateError> {
    validate_simulator(config)?;
    validate_parameter_space(config)?;
    validate_backtest(config)?;
    validate_scorer(config)?;
    validate_walk_forward(config)?;
    validate_robustness(config)?;
    validate_pool(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> StratgateError {
    StratgateError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Comma-separated float list; `None` when the key is unset.
fn get_float_list(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<Vec<f64>>, StratgateError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(None);
    };
    let mut values = Vec::new();
    for item in raw.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let value = item
            .parse::<f64>()
            .map_err(|_| invalid(section, key, &format!("'{item}' is not a number")))?;
        values.push(value);
    }
    if values.is_empty() {
        return Err(invalid(section, key, "list is empty"));
    }
    Ok(Some(values))
}

fn validate_simulator(config: &dyn ConfigPort) -> Result<(), StratgateError> {
    let equity = config.get_double("simulator", "initial_equity", 10_000.0);
    if equity <= 0.0 {
        return Err(invalid("simulator", "initial_equity", "must be positive"));
    }
    let risk = config.get_double("simulator", "risk_pct", 0.02);
    if risk <= 0.0 || risk >= 1.0 {
        return Err(invalid("simulator", "risk_pct", "must be between 0 and 1"));
    }
    let fee = config.get_double("simulator", "fee_rate", 0.0005);
    if fee < 0.0 {
        return Err(invalid("simulator", "fee_rate", "must be non-negative"));
    }
    let slippage = config.get_double("simulator", "slippage_rate", 0.0005);
    if slippage < 0.0 {
        return Err(invalid("simulator", "slippage_rate", "must be non-negative"));
    }
    let slots = config.get_int("simulator", "max_open_positions", 5);
    if slots < 1 {
        return Err(invalid("simulator", "max_open_positions", "must be at least 1"));
    }
    Ok(())
}

fn validate_parameter_space(config: &dyn ConfigPort) -> Result<(), StratgateError> {
    if let Some(ladder) = get_float_list(config, "parameter_space", "leverage_ladder")? {
        if ladder.iter().any(|&l| l <= 0.0) {
            return Err(invalid(
                "parameter_space",
                "leverage_ladder",
                "leverage must be positive",
            ));
        }
    }
    Ok(())
}

fn validate_walk_forward(config: &dyn ConfigPort) -> Result<(), StratgateError> {
    if let Some(fractions) = get_float_list(config, "walk_forward", "window_fractions")? {
        if fractions.iter().any(|&f| f <= 0.0 || f > 1.0) {
            return Err(invalid(
                "walk_forward",
                "window_fractions",
                "fractions must be in (0, 1]",
            ));
        }
        if fractions.windows(2).any(|w| w[1] <= w[0]) {
            return Err(invalid(
                "walk_forward",
                "window_fractions",
                "fractions must be strictly ascending",
            ));
        }
    }
    let floor = config.get_double("walk_forward", "min_expectancy", 0.002);
    if floor < 0.0 {
        return Err(invalid("walk_forward", "min_expectancy", "must be non-negative"));
    }
    Ok(())
}

fn validate_backtest(config: &dyn ConfigPort) -> Result<(), StratgateError> {
    let fraction = config.get_double("backtest", "is_fraction", 0.7);
    if fraction <= 0.0 || fraction >= 1.0 {
        return Err(invalid("backtest", "is_fraction", "must be between 0 and 1"));
    }
    let degradation = config.get_double("backtest", "max_degradation", 0.50);
    if !(0.0..=1.0).contains(&degradation) {
        return Err(invalid("backtest", "max_degradation", "must be in [0, 1]"));
    }
    Ok(())
}

fn validate_scorer(config: &dyn ConfigPort) -> Result<(), StratgateError> {
    let min_score = config.get_double("scorer", "min_score", 40.0);
    if !(0.0..=100.0).contains(&min_score) {
        return Err(invalid("scorer", "min_score", "must be in [0, 100]"));
    }
    Ok(())
}

fn validate_robustness(config: &dyn ConfigPort) -> Result<(), StratgateError> {
    let threshold = config.get_double("robustness", "threshold", 0.80);
    if !(0.0..=1.0).contains(&threshold) {
        return Err(invalid("robustness", "threshold", "must be in [0, 1]"));
    }
    let target = config.get_double("robustness", "trade_target", 150.0);
    if target <= 0.0 {
        return Err(invalid("robustness", "trade_target", "must be positive"));
    }
    Ok(())
}

fn validate_pool(config: &dyn ConfigPort) -> Result<(), StratgateError> {
    let max_size = config.get_int("pool", "max_size", 300);
    if max_size < 1 {
        return Err(invalid("pool", "max_size", "must be at least 1"));
    }
    let min_score = config.get_double("pool", "min_score", 40.0);
    if !(0.0..=100.0).contains(&min_score) {
        return Err(invalid("pool", "min_score", "must be in [0, 100]"));
    }
    Ok(())
}

/// Builds the pipeline configuration, falling back to defaults for every
/// unset key. Call [`validate_config`] first.
pub fn load_pipeline_config(config: &dyn ConfigPort) -> PipelineConfig {
    let mut pipeline = PipelineConfig::default();

    pipeline.sim.initial_equity =
        config.get_double("simulator", "initial_equity", pipeline.sim.initial_equity);
    pipeline.sim.risk_pct = config.get_double("simulator", "risk_pct", pipeline.sim.risk_pct);
    pipeline.sim.fee_rate = config.get_double("simulator", "fee_rate", pipeline.sim.fee_rate);
    pipeline.sim.slippage_rate =
        config.get_double("simulator", "slippage_rate", pipeline.sim.slippage_rate);
    pipeline.sim.max_open_positions = config.get_int(
        "simulator",
        "max_open_positions",
        pipeline.sim.max_open_positions as i64,
    ) as usize;

    pipeline.metrics.sharpe_cap =
        config.get_double("metrics", "sharpe_cap", pipeline.metrics.sharpe_cap);

    // Threshold overrides apply to every timeframe; min_trades keeps its
    // per-timeframe default unless explicitly set.
    if config.get_string("thresholds", "min_sharpe").is_some()
        || config.get_string("thresholds", "min_win_rate").is_some()
        || config.get_string("thresholds", "min_expectancy").is_some()
        || config.get_string("thresholds", "max_drawdown").is_some()
        || config.get_string("thresholds", "min_trades").is_some()
    {
        pipeline.thresholds = Some(ThresholdConfig {
            min_sharpe: config.get_double("thresholds", "min_sharpe", 0.3),
            min_win_rate: config.get_double("thresholds", "min_win_rate", 0.35),
            min_expectancy: config.get_double("thresholds", "min_expectancy", 0.002),
            max_drawdown: config.get_double("thresholds", "max_drawdown", 0.50),
            min_trades: config.get_int("thresholds", "min_trades", 20) as usize,
        });
    }

    pipeline.space.prefer_atr_stops = config.get_bool(
        "parameter_space",
        "prefer_atr_stops",
        pipeline.space.prefer_atr_stops,
    );
    if let Ok(Some(ladder)) = get_float_list(config, "parameter_space", "leverage_ladder") {
        pipeline.space.leverage_ladder = ladder;
    }

    pipeline.final_backtest.is_fraction = config.get_double(
        "backtest",
        "is_fraction",
        pipeline.final_backtest.is_fraction,
    );
    pipeline.final_backtest.max_degradation = config.get_double(
        "backtest",
        "max_degradation",
        pipeline.final_backtest.max_degradation,
    );
    pipeline.final_backtest.oos_min_trades_factor = config.get_double(
        "backtest",
        "oos_min_trades_factor",
        pipeline.final_backtest.oos_min_trades_factor,
    );

    pipeline.scorer.min_score =
        config.get_double("scorer", "min_score", pipeline.scorer.min_score);
    pipeline.scorer.drawdown_cap =
        config.get_double("scorer", "drawdown_cap", pipeline.scorer.drawdown_cap);

    pipeline.shuffle.window_bars =
        config.get_int("shuffle", "window_bars", pipeline.shuffle.window_bars as i64) as usize;
    pipeline.shuffle.seed =
        config.get_int("shuffle", "seed", pipeline.shuffle.seed as i64) as u64;

    pipeline.walk_forward.min_expectancy = config.get_double(
        "walk_forward",
        "min_expectancy",
        pipeline.walk_forward.min_expectancy,
    );
    if let Ok(Some(fractions)) = get_float_list(config, "walk_forward", "window_fractions") {
        pipeline.walk_forward.window_fractions = fractions;
    }

    pipeline.robustness.oos_ratio_weight = config.get_double(
        "robustness",
        "oos_ratio_weight",
        pipeline.robustness.oos_ratio_weight,
    );
    pipeline.robustness.trade_weight = config.get_double(
        "robustness",
        "trade_weight",
        pipeline.robustness.trade_weight,
    );
    pipeline.robustness.simplicity_weight = config.get_double(
        "robustness",
        "simplicity_weight",
        pipeline.robustness.simplicity_weight,
    );
    pipeline.robustness.trade_target = config.get_double(
        "robustness",
        "trade_target",
        pipeline.robustness.trade_target,
    );
    pipeline.robustness.threshold =
        config.get_double("robustness", "threshold", pipeline.robustness.threshold);

    pipeline
}

pub fn load_pool_config(config: &dyn ConfigPort) -> PoolConfig {
    let defaults = PoolConfig::default();
    PoolConfig {
        max_size: config.get_int("pool", "max_size", defaults.max_size as i64) as usize,
        min_score: config.get_double("pool", "min_score", defaults.min_score),
    }
}
