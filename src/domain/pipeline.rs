//! Sequential gating pipeline for one strategy.
//!
//! Stage order: parameter optimization, IS/OOS final backtest, composite
//! scoring, shuffle test, walk-forward validation, robustness gate, pool
//! admission. Any stage failing short-circuits the rest; failures are
//! either fatal (code discarded) or soft (retired, code reusable).
//! Every decision is deterministic given its inputs, so re-running a
//! strategy on the same data yields the same verdict. Independent
//! strategies fan out over the rayon worker pool via [`evaluate_batch`].

use rayon::prelude::*;
use tracing::info;

use crate::domain::final_backtest::{
    BacktestFailure, FinalBacktestConfig, run_final_backtest,
};
use crate::domain::metrics::MetricsConfig;
use crate::domain::ohlcv::PriceSeries;
use crate::domain::optimizer::optimize;
use crate::domain::parameter_space::ParameterSpaceConfig;
use crate::domain::pool::{AdmissionDecision, PoolManager};
use crate::domain::robustness::{RobustnessConfig, robustness_score};
use crate::domain::scorer::{ScorerConfig, composite_score};
use crate::domain::shuffle::{ShuffleCache, ShuffleConfig, ShuffleVerdict, run_shuffle_test};
use crate::domain::signal::{InstrumentMeta, SignalStrategy};
use crate::domain::simulator::SimConfig;
use crate::domain::strategy::{Status, StrategyRecord};
use crate::domain::thresholds::ThresholdConfig;
use crate::domain::walk_forward::{WalkForwardConfig, walk_forward};
use crate::ports::event_port::EventPort;

#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub sim: SimConfig,
    pub metrics: MetricsConfig,
    /// When unset, thresholds default per timeframe.
    pub thresholds: Option<ThresholdConfig>,
    pub space: ParameterSpaceConfig,
    pub final_backtest: FinalBacktestConfig,
    pub scorer: ScorerConfig,
    pub shuffle: ShuffleConfig,
    pub walk_forward: WalkForwardConfig,
    pub robustness: RobustnessConfig,
}

/// Terminal decision for one evaluation pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Passed every gate and entered the pool.
    Admitted {
        score: f64,
        robustness: f64,
        evicted: Option<String>,
    },
    /// Passed everything except the robustness gate; stays validated and
    /// eligible for re-evaluation without regenerating code.
    Validated { score: f64, robustness: f64 },
    /// Soft failure: code fingerprint remains reusable.
    Retired { reason: String },
    /// Fatal failure: strategy code is discarded.
    Discarded { reason: String },
}

fn transition(record: &mut StrategyRecord, status: Status, events: &dyn EventPort) {
    record.status = status;
    events.status_changed(&record.id, status);
}

/// Runs one strategy through every gate.
///
/// `data` pairs instrument metadata with its full price history; the
/// first entry is the reference instrument used for single-instrument
/// optimization and the shuffle test.
pub fn evaluate_strategy(
    record: &mut StrategyRecord,
    strategy: &dyn SignalStrategy,
    data: &[(InstrumentMeta, PriceSeries)],
    shuffle_cache: &ShuffleCache,
    pool: &PoolManager,
    events: &dyn EventPort,
    config: &PipelineConfig,
) -> Verdict {
    let Some((reference_meta, reference_series)) = data.first() else {
        transition(record, Status::Discarded, events);
        return Verdict::Discarded {
            reason: "no price data for universe".into(),
        };
    };

    let timeframe = reference_series.timeframe;
    let thresholds = config
        .thresholds
        .clone()
        .unwrap_or_else(|| ThresholdConfig::for_timeframe(timeframe));

    // Parameters are fitted on the in-sample window only.
    let is_series = reference_series.prefix(config.final_backtest.is_fraction);
    let Some(best) = optimize(
        &is_series,
        strategy,
        reference_meta,
        &config.sim,
        &thresholds,
        &config.metrics,
        &config.space,
    ) else {
        transition(record, Status::Discarded, events);
        return Verdict::Discarded {
            reason: "no viable parameter combination".into(),
        };
    };
    record.metrics.best_combo = Some(best.combo);
    transition(record, Status::Optimized, events);

    let report = match run_final_backtest(
        data,
        strategy,
        &best.combo,
        &config.sim,
        &thresholds,
        &config.metrics,
        &config.final_backtest,
    ) {
        Ok(report) => report,
        Err(BacktestFailure::InSample(gate)) => {
            transition(record, Status::Discarded, events);
            return Verdict::Discarded {
                reason: format!("in-sample gate failed: {gate}"),
            };
        }
        Err(BacktestFailure::OutOfSample(gate)) => {
            transition(record, Status::Retired, events);
            return Verdict::Retired {
                reason: format!("out-of-sample gate failed: {gate}"),
            };
        }
        Err(BacktestFailure::Degradation { degradation }) => {
            transition(record, Status::Retired, events);
            return Verdict::Retired {
                reason: format!("sharpe degradation {degradation:.2} above cap"),
            };
        }
    };
    record.metrics.is_metrics = Some(report.is_metrics.clone());
    record.metrics.oos_metrics = Some(report.oos_metrics.clone());
    record.metrics.degradation = Some(report.degradation);

    let score = composite_score(&report.oos_metrics, report.degradation, &config.scorer);
    record.metrics.score = Some(score);
    if score < config.scorer.min_score {
        transition(record, Status::Retired, events);
        return Verdict::Retired {
            reason: format!("score {score:.1} below minimum"),
        };
    }

    if run_shuffle_test(strategy, reference_series, shuffle_cache, &config.shuffle)
        == ShuffleVerdict::LookaheadDetected
    {
        transition(record, Status::Retired, events);
        return Verdict::Retired {
            reason: "lookahead bias detected".into(),
        };
    }

    let is_data: Vec<(InstrumentMeta, PriceSeries)> = data
        .iter()
        .map(|(meta, series)| (meta.clone(), series.prefix(config.final_backtest.is_fraction)))
        .collect();
    let wfa = walk_forward(
        &is_data,
        strategy,
        &best.combo,
        &config.sim,
        &config.metrics,
        &config.walk_forward,
    );
    if !wfa.passed {
        transition(record, Status::Retired, events);
        return Verdict::Retired {
            reason: "walk-forward window below expectancy floor".into(),
        };
    }

    let total_trades =
        report.is_metrics.total_trades + report.oos_metrics.total_trades;
    let robustness = robustness_score(
        report.is_metrics.sharpe,
        report.oos_metrics.sharpe,
        total_trades,
        strategy.indicator_count(),
        &config.robustness,
    );
    record.metrics.robustness = Some(robustness);
    transition(record, Status::Validated, events);
    if robustness < config.robustness.threshold {
        info!(
            strategy = record.id.as_str(),
            robustness, "robustness below threshold, strategy stays validated"
        );
        return Verdict::Validated { score, robustness };
    }

    match pool.admit(&record.id, score) {
        AdmissionDecision::Admitted => {
            transition(record, Status::Active, events);
            events.pool_changed(&record.id, true, None);
            Verdict::Admitted {
                score,
                robustness,
                evicted: None,
            }
        }
        AdmissionDecision::AdmittedEvicting { evicted } => {
            transition(record, Status::Active, events);
            events.pool_changed(&record.id, true, Some(&evicted.strategy_id));
            Verdict::Admitted {
                score,
                robustness,
                evicted: Some(evicted.strategy_id),
            }
        }
        AdmissionDecision::Rejected => {
            transition(record, Status::Retired, events);
            events.pool_changed(&record.id, false, None);
            Verdict::Retired {
                reason: "outscored at pool admission".into(),
            }
        }
    }
}

/// Evaluates a batch of strategies concurrently on shared data.
///
/// The shuffle cache and pool are shared across workers and synchronize
/// internally; verdicts come back in input order.
pub fn evaluate_batch(
    strategies: &[Box<dyn SignalStrategy>],
    data: &[(InstrumentMeta, PriceSeries)],
    shuffle_cache: &ShuffleCache,
    pool: &PoolManager,
    events: &dyn EventPort,
    config: &PipelineConfig,
) -> Vec<(StrategyRecord, Verdict)> {
    strategies
        .par_iter()
        .map(|strategy| {
            let mut record = StrategyRecord::new(strategy.as_ref());
            let verdict = evaluate_strategy(
                &mut record,
                strategy.as_ref(),
                data,
                shuffle_cache,
                pool,
                events,
                config,
            );
            (record, verdict)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::{Candle, Timeframe};
    use crate::domain::parameter_space::StrategyClass;
    use crate::domain::pool::PoolConfig;
    use crate::domain::signal::{Direction, Signal};
    use crate::ports::event_port::NullEventSink;
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

    fn flat_series(n: usize) -> PriceSeries {
        let candles = (0..n)
            .map(|i| Candle {
                ts: Utc.timestamp_opt(1_700_000_000 + i as i64 * 300, 0).unwrap(),
                open: 100.0,
                high: 100.0,
                low: 100.0,
                close: 100.0,
                volume: 1.0,
            })
            .collect();
        PriceSeries::new("TEST", Timeframe::M5, candles)
    }

    #[test]
    fn empty_universe_is_discarded() {
        let mut record = StrategyRecord::new(&AlwaysLong);
        let verdict = evaluate_strategy(
            &mut record,
            &AlwaysLong,
            &[],
            &ShuffleCache::new(),
            &PoolManager::new(PoolConfig::default()),
            &NullEventSink,
            &PipelineConfig::default(),
        );
        assert!(matches!(verdict, Verdict::Discarded { .. }));
        assert_eq!(record.status, Status::Discarded);
    }

    #[test]
    fn flat_market_is_discarded_with_no_viable_combo() {
        let mut record = StrategyRecord::new(&AlwaysLong);
        let data = vec![(InstrumentMeta::new("TEST"), flat_series(2_000))];
        let verdict = evaluate_strategy(
            &mut record,
            &AlwaysLong,
            &data,
            &ShuffleCache::new(),
            &PoolManager::new(PoolConfig::default()),
            &NullEventSink,
            &PipelineConfig::default(),
        );
        assert_eq!(
            verdict,
            Verdict::Discarded {
                reason: "no viable parameter combination".into(),
            }
        );
        assert_eq!(record.status, Status::Discarded);
        assert!(record.metrics.best_combo.is_none());
    }
}
