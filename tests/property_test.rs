//! Property tests for the scoring and pool invariants.

use proptest::prelude::*;
use stratgate::domain::metrics::MetricsSet;
use stratgate::domain::pool::{PoolConfig, PoolManager};
use stratgate::domain::robustness::{RobustnessConfig, robustness_score};
use stratgate::domain::scorer::{ScorerConfig, composite_score};

proptest! {
    #[test]
    fn composite_score_always_in_0_to_100(
        sharpe in -10.0..20.0f64,
        win_rate in 0.0..1.0f64,
        max_drawdown in 0.0..1.0f64,
        expectancy in -0.5..0.5f64,
        total_return in -1.0..5.0f64,
        degradation in -1.0..2.0f64,
    ) {
        let metrics = MetricsSet {
            sharpe,
            win_rate,
            max_drawdown,
            expectancy,
            total_trades: 100,
            total_return,
            profit_factor: 1.0,
        };
        let score = composite_score(&metrics, degradation, &ScorerConfig::default());
        prop_assert!((0.0..=100.0).contains(&score), "score {score}");
    }

    #[test]
    fn robustness_always_in_unit_interval(
        is_sharpe in -5.0..20.0f64,
        oos_sharpe in -5.0..20.0f64,
        trades in 0usize..1_000,
        indicators in 0usize..20,
    ) {
        let score = robustness_score(
            is_sharpe,
            oos_sharpe,
            trades,
            indicators,
            &RobustnessConfig::default(),
        );
        prop_assert!((0.0..=1.0).contains(&score), "robustness {score}");
    }

    #[test]
    fn pool_size_bounded_and_floor_enforced(
        scores in proptest::collection::vec(0.0..100.0f64, 0..60),
    ) {
        let pool = PoolManager::new(PoolConfig {
            max_size: 10,
            min_score: 40.0,
        });
        for (i, score) in scores.iter().enumerate() {
            pool.admit(&format!("s{i}"), *score);
            prop_assert!(pool.len() <= 10);
        }
        prop_assert!(pool.snapshot().iter().all(|e| e.score >= 40.0));
    }

    #[test]
    fn pool_keeps_the_best_scores(
        scores in proptest::collection::vec(40.0..100.0f64, 11..40),
    ) {
        let pool = PoolManager::new(PoolConfig {
            max_size: 10,
            min_score: 40.0,
        });
        for (i, score) in scores.iter().enumerate() {
            pool.admit(&format!("s{i}"), *score);
        }
        // Whatever survived must outscore (or tie) everything evicted or
        // rejected: the pool's worst is at least the 10th-best offered.
        let mut sorted = scores.clone();
        sorted.sort_by(|a, b| b.partial_cmp(a).unwrap());
        let snapshot = pool.snapshot();
        let worst_kept = snapshot.last().map(|e| e.score).unwrap_or(0.0);
        prop_assert!(worst_kept >= sorted[9] - 1e-9);
    }
}
