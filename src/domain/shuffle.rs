//! Empirical lookahead-bias test.
//!
//! Runs the strategy's signal function over a recent price window twice:
//! once in chronological order, once over a seeded row-shuffled permutation
//! of the same candles. A strategy reading only causally-available history
//! must produce different signal sequences; identical sequences mean the
//! logic is keyed to absolute values rather than temporal order, which is
//! how lookahead bias survives static analysis.
//!
//! Verdicts are cached by base-code hash: the property belongs to the
//! signal logic, not the parameters, so every parameter variant of tested
//! code gets a cache hit.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

use crate::domain::ohlcv::PriceSeries;
use crate::domain::signal::{Direction, SignalStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuffleVerdict {
    Passed,
    LookaheadDetected,
}

#[derive(Debug, Clone)]
pub struct ShuffleConfig {
    /// Number of trailing bars of the reference instrument to test on.
    pub window_bars: usize,
    /// Seed for the permutation; fixed so verdicts are reproducible.
    pub seed: u64,
}

impl Default for ShuffleConfig {
    fn default() -> Self {
        ShuffleConfig {
            window_bars: 500,
            seed: 0x5ead_c0de,
        }
    }
}

/// Verdict cache keyed by base-code hash. Entries are immutable once
/// written; concurrent writers racing on the same hash keep the first
/// verdict.
#[derive(Debug, Default)]
pub struct ShuffleCache {
    inner: RwLock<HashMap<String, ShuffleVerdict>>,
}

impl ShuffleCache {
    pub fn new() -> Self {
        ShuffleCache::default()
    }

    pub fn get(&self, base_code_hash: &str) -> Option<ShuffleVerdict> {
        self.inner
            .read()
            .ok()
            .and_then(|map| map.get(base_code_hash).copied())
    }

    /// Insert-if-absent; returns whichever verdict the cache holds after
    /// the call.
    fn put(&self, base_code_hash: &str, verdict: ShuffleVerdict) -> ShuffleVerdict {
        match self.inner.write() {
            Ok(mut map) => *map
                .entry(base_code_hash.to_string())
                .or_insert(verdict),
            Err(_) => verdict,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Runs the shuffle test, consulting the cache first.
pub fn run_shuffle_test(
    strategy: &dyn SignalStrategy,
    reference: &PriceSeries,
    cache: &ShuffleCache,
    config: &ShuffleConfig,
) -> ShuffleVerdict {
    if let Some(verdict) = cache.get(strategy.base_code_hash()) {
        debug!(
            strategy = strategy.id(),
            hash = strategy.base_code_hash(),
            "shuffle verdict from cache"
        );
        return verdict;
    }

    let verdict = shuffle_verdict(strategy, reference, config);
    cache.put(strategy.base_code_hash(), verdict)
}

fn shuffle_verdict(
    strategy: &dyn SignalStrategy,
    reference: &PriceSeries,
    config: &ShuffleConfig,
) -> ShuffleVerdict {
    let window = reference.tail(config.window_bars);
    let warmup = strategy.warmup_bars().max(2);
    // Too little data to distinguish ordered from shuffled.
    if window.len() < warmup + 8 {
        return ShuffleVerdict::Passed;
    }

    let ordered = signal_sequence(strategy, window, warmup);

    let mut shuffled = window.to_vec();
    let mut rng = StdRng::seed_from_u64(config.seed);
    shuffled.shuffle(&mut rng);
    let permuted = signal_sequence(strategy, &shuffled, warmup);

    if ordered == permuted {
        ShuffleVerdict::LookaheadDetected
    } else {
        ShuffleVerdict::Passed
    }
}

fn signal_sequence(
    strategy: &dyn SignalStrategy,
    window: &[crate::domain::ohlcv::Candle],
    warmup: usize,
) -> Vec<Option<Direction>> {
    (warmup..window.len())
        .map(|i| strategy.signal(&window[..=i]).map(|s| s.direction))
        .collect()
}
