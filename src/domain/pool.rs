//! Bounded, score-ranked strategy leaderboard.
//!
//! Admission logic is a pure function over a leaderboard snapshot and a
//! candidate score; [`PoolManager`] wraps it behind one mutex so the
//! read-then-write decision is atomic.

use std::sync::{Mutex, MutexGuard};
use tracing::info;

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_size: usize,
    pub min_score: f64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            max_size: 300,
            min_score: 40.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoolEntry {
    pub strategy_id: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionDecision {
    Rejected,
    Admitted,
    AdmittedEvicting { evicted: PoolEntry },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReevaluationOutcome {
    Updated,
    Evicted,
    NotAMember,
}

/// Pure admission decision over a snapshot.
pub fn decide_admission(
    entries: &[PoolEntry],
    candidate_score: f64,
    config: &PoolConfig,
) -> AdmissionDecision {
    if candidate_score < config.min_score {
        return AdmissionDecision::Rejected;
    }
    if entries.len() < config.max_size {
        return AdmissionDecision::Admitted;
    }
    match worst_of(entries) {
        Some(worst) if candidate_score > worst.score => AdmissionDecision::AdmittedEvicting {
            evicted: worst.clone(),
        },
        _ => AdmissionDecision::Rejected,
    }
}

fn rescore(
    entries: &mut Vec<PoolEntry>,
    strategy_id: &str,
    new_score: f64,
    config: &PoolConfig,
) -> ReevaluationOutcome {
    let Some(position) = entries.iter().position(|e| e.strategy_id == strategy_id) else {
        return ReevaluationOutcome::NotAMember;
    };

    let worst_other = entries
        .iter()
        .filter(|e| e.strategy_id != strategy_id)
        .map(|e| e.score)
        .fold(f64::INFINITY, f64::min);
    let below_floor = new_score < config.min_score;
    let below_worst = worst_other.is_finite() && new_score < worst_other;

    if below_floor || below_worst {
        entries.remove(position);
        info!(strategy = strategy_id, score = new_score, "pool member evicted on re-score");
        ReevaluationOutcome::Evicted
    } else {
        entries[position].score = new_score;
        ReevaluationOutcome::Updated
    }
}

fn worst_of(entries: &[PoolEntry]) -> Option<&PoolEntry> {
    entries.iter().min_by(|a, b| {
        a.score
            .partial_cmp(&b.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}

#[derive(Debug)]
pub struct PoolManager {
    config: PoolConfig,
    entries: Mutex<Vec<PoolEntry>>,
}

impl PoolManager {
    pub fn new(config: PoolConfig) -> Self {
        PoolManager {
            config,
            entries: Mutex::new(Vec::new()),
        }
    }

    fn guard(&self) -> MutexGuard<'_, Vec<PoolEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Admission, or re-scoring when the id is already a member: one
    /// strategy holds at most one leaderboard slot, so a member is
    /// updated in place (evicted if its fresh score no longer holds up)
    /// instead of pushed a second time.
    pub fn admit(&self, strategy_id: &str, score: f64) -> AdmissionDecision {
        let mut entries = self.guard();
        match rescore(&mut entries, strategy_id, score, &self.config) {
            ReevaluationOutcome::Updated => {
                info!(strategy = strategy_id, score, "pool member re-scored at admission");
                return AdmissionDecision::Admitted;
            }
            ReevaluationOutcome::Evicted => return AdmissionDecision::Rejected,
            ReevaluationOutcome::NotAMember => {}
        }
        let decision = decide_admission(&entries, score, &self.config);
        match &decision {
            AdmissionDecision::Admitted => {
                entries.push(PoolEntry {
                    strategy_id: strategy_id.to_string(),
                    score,
                });
                info!(strategy = strategy_id, score, "admitted to pool");
            }
            AdmissionDecision::AdmittedEvicting { evicted } => {
                let evicted_id = evicted.strategy_id.clone();
                entries.retain(|e| e.strategy_id != evicted_id);
                entries.push(PoolEntry {
                    strategy_id: strategy_id.to_string(),
                    score,
                });
                info!(
                    strategy = strategy_id,
                    score,
                    evicted = evicted_id.as_str(),
                    "admitted to full pool, worst entry evicted"
                );
            }
            AdmissionDecision::Rejected => {
                info!(strategy = strategy_id, score, "pool admission rejected");
            }
        }
        decision
    }

    /// Periodic re-scoring of an existing member: evicted when the new
    /// score falls below the admission floor or below the worst other
    /// member, otherwise updated in place.
    pub fn reevaluate(&self, strategy_id: &str, new_score: f64) -> ReevaluationOutcome {
        let mut entries = self.guard();
        rescore(&mut entries, strategy_id, new_score, &self.config)
    }

    pub fn contains(&self, strategy_id: &str) -> bool {
        self.guard().iter().any(|e| e.strategy_id == strategy_id)
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    /// Entries sorted best-first.
    pub fn snapshot(&self) -> Vec<PoolEntry> {
        let mut entries = self.guard().clone();
        entries.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        entries
    }

    pub fn worst_score(&self) -> Option<f64> {
        worst_of(&self.guard()).map(|e| e.score)
    }
}
