//! Strategy lifecycle record.

use crate::domain::metrics::MetricsSet;
use crate::domain::parameter_space::ParameterCombo;
use crate::domain::signal::SignalStrategy;

/// Lifecycle status. `Discarded` is terminal (code deleted upstream);
/// `Retired` keeps the code fingerprint reusable; a strategy left in
/// `Validated` may be re-evaluated for pool admission without
/// regenerating code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Candidate,
    Optimized,
    Validated,
    Active,
    Retired,
    Discarded,
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Status::Candidate => "candidate",
            Status::Optimized => "optimized",
            Status::Validated => "validated",
            Status::Active => "active",
            Status::Retired => "retired",
            Status::Discarded => "discarded",
        }
    }
}

/// Latest numbers produced by the pipeline stages; persisted by an
/// external storage collaborator.
#[derive(Debug, Clone, Default)]
pub struct MetricsBag {
    pub best_combo: Option<ParameterCombo>,
    pub is_metrics: Option<MetricsSet>,
    pub oos_metrics: Option<MetricsSet>,
    pub degradation: Option<f64>,
    pub score: Option<f64>,
    pub robustness: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct StrategyRecord {
    pub id: String,
    pub base_code_hash: String,
    pub universe: Vec<String>,
    pub status: Status,
    pub metrics: MetricsBag,
}

impl StrategyRecord {
    pub fn new(strategy: &dyn SignalStrategy) -> Self {
        StrategyRecord {
            id: strategy.id().to_string(),
            base_code_hash: strategy.base_code_hash().to_string(),
            universe: strategy.universe().to_vec(),
            status: Status::Candidate,
            metrics: MetricsBag::default(),
        }
    }
}
