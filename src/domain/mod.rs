//! Core domain types and logic.

pub mod config_validation;
pub mod error;
pub mod final_backtest;
pub mod metrics;
pub mod ohlcv;
pub mod optimizer;
pub mod parameter_space;
pub mod pipeline;
pub mod pool;
pub mod robustness;
pub mod scorer;
pub mod shuffle;
pub mod signal;
pub mod simulator;
pub mod strategies;
pub mod strategy;
pub mod thresholds;
pub mod walk_forward;
