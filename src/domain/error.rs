//! Domain error types.
//!
//! Runtime errors cover configuration and data access problems only.
//! Gate failures during strategy evaluation are verdicts, not errors; they
//! travel through [`crate::domain::pipeline::Verdict`].

/// Top-level error type for stratgate.
#[derive(Debug, thiserror::Error)]
pub enum StratgateError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no data for {symbol} at {timeframe}")]
    NoData { symbol: String, timeframe: String },

    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&StratgateError> for std::process::ExitCode {
    fn from(err: &StratgateError) -> Self {
        let code: u8 = match err {
            StratgateError::Io(_) => 1,
            StratgateError::ConfigParse { .. }
            | StratgateError::ConfigMissing { .. }
            | StratgateError::ConfigInvalid { .. } => 2,
            StratgateError::Data { .. } => 3,
            StratgateError::NoData { .. } | StratgateError::InsufficientData { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
