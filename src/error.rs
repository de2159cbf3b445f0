use std::path::PathBuf;
use thiserror::Error;

/// Failures raised while evaluating a candle window.
///
/// A window that is too short for a rule is not an error: the rule simply
/// yields `Verdict::NoSignal`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifierError {
    #[error("invalid candle data at index {index}: {reason}")]
    InvalidCandleData { index: usize, reason: String },

    #[error("invalid classifier config: {0}")]
    InvalidConfig(String),
}

impl ClassifierError {
    pub fn invalid_candle(index: usize, reason: impl Into<String>) -> Self {
        ClassifierError::InvalidCandleData {
            index,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("failed to read candle file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode exchange payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("exchange returned code {code}: {msg}")]
    Exchange { code: String, msg: String },

    #[error("malformed candle row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },
}

#[derive(Debug, Error)]
pub enum CooldownError {
    #[error("cooldown store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cooldown store is not valid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cooldown timestamp {value} for {symbol} is out of range")]
    InvalidTimestamp { symbol: String, value: i64 },
}
