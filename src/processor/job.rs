use serde::{Deserialize, Serialize};
use std::fmt;

/// Candles to fetch and classify for one symbol during a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanJob {
    pub symbol: String,
    pub interval: String,
    pub limit: usize,
}

impl ScanJob {
    pub fn new(symbol: impl Into<String>, interval: impl Into<String>, limit: usize) -> Self {
        Self {
            symbol: symbol.into(),
            interval: interval.into(),
            limit,
        }
    }

    pub fn key(&self) -> String {
        format!("{}:{}", self.symbol, self.interval)
    }
}

/// Step of the per-symbol pipeline that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Fetch,
    Classify,
    Cooldown,
    Notify,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::Fetch => write!(f, "fetch"),
            FailureStage::Classify => write!(f, "classify"),
            FailureStage::Cooldown => write!(f, "cooldown"),
            FailureStage::Notify => write!(f, "notify"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanFailure {
    pub symbol: String,
    pub stage: FailureStage,
    pub error: String,
}

impl ScanFailure {
    pub fn new(symbol: impl Into<String>, stage: FailureStage, error: impl fmt::Display) -> Self {
        Self {
            symbol: symbol.into(),
            stage,
            error: error.to_string(),
        }
    }
}

impl fmt::Display for ScanFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed at {}: {}", self.symbol, self.stage, self.error)
    }
}
