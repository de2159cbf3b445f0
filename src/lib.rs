// Export all necessary modules
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod indicators;
pub mod market;
pub mod notify;
pub mod processor;
pub mod utils;

pub use crate::config::{ClassifierConfig, Rule, Settings};
pub use crate::error::{ClassifierError, CooldownError, MarketDataError};
pub use crate::indicators::patterns::{classify, CandleClassifier, Evaluation, Verdict};
pub use crate::market::models::{Candle, Direction};
