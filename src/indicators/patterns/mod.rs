// Module exports
pub mod big_candle;
pub mod breakout;
pub mod impulse;
pub mod momentum;
mod recognizer;
mod utils;
mod verdict;

// Public exports
pub use recognizer::{classify, CandleClassifier};
pub use verdict::{CandleMetrics, Evaluation, MomentumTier, Verdict};
