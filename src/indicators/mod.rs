pub mod overlaps;
pub mod patterns;
pub mod ta;
pub mod volatility;
pub mod volume;

// Re-export the calculators and the classifier entry points
pub use self::overlaps::OverlapCalculator;
pub use self::patterns::{classify, CandleClassifier, Evaluation, Verdict};
pub use self::volatility::VolatilityCalculator;
pub use self::volume::VolumeCalculator;
