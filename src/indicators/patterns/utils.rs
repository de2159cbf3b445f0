use crate::error::ClassifierError;
use crate::indicators::overlaps::OverlapCalculator;
use crate::market::models::{Candle, Direction};

// Helper functions for pattern recognition
pub fn is_bullish(open: f64, close: f64) -> bool {
    close > open
}

pub fn body_size(open: f64, close: f64) -> f64 {
    (open - close).abs()
}

pub fn candle_range(candle: &Candle) -> f64 {
    candle.high - candle.low
}

pub fn direction_of(candle: &Candle) -> Direction {
    if is_bullish(candle.open, candle.close) {
        Direction::Bull
    } else {
        Direction::Bear
    }
}

/// Percent move from open to close. Callers guarantee `open > 0`.
pub fn pct_change(candle: &Candle) -> f64 {
    (candle.close - candle.open) / candle.open * 100.0
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn bodies(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| body_size(c.open, c.close)).collect()
}

/// Mean body of the `period` candles preceding index `end`.
pub fn average_body_before(candles: &[Candle], end: usize, period: usize) -> Option<f64> {
    OverlapCalculator::mean_before(&bodies(candles), end, period)
}

/// Highest high and lowest low of a slice, `None` for an empty slice.
pub fn high_low(candles: &[Candle]) -> Option<(f64, f64)> {
    let first = candles.first()?;
    Some(candles.iter().fold((first.high, first.low), |(high, low), c| {
        (high.max(c.high), low.min(c.low))
    }))
}

/// The `lookback` candles immediately preceding the last one.
pub fn prior_window(candles: &[Candle], lookback: usize) -> Option<&[Candle]> {
    let last_index = candles.len().checked_sub(1)?;
    let start = last_index.checked_sub(lookback)?;
    Some(&candles[start..last_index])
}

/// Reject candles that would make a rule divide by zero or compare garbage.
pub fn validate_window(candles: &[Candle]) -> Result<(), ClassifierError> {
    for (index, candle) in candles.iter().enumerate() {
        let fields = [
            ("open", candle.open),
            ("high", candle.high),
            ("low", candle.low),
            ("close", candle.close),
            ("volume", candle.volume),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(ClassifierError::invalid_candle(
                    index,
                    format!("{} is not finite ({})", name, value),
                ));
            }
            if value < 0.0 {
                return Err(ClassifierError::invalid_candle(
                    index,
                    format!("{} is negative ({})", name, value),
                ));
            }
        }
        if candle.open <= 0.0 {
            return Err(ClassifierError::invalid_candle(index, "open must be positive"));
        }
        if candle.close <= 0.0 {
            return Err(ClassifierError::invalid_candle(index, "close must be positive"));
        }
    }
    Ok(())
}
