use crate::config::{BreakoutTrigger, ClassifierConfig};
use crate::error::ClassifierError;
use crate::indicators::patterns::utils::*;
use crate::indicators::patterns::Verdict;
use crate::market::models::{Candle, Direction};

pub fn min_len(config: &ClassifierConfig) -> usize {
    config.lookback_window + 1
}

/// Prior range the current candle is measured against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsolidationRange {
    pub high: f64,
    pub low: f64,
    /// (high - low) / low * 100
    pub range_pct: f64,
}

impl ConsolidationRange {
    /// Range of the `lookback` candles preceding the last one.
    pub fn before_last(
        candles: &[Candle],
        lookback: usize,
    ) -> Result<Option<Self>, ClassifierError> {
        let window = match prior_window(candles, lookback) {
            Some(window) if !window.is_empty() => window,
            _ => return Ok(None),
        };
        let (high, low) = match high_low(window) {
            Some(bounds) => bounds,
            None => return Ok(None),
        };

        if low <= 0.0 {
            let start = candles.len() - 1 - lookback;
            let index = window
                .iter()
                .position(|c| c.low <= 0.0)
                .map_or(start, |offset| start + offset);
            return Err(ClassifierError::invalid_candle(
                index,
                "range low must be positive",
            ));
        }

        Ok(Some(Self {
            high,
            low,
            range_pct: (high - low) * 100.0 / low,
        }))
    }

    pub fn is_consolidating(&self, threshold_pct: f64) -> bool {
        self.range_pct <= threshold_pct
    }
}

// Check whether the last candle leaves a tight prior range
pub fn check_breakout(
    candles: &[Candle],
    config: &ClassifierConfig,
) -> Result<Verdict, ClassifierError> {
    if candles.len() < min_len(config) {
        return Ok(Verdict::NoSignal);
    }

    let range = match ConsolidationRange::before_last(candles, config.lookback_window)? {
        Some(range) => range,
        None => return Ok(Verdict::NoSignal),
    };

    if !range.is_consolidating(config.range_threshold_pct) {
        return Ok(Verdict::NoSignal);
    }

    let last = &candles[candles.len() - 1];
    let (up_price, down_price) = match config.breakout_trigger {
        BreakoutTrigger::Close => (last.close, last.close),
        BreakoutTrigger::Wick => (last.high, last.low),
    };

    let direction = if up_price > range.high {
        Direction::Bull
    } else if down_price < range.low {
        Direction::Bear
    } else {
        return Ok(Verdict::NoSignal);
    };

    let volume_confirmed = config
        .volume_threshold
        .map_or(false, |threshold| last.volume >= threshold);

    Ok(Verdict::Breakout {
        direction,
        range_pct: range.range_pct,
        volume_confirmed,
    })
}
