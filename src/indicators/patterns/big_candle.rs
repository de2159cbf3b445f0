use crate::config::ClassifierConfig;
use crate::error::ClassifierError;
use crate::indicators::patterns::utils::*;
use crate::indicators::patterns::Verdict;
use crate::indicators::volatility::VolatilityCalculator;
use crate::market::models::Candle;

/// Candles needed: the body baseline plus the current candle, and a full ATR
/// period when the ATR filter is on.
pub fn min_len(config: &ClassifierConfig) -> usize {
    let base = config.body_window + 1;
    if config.use_atr_filter {
        base.max(config.atr_period)
    } else {
        base
    }
}

// Check whether the last candle's body dwarfs the recent average body
pub fn check_big_candle(
    candles: &[Candle],
    config: &ClassifierConfig,
) -> Result<Verdict, ClassifierError> {
    if candles.len() < min_len(config) {
        return Ok(Verdict::NoSignal);
    }

    let last_index = candles.len() - 1;
    let last = &candles[last_index];
    let body = body_size(last.open, last.close);

    // A doji has no direction to report
    if body <= 0.0 {
        return Ok(Verdict::NoSignal);
    }

    let avg_body = match average_body_before(candles, last_index, config.body_window) {
        Some(avg_body) => avg_body,
        None => return Ok(Verdict::NoSignal),
    };

    if body < config.body_multiplier * avg_body {
        return Ok(Verdict::NoSignal);
    }

    if config.use_atr_filter {
        let atr = match VolatilityCalculator::last_atr(candles, config.atr_period)? {
            Some(atr) => atr,
            None => return Ok(Verdict::NoSignal),
        };
        if candle_range(last) < config.atr_multiplier * atr {
            return Ok(Verdict::NoSignal);
        }
    }

    let ratio = if avg_body > 0.0 {
        round2(body / avg_body)
    } else {
        f64::INFINITY
    };

    Ok(Verdict::BigCandle {
        direction: direction_of(last),
        ratio,
    })
}
