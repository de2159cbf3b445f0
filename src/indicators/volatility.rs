use crate::error::ClassifierError;
use crate::indicators::ta::{AverageTrueRange, Next, TrueRange};
use crate::market::models::Candle;
use chrono::{DateTime, Utc};

pub struct VolatilityCalculator;

impl VolatilityCalculator {
    // Calculate ATR (Average True Range) for every candle past the warm-up
    pub fn calculate_atr(
        candles: &[Candle],
        period: usize,
    ) -> Result<Vec<(DateTime<Utc>, f64)>, ClassifierError> {
        let mut atr = AverageTrueRange::new(period)?;
        let mut results = Vec::with_capacity(candles.len());

        for candle in candles {
            let value = atr.next(candle);
            if !value.is_nan() {
                results.push((candle.open_time, value));
            }
        }

        Ok(results)
    }

    /// ATR on the last candle of the window, computed over the whole window.
    pub fn last_atr(candles: &[Candle], period: usize) -> Result<Option<f64>, ClassifierError> {
        Ok(Self::calculate_atr(candles, period)?
            .last()
            .map(|(_, value)| *value))
    }

    // Calculate True Range
    pub fn calculate_true_range(candles: &[Candle]) -> Vec<(DateTime<Utc>, f64)> {
        let mut tr = TrueRange::new();
        candles
            .iter()
            .map(|candle| (candle.open_time, tr.next(candle)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn flat(n: usize, range: f64) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                Candle::new(
                    Utc.timestamp_opt(i as i64 * 60, 0).unwrap(),
                    100.0,
                    100.0 + range / 2.0,
                    100.0 - range / 2.0,
                    100.0,
                    1.0,
                )
            })
            .collect()
    }

    #[test]
    fn atr_of_constant_range_is_that_range() {
        let candles = flat(20, 2.0);
        let atr = VolatilityCalculator::last_atr(&candles, 14).unwrap().unwrap();
        assert!((atr - 2.0).abs() < 1e-12);
    }

    #[test]
    fn atr_needs_a_full_period() {
        let candles = flat(13, 2.0);
        assert_eq!(VolatilityCalculator::last_atr(&candles, 14).unwrap(), None);
        assert_eq!(VolatilityCalculator::calculate_atr(&flat(14, 2.0), 14).unwrap().len(), 1);
    }

    #[test]
    fn true_range_has_one_value_per_candle() {
        let candles = flat(5, 1.0);
        assert_eq!(VolatilityCalculator::calculate_true_range(&candles).len(), 5);
    }
}
