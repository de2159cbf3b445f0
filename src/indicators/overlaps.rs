use crate::error::ClassifierError;
use crate::indicators::ta::{ExponentialMovingAverage, Next, SimpleMovingAverage};
use crate::market::models::Candle;
use chrono::{DateTime, Utc};

pub struct OverlapCalculator;

impl OverlapCalculator {
    // Calculate SMA of closes. Empty when there are fewer candles than the period.
    pub fn calculate_sma(
        candles: &[Candle],
        period: usize,
    ) -> Result<Vec<(DateTime<Utc>, f64)>, ClassifierError> {
        let mut sma = SimpleMovingAverage::new(period)?;
        let mut results = Vec::with_capacity(candles.len());

        for candle in candles {
            let value = sma.next(candle.close);
            if !value.is_nan() {
                results.push((candle.open_time, value));
            }
        }

        Ok(results)
    }

    // Calculate EMA of closes. Values only start once `period` candles were seen.
    pub fn calculate_ema(
        candles: &[Candle],
        period: usize,
    ) -> Result<Vec<(DateTime<Utc>, f64)>, ClassifierError> {
        let mut ema = ExponentialMovingAverage::new(period)?;
        let mut results = Vec::with_capacity(candles.len());

        for candle in candles {
            let value = ema.next(candle.close);
            if !value.is_nan() {
                results.push((candle.open_time, value));
            }
        }

        Ok(results)
    }

    /// EMA of closes on the last and the second-to-last candle, in that order.
    pub fn last_two_ema(
        candles: &[Candle],
        period: usize,
    ) -> Result<Option<(f64, f64)>, ClassifierError> {
        let series = Self::calculate_ema(candles, period)?;
        Ok(match series.as_slice() {
            [.., (_, prev), (_, last)] => Some((*last, *prev)),
            _ => None,
        })
    }

    /// Mean of the `period` values immediately preceding index `end`.
    pub fn mean_before(values: &[f64], end: usize, period: usize) -> Option<f64> {
        if period == 0 || end < period || end > values.len() {
            return None;
        }
        Some(values[end - period..end].iter().sum::<f64>() / period as f64)
    }
}
