// Streaming implementations of the few indicators the pattern rules need.
// Warm-up matches pandas `ewm(adjust=False)` and the Python `ta` ATR.

use crate::error::ClassifierError;
use crate::market::models::Candle;

/// The `Next` trait is used for indicators that produce a single value
pub trait Next<T> {
    type Output;
    fn next(&mut self, input: T) -> Self::Output;
}

fn check_period(period: usize) -> Result<(), ClassifierError> {
    if period == 0 {
        return Err(ClassifierError::InvalidConfig(
            "Period must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

/// Exponential Moving Average, pandas `ewm(span=period, adjust=False)` with
/// `min_periods=period`.
///
/// The average is seeded with the first observation and smoothed from the
/// second one on; values before `period` observations are `NaN`.
pub struct ExponentialMovingAverage {
    period: usize,
    alpha: f64,
    value: Option<f64>,
    index: usize,
}

impl ExponentialMovingAverage {
    pub fn new(period: usize) -> Result<Self, ClassifierError> {
        check_period(period)?;

        Ok(Self {
            period,
            alpha: 2.0 / (period as f64 + 1.0),
            value: None,
            index: 0,
        })
    }
}

impl Next<f64> for ExponentialMovingAverage {
    type Output = f64;

    fn next(&mut self, input: f64) -> Self::Output {
        let value = match self.value {
            None => input,
            Some(prev) => input * self.alpha + prev * (1.0 - self.alpha),
        };
        self.value = Some(value);
        self.index += 1;

        if self.index < self.period {
            f64::NAN
        } else {
            value
        }
    }
}

/// Simple Moving Average over the last `period` inputs
pub struct SimpleMovingAverage {
    period: usize,
    values: Vec<f64>,
    sum: f64,
}

impl SimpleMovingAverage {
    pub fn new(period: usize) -> Result<Self, ClassifierError> {
        check_period(period)?;

        Ok(Self {
            period,
            values: Vec::with_capacity(period),
            sum: 0.0,
        })
    }
}

impl Next<f64> for SimpleMovingAverage {
    type Output = f64;

    fn next(&mut self, input: f64) -> Self::Output {
        if self.values.len() >= self.period {
            self.sum -= self.values.remove(0);
        }

        self.values.push(input);
        self.sum += input;

        if self.values.len() < self.period {
            return f64::NAN;
        }

        self.sum / self.period as f64
    }
}

/// True Range of a candle against the previous close.
///
/// The first candle has no previous close, so its true range is its plain
/// high-low range.
#[derive(Default)]
pub struct TrueRange {
    prev_close: Option<f64>,
}

impl TrueRange {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Next<&Candle> for TrueRange {
    type Output = f64;

    fn next(&mut self, candle: &Candle) -> Self::Output {
        let range = candle.high - candle.low;
        let tr = match self.prev_close {
            Some(prev_close) => range
                .max((candle.high - prev_close).abs())
                .max((candle.low - prev_close).abs()),
            None => range,
        };
        self.prev_close = Some(candle.close);
        tr
    }
}

/// Average True Range with Wilder smoothing.
///
/// Seeded with the simple mean of the first `period` true ranges, then
/// `ATR = (prev_ATR * (period-1) + TR) / period`.
pub struct AverageTrueRange {
    period: usize,
    true_range: TrueRange,
    tr_sum: f64,
    atr: Option<f64>,
    index: usize,
}

impl AverageTrueRange {
    pub fn new(period: usize) -> Result<Self, ClassifierError> {
        check_period(period)?;

        Ok(Self {
            period,
            true_range: TrueRange::new(),
            tr_sum: 0.0,
            atr: None,
            index: 0,
        })
    }
}

impl Next<&Candle> for AverageTrueRange {
    type Output = f64;

    fn next(&mut self, candle: &Candle) -> Self::Output {
        let tr = self.true_range.next(candle);
        self.index += 1;

        self.atr = match self.atr {
            Some(prev) => Some((prev * (self.period - 1) as f64 + tr) / self.period as f64),
            None => {
                self.tr_sum += tr;
                if self.index == self.period {
                    Some(self.tr_sum / self.period as f64)
                } else {
                    None
                }
            }
        };

        self.atr.unwrap_or(f64::NAN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn candle(high: f64, low: f64, close: f64) -> Candle {
        Candle::new(Utc.timestamp_opt(0, 0).unwrap(), close, high, low, close, 1.0)
    }

    #[test]
    fn ema_matches_pandas_adjust_false() {
        // pd.Series([10, 11, 12, 13]).ewm(span=3, adjust=False, min_periods=3).mean()
        let mut ema = ExponentialMovingAverage::new(3).unwrap();
        assert!(ema.next(10.0).is_nan());
        assert!(ema.next(11.0).is_nan());
        assert!((ema.next(12.0) - 11.25).abs() < 1e-12);
        assert!((ema.next(13.0) - 12.125).abs() < 1e-12);
    }

    #[test]
    fn sma_warms_up_then_slides() {
        let mut sma = SimpleMovingAverage::new(2).unwrap();
        assert!(sma.next(1.0).is_nan());
        assert_eq!(sma.next(3.0), 2.0);
        assert_eq!(sma.next(5.0), 4.0);
    }

    #[test]
    fn true_range_uses_previous_close_gaps() {
        let mut tr = TrueRange::new();
        assert_eq!(tr.next(&candle(11.0, 9.0, 10.0)), 2.0);
        // gap up: high - prev close dominates
        assert_eq!(tr.next(&candle(15.0, 14.0, 14.5)), 5.0);
        // gap down: prev close - low dominates
        assert_eq!(tr.next(&candle(12.0, 11.0, 11.5)), 3.5);
    }

    #[test]
    fn atr_seeds_with_mean_then_wilder_smooths() {
        let mut atr = AverageTrueRange::new(2).unwrap();
        assert!(atr.next(&candle(11.0, 9.0, 10.0)).is_nan());
        // tr = 2, 2 -> seed 2
        assert_eq!(atr.next(&candle(11.0, 9.0, 10.0)), 2.0);
        // tr = 4 -> (2 * 1 + 4) / 2
        assert_eq!(atr.next(&candle(12.0, 8.0, 10.0)), 3.0);
    }

    #[test]
    fn zero_period_is_rejected() {
        assert!(ExponentialMovingAverage::new(0).is_err());
        assert!(AverageTrueRange::new(0).is_err());
    }
}
