use crate::indicators::overlaps::OverlapCalculator;
use crate::market::models::Candle;

pub struct VolumeCalculator;

impl VolumeCalculator {
    /// Mean volume of the `period` candles preceding index `end`.
    pub fn average_volume_before(candles: &[Candle], end: usize, period: usize) -> Option<f64> {
        let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();
        OverlapCalculator::mean_before(&volumes, end, period)
    }

    /// Ratio of the candle volume at `index` to the mean of the `period` before it.
    pub fn relative_volume(candles: &[Candle], index: usize, period: usize) -> Option<f64> {
        let average = Self::average_volume_before(candles, index, period)?;
        let volume = candles.get(index)?.volume;
        if average > 0.0 {
            Some(volume / average)
        } else {
            None
        }
    }
}
