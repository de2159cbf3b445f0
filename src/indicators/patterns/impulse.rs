use crate::config::ClassifierConfig;
use crate::error::ClassifierError;
use crate::indicators::overlaps::OverlapCalculator;
use crate::indicators::patterns::utils::*;
use crate::indicators::patterns::Verdict;
use crate::indicators::volatility::VolatilityCalculator;
use crate::indicators::volume::VolumeCalculator;
use crate::market::models::{Candle, Direction};
use tracing::trace;

pub fn min_len(config: &ClassifierConfig) -> usize {
    [
        config.body_window + 1,
        config.impulse.volume_window + 1,
        // slow EMA has to exist on the last two candles
        config.impulse.ema_slow + 1,
        config.lookback_window + 1,
        config.atr_period,
    ]
    .into_iter()
    .max()
    .unwrap_or(0)
}

/// Indicator values the impulse gates are checked against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpulseInputs {
    pub candle: Candle,
    pub avg_body: f64,
    pub avg_volume: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub ema_slow_prev: f64,
    pub atr: f64,
    /// Highest high of the structure lookback preceding the candle
    pub prior_high: f64,
}

impl ImpulseInputs {
    /// `None` when the window is too short for one of the indicators.
    pub fn from_window(
        candles: &[Candle],
        config: &ClassifierConfig,
    ) -> Result<Option<Self>, ClassifierError> {
        if candles.len() < min_len(config) {
            return Ok(None);
        }

        let last_index = candles.len() - 1;
        let impulse = &config.impulse;

        let avg_body = average_body_before(candles, last_index, config.body_window);
        let avg_volume =
            VolumeCalculator::average_volume_before(candles, last_index, impulse.volume_window);
        let ema_fast = OverlapCalculator::last_two_ema(candles, impulse.ema_fast)?;
        let ema_slow = OverlapCalculator::last_two_ema(candles, impulse.ema_slow)?;
        let atr = VolatilityCalculator::last_atr(candles, config.atr_period)?;
        let prior_high = prior_window(candles, config.lookback_window).and_then(high_low);

        let inputs = match (avg_body, avg_volume, ema_fast, ema_slow, atr, prior_high) {
            (
                Some(avg_body),
                Some(avg_volume),
                Some((ema_fast, _)),
                Some((ema_slow, ema_slow_prev)),
                Some(atr),
                Some((prior_high, _)),
            ) => Some(Self {
                candle: candles[last_index],
                avg_body,
                avg_volume,
                ema_fast,
                ema_slow,
                ema_slow_prev,
                atr,
                prior_high,
            }),
            _ => None,
        };

        Ok(inputs)
    }
}

/// Outcome of each of the eight impulse gates. Every gate is a hard gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImpulseChecks {
    pub bullish: bool,
    pub large_body: bool,
    pub clean_body: bool,
    pub volume_spike: bool,
    pub ema_aligned: bool,
    pub slow_ema_rising: bool,
    pub wide_range: bool,
    pub structure_break: bool,
}

impl ImpulseChecks {
    pub fn evaluate(inputs: &ImpulseInputs, config: &ClassifierConfig) -> Self {
        let impulse = &config.impulse;
        let candle = &inputs.candle;
        let body = body_size(candle.open, candle.close);
        let range = candle_range(candle);

        Self {
            bullish: is_bullish(candle.open, candle.close),
            large_body: body >= impulse.body_multiplier * inputs.avg_body,
            clean_body: body >= impulse.clean_body_ratio * range,
            volume_spike: candle.volume >= impulse.volume_multiplier * inputs.avg_volume,
            ema_aligned: candle.close > inputs.ema_fast && inputs.ema_fast > inputs.ema_slow,
            slow_ema_rising: inputs.ema_slow > inputs.ema_slow_prev,
            wide_range: range >= impulse.atr_multiplier * inputs.atr,
            structure_break: candle.close > inputs.prior_high,
        }
    }

    pub fn all(&self) -> bool {
        self.bullish
            && self.large_body
            && self.clean_body
            && self.volume_spike
            && self.ema_aligned
            && self.slow_ema_rising
            && self.wide_range
            && self.structure_break
    }
}

// Bullish only, there is no bearish mirror of this rule
pub fn check_impulse(
    candles: &[Candle],
    config: &ClassifierConfig,
) -> Result<Verdict, ClassifierError> {
    let inputs = match ImpulseInputs::from_window(candles, config)? {
        Some(inputs) => inputs,
        None => return Ok(Verdict::NoSignal),
    };

    let checks = ImpulseChecks::evaluate(&inputs, config);
    trace!(?checks, "impulse gates");

    if checks.all() {
        Ok(Verdict::Impulse {
            direction: Direction::Bull,
        })
    } else {
        Ok(Verdict::NoSignal)
    }
}
