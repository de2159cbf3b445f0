use crate::config::ClassifierConfig;
use crate::error::ClassifierError;
use crate::indicators::patterns::utils::*;
use crate::indicators::patterns::{MomentumTier, Verdict};
use crate::market::models::{Candle, Direction};

pub fn min_len(config: &ClassifierConfig) -> usize {
    config.trend_candles.max(1)
}

fn direction_of_move(pct: f64) -> Direction {
    if pct > 0.0 {
        Direction::Bull
    } else {
        Direction::Bear
    }
}

// Price shock on the last candle, or a run of same-signed candles.
// The impulse tier wins: a window never reports both.
pub fn check_momentum(
    candles: &[Candle],
    config: &ClassifierConfig,
) -> Result<Verdict, ClassifierError> {
    if candles.len() < min_len(config) {
        return Ok(Verdict::NoSignal);
    }

    for (offset, candle) in candles.iter().enumerate() {
        if candle.open <= 0.0 {
            return Err(ClassifierError::invalid_candle(offset, "open must be positive"));
        }
    }

    let last = &candles[candles.len() - 1];
    let last_pct = pct_change(last);

    if last_pct.abs() >= config.impulse_threshold_pct {
        return Ok(Verdict::Momentum {
            direction: direction_of_move(last_pct),
            magnitude: last_pct,
            tier: MomentumTier::Impulse,
        });
    }

    let recent = &candles[candles.len() - config.trend_candles..];
    let changes: Vec<f64> = recent.iter().map(pct_change).collect();

    let same_sign =
        changes.iter().all(|pct| *pct > 0.0) || changes.iter().all(|pct| *pct < 0.0);
    let no_single_impulse = changes
        .iter()
        .all(|pct| pct.abs() < config.impulse_threshold_pct);
    let total: f64 = changes.iter().sum();

    if same_sign && no_single_impulse && total.abs() >= config.trend_threshold_pct {
        return Ok(Verdict::Momentum {
            direction: direction_of_move(total),
            magnitude: total,
            tier: MomentumTier::Trend,
        });
    }

    Ok(Verdict::NoSignal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    // One candle per percent move, each opening at 100
    fn moves(pcts: &[f64]) -> Vec<Candle> {
        pcts.iter()
            .enumerate()
            .map(|(i, pct)| {
                let close = 100.0 + pct;
                Candle::new(
                    Utc.timestamp_opt(i as i64 * 1800, 0).unwrap(),
                    100.0,
                    close.max(100.0),
                    close.min(100.0),
                    close,
                    1.0,
                )
            })
            .collect()
    }

    fn tier(verdict: Verdict) -> Option<MomentumTier> {
        match verdict {
            Verdict::Momentum { tier, .. } => Some(tier),
            _ => None,
        }
    }

    #[test]
    fn single_candle_shock_takes_priority() {
        let verdict = check_momentum(&moves(&[4.0, 3.0, 11.0]), &ClassifierConfig::default()).unwrap();
        assert_eq!(tier(verdict), Some(MomentumTier::Impulse));
        assert_eq!(verdict.direction(), Some(Direction::Bull));
    }

    #[test]
    fn dump_is_bearish_impulse() {
        let verdict = check_momentum(&moves(&[0.5, 0.5, -10.0]), &ClassifierConfig::default()).unwrap();
        assert_eq!(tier(verdict), Some(MomentumTier::Impulse));
        assert_eq!(verdict.direction(), Some(Direction::Bear));
    }

    #[test]
    fn same_signed_run_is_trend() {
        let verdict = check_momentum(&moves(&[2.0, 2.5, 3.0]), &ClassifierConfig::default()).unwrap();
        match verdict {
            Verdict::Momentum { tier, magnitude, direction } => {
                assert_eq!(tier, MomentumTier::Trend);
                assert_eq!(direction, Direction::Bull);
                assert!((magnitude - 7.5).abs() < 1e-9);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn mixed_signs_are_not_a_trend() {
        let verdict = check_momentum(&moves(&[5.0, -0.5, 4.0]), &ClassifierConfig::default()).unwrap();
        assert_eq!(verdict, Verdict::NoSignal);
    }

    #[test]
    fn earlier_impulse_candle_blocks_trend() {
        let verdict = check_momentum(&moves(&[12.0, 1.0, 1.0]), &ClassifierConfig::default()).unwrap();
        assert_eq!(verdict, Verdict::NoSignal);
    }

    #[test]
    fn short_window_is_no_signal() {
        let verdict = check_momentum(&moves(&[2.0, 20.0]), &ClassifierConfig::default()).unwrap();
        assert_eq!(verdict, Verdict::NoSignal);
    }
}
