use crate::config::{ClassifierConfig, Rule};
use crate::error::ClassifierError;
use crate::indicators::overlaps::OverlapCalculator;
use crate::indicators::patterns::utils::*;
use crate::indicators::patterns::{big_candle, breakout, impulse, momentum};
use crate::indicators::patterns::{CandleMetrics, Evaluation, Verdict};
use crate::indicators::volatility::VolatilityCalculator;
use crate::indicators::volume::VolumeCalculator;
use crate::market::models::Candle;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::debug;

fn rule_min_len(rule: Rule, config: &ClassifierConfig) -> usize {
    match rule {
        Rule::Impulse => impulse::min_len(config),
        Rule::BigCandle => big_candle::min_len(config),
        Rule::Breakout => breakout::min_len(config),
        Rule::Momentum => momentum::min_len(config),
    }
}

fn check_rule(
    rule: Rule,
    candles: &[Candle],
    config: &ClassifierConfig,
) -> Result<Verdict, ClassifierError> {
    match rule {
        Rule::Impulse => impulse::check_impulse(candles, config),
        Rule::BigCandle => big_candle::check_big_candle(candles, config),
        Rule::Breakout => breakout::check_breakout(candles, config),
        Rule::Momentum => momentum::check_momentum(candles, config),
    }
}

/// Applies the enabled pattern rules to the most recent candle of a window.
///
/// The classifier holds no state besides its configuration: every call
/// recomputes the derived series from the window it is given.
#[derive(Debug, Clone)]
pub struct CandleClassifier {
    config: ClassifierConfig,
}

impl CandleClassifier {
    pub fn new(config: ClassifierConfig) -> Result<Self, ClassifierError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    fn enabled_rules(&self) -> impl Iterator<Item = Rule> + '_ {
        Rule::ALL
            .into_iter()
            .filter(move |rule| self.config.is_enabled(*rule))
    }

    /// Every rule that fires on the last candle, in priority order, plus a
    /// metrics snapshot of that candle.
    pub fn evaluate(&self, candles: &[Candle]) -> Result<Evaluation, ClassifierError> {
        let has_data = self
            .enabled_rules()
            .any(|rule| candles.len() >= rule_min_len(rule, &self.config));
        if !has_data {
            return Ok(Evaluation::default());
        }

        validate_window(candles)?;
        let metrics = self.metrics(candles)?;

        let mut signals = Vec::new();
        for rule in self.enabled_rules() {
            let verdict = check_rule(rule, candles, &self.config)?;
            if verdict.is_signal() {
                signals.push(verdict);
            }
        }

        debug!(
            candles = candles.len(),
            signals = signals.len(),
            pct_change = metrics.pct_change,
            "Evaluated candle window"
        );

        Ok(Evaluation {
            signals,
            metrics: Some(metrics),
        })
    }

    /// Highest-priority verdict for the last candle.
    pub fn classify(&self, candles: &[Candle]) -> Result<Verdict, ClassifierError> {
        Ok(self.evaluate(candles)?.primary())
    }

    /// Classify every prefix of the series, as if each candle had just closed.
    /// Only candles with a signal are returned, oldest first.
    pub fn scan_history(
        &self,
        candles: &[Candle],
    ) -> Result<Vec<(DateTime<Utc>, Verdict)>, ClassifierError> {
        let verdicts: Vec<Option<(DateTime<Utc>, Verdict)>> = (0..candles.len())
            .into_par_iter()
            .map(|index| {
                let verdict = self.classify(&candles[..=index])?;
                Ok(verdict
                    .is_signal()
                    .then(|| (candles[index].open_time, verdict)))
            })
            .collect::<Result<_, ClassifierError>>()?;

        Ok(verdicts.into_iter().flatten().collect())
    }

    fn metrics(&self, candles: &[Candle]) -> Result<CandleMetrics, ClassifierError> {
        let last_index = candles.len() - 1;
        let last = &candles[last_index];
        let config = &self.config;

        let ema_fast = OverlapCalculator::last_two_ema(candles, config.impulse.ema_fast)?;
        let ema_slow = OverlapCalculator::last_two_ema(candles, config.impulse.ema_slow)?;

        Ok(CandleMetrics {
            open_time: last.open_time,
            close: last.close,
            body: body_size(last.open, last.close),
            range: candle_range(last),
            pct_change: pct_change(last),
            avg_body: average_body_before(candles, last_index, config.body_window),
            relative_volume: VolumeCalculator::relative_volume(
                candles,
                last_index,
                config.impulse.volume_window,
            ),
            atr: VolatilityCalculator::last_atr(candles, config.atr_period)?,
            ema_fast: ema_fast.map(|(last, _)| last),
            ema_slow: ema_slow.map(|(last, _)| last),
        })
    }
}

/// One-shot classification with an explicit configuration.
pub fn classify(candles: &[Candle], config: &ClassifierConfig) -> Result<Verdict, ClassifierError> {
    CandleClassifier::new(config.clone())?.classify(candles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::patterns::MomentumTier;
    use crate::market::models::Direction;
    use chrono::TimeZone;

    fn candle(i: i64, open: f64, close: f64) -> Candle {
        Candle::new(
            Utc.timestamp_opt(i * 1800, 0).unwrap(),
            open,
            open.max(close) + 0.25,
            open.min(close) - 0.25,
            close,
            100.0,
        )
    }

    fn flat(n: i64) -> Vec<Candle> {
        (0..n).map(|i| candle(i, 100.0, 100.5)).collect()
    }

    #[test]
    fn short_window_is_no_signal_even_with_bad_data() {
        let classifier = CandleClassifier::new(ClassifierConfig::default()).unwrap();
        let candles = vec![candle(0, -1.0, 5.0), candle(1, 1.0, 2.0)];
        let evaluation = classifier.evaluate(&candles).unwrap();
        assert!(evaluation.signals.is_empty());
        assert!(evaluation.metrics.is_none());
    }

    #[test]
    fn invalid_candle_is_reported_once_a_rule_has_data() {
        let classifier = CandleClassifier::new(ClassifierConfig::default()).unwrap();
        let mut candles = flat(5);
        candles[2].close = 0.0;
        match classifier.classify(&candles) {
            Err(ClassifierError::InvalidCandleData { index, .. }) => assert_eq!(index, 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn priority_prefers_big_candle_over_momentum() {
        // +12% on the last candle: both a big body and a price shock
        let mut candles = flat(30);
        candles.push(candle(30, 100.0, 112.0));
        let config = ClassifierConfig {
            use_atr_filter: false,
            ..ClassifierConfig::only(&[Rule::BigCandle, Rule::Momentum])
        };
        let classifier = CandleClassifier::new(config).unwrap();

        let evaluation = classifier.evaluate(&candles).unwrap();
        assert_eq!(evaluation.signals.len(), 2);
        assert_eq!(evaluation.signals[0].rule(), Some(Rule::BigCandle));
        assert_eq!(evaluation.signals[1].rule(), Some(Rule::Momentum));
        assert_eq!(
            classifier.classify(&candles).unwrap(),
            Verdict::BigCandle {
                direction: Direction::Bull,
                ratio: 24.0
            }
        );
    }

    #[test]
    fn disabled_rule_never_fires() {
        let mut candles = flat(30);
        candles.push(candle(30, 100.0, 112.0));
        let verdict = classify(&candles, &ClassifierConfig::only(&[Rule::Momentum])).unwrap();
        match verdict {
            Verdict::Momentum { tier, .. } => assert_eq!(tier, MomentumTier::Impulse),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn metrics_are_reported_without_signal() {
        let classifier = CandleClassifier::new(ClassifierConfig::default()).unwrap();
        let evaluation = classifier.evaluate(&flat(30)).unwrap();
        let metrics = evaluation.metrics.unwrap();
        assert_eq!(metrics.body, 0.5);
        assert_eq!(metrics.avg_body, Some(0.5));
        assert_eq!(metrics.relative_volume, Some(1.0));
        assert!(metrics.atr.is_some());
    }

    #[test]
    fn scan_history_reports_signal_indices_in_order() {
        let mut candles = flat(10);
        candles.push(candle(10, 100.0, 111.0));
        candles.extend((11..15).map(|i| candle(i, 100.0, 100.5)));
        candles.push(candle(15, 100.0, 88.0));

        let classifier = CandleClassifier::new(ClassifierConfig::only(&[Rule::Momentum])).unwrap();
        let history = classifier.scan_history(&candles).unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].0, candles[10].open_time);
        assert_eq!(history[0].1.direction(), Some(Direction::Bull));
        assert_eq!(history[1].0, candles[15].open_time);
        assert_eq!(history[1].1.direction(), Some(Direction::Bear));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ClassifierConfig {
            body_multiplier: 0.0,
            ..ClassifierConfig::default()
        };
        assert!(matches!(
            CandleClassifier::new(config),
            Err(ClassifierError::InvalidConfig(_))
        ));
    }
}
