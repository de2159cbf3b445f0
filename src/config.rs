// src/config.rs
use crate::error::ClassifierError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "scanner.toml";
pub const ENV_PREFIX: &str = "SCANNER";

/// Pattern rule families. `Rule::ALL` is also the priority order used when a
/// single verdict has to be picked for a candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    Impulse,
    BigCandle,
    Breakout,
    Momentum,
}

impl Rule {
    pub const ALL: [Rule; 4] = [Rule::Impulse, Rule::BigCandle, Rule::Breakout, Rule::Momentum];
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Impulse => write!(f, "impulse"),
            Rule::BigCandle => write!(f, "big_candle"),
            Rule::Breakout => write!(f, "breakout"),
            Rule::Momentum => write!(f, "momentum"),
        }
    }
}

/// Which price of the current candle has to leave the consolidation range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakoutTrigger {
    /// Close above the range high / below the range low.
    Close,
    /// High above the range high / low below the range low.
    Wick,
}

/// Thresholds of the bullish impulse-trend rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpulseConfig {
    pub body_multiplier: f64,
    /// Minimum share of the candle range taken by the body
    pub clean_body_ratio: f64,
    pub volume_multiplier: f64,
    pub volume_window: usize,
    pub atr_multiplier: f64,
    pub ema_fast: usize,
    pub ema_slow: usize,
}

impl Default for ImpulseConfig {
    fn default() -> Self {
        Self {
            body_multiplier: 2.5,
            clean_body_ratio: 0.65,
            volume_multiplier: 1.8,
            volume_window: 20,
            atr_multiplier: 1.8,
            ema_fast: 9,
            ema_slow: 21,
        }
    }
}

/// Parameters of every pattern rule. Passed explicitly to the classifier so
/// several rule sets can run side by side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Enabled rules. Evaluation order is always `Rule::ALL`.
    pub rules: Vec<Rule>,
    pub body_multiplier: f64,
    pub atr_multiplier: f64,
    pub use_atr_filter: bool,
    /// Number of preceding candles averaged for the body baseline
    pub body_window: usize,
    pub atr_period: usize,
    pub range_threshold_pct: f64,
    /// Absolute volume a breakout candle needs to count as volume-confirmed
    pub volume_threshold: Option<f64>,
    pub breakout_trigger: BreakoutTrigger,
    pub impulse_threshold_pct: f64,
    pub trend_threshold_pct: f64,
    pub trend_candles: usize,
    /// Candles preceding the current one that define the prior range/structure
    pub lookback_window: usize,
    pub impulse: ImpulseConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            rules: Rule::ALL.to_vec(),
            body_multiplier: 2.0,
            atr_multiplier: 2.0,
            use_atr_filter: true,
            body_window: 20,
            atr_period: 14,
            range_threshold_pct: 3.0,
            volume_threshold: None,
            breakout_trigger: BreakoutTrigger::Close,
            impulse_threshold_pct: 10.0,
            trend_threshold_pct: 6.0,
            trend_candles: 3,
            lookback_window: 15,
            impulse: ImpulseConfig::default(),
        }
    }
}

impl ClassifierConfig {
    pub fn is_enabled(&self, rule: Rule) -> bool {
        self.rules.contains(&rule)
    }

    /// Config with only the given rules enabled, everything else default.
    pub fn only(rules: &[Rule]) -> Self {
        Self {
            rules: rules.to_vec(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ClassifierError> {
        let invalid = |msg: String| Err(ClassifierError::InvalidConfig(msg));

        if self.rules.is_empty() {
            return invalid("no pattern rule enabled".to_string());
        }

        let positive = [
            ("body_multiplier", self.body_multiplier),
            ("atr_multiplier", self.atr_multiplier),
            ("impulse_threshold_pct", self.impulse_threshold_pct),
            ("trend_threshold_pct", self.trend_threshold_pct),
            ("impulse.body_multiplier", self.impulse.body_multiplier),
            ("impulse.volume_multiplier", self.impulse.volume_multiplier),
            ("impulse.atr_multiplier", self.impulse.atr_multiplier),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return invalid(format!("{} must be a positive number, got {}", name, value));
            }
        }

        if !self.range_threshold_pct.is_finite() || self.range_threshold_pct < 0.0 {
            return invalid(format!(
                "range_threshold_pct must not be negative, got {}",
                self.range_threshold_pct
            ));
        }

        if !(0.0..=1.0).contains(&self.impulse.clean_body_ratio) {
            return invalid(format!(
                "impulse.clean_body_ratio must be within [0, 1], got {}",
                self.impulse.clean_body_ratio
            ));
        }

        if let Some(threshold) = self.volume_threshold {
            if !threshold.is_finite() || threshold < 0.0 {
                return invalid(format!("volume_threshold must not be negative, got {}", threshold));
            }
        }

        let periods = [
            ("body_window", self.body_window),
            ("atr_period", self.atr_period),
            ("trend_candles", self.trend_candles),
            ("lookback_window", self.lookback_window),
            ("impulse.volume_window", self.impulse.volume_window),
            ("impulse.ema_fast", self.impulse.ema_fast),
            ("impulse.ema_slow", self.impulse.ema_slow),
        ];
        for (name, value) in periods {
            if value == 0 {
                return invalid(format!("{} must be greater than 0", name));
            }
        }

        if self.impulse.ema_fast >= self.impulse.ema_slow {
            return invalid(format!(
                "impulse.ema_fast ({}) must be shorter than impulse.ema_slow ({})",
                self.impulse.ema_fast, self.impulse.ema_slow
            ));
        }

        Ok(())
    }
}

/// How alerts of one scan are handed to the notifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// One notification per alert, sent as soon as the symbol is evaluated
    PerAlert,
    /// One notification carrying every alert, sent at the end of the scan
    Digest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Candle interval requested from the fetcher (e.g. "30m")
    pub interval: String,
    pub candle_limit: usize,
    /// Pause between two symbols
    pub symbol_delay_ms: u64,
    pub delivery: DeliveryMode,
    /// Symbols scanned when none are given on the command line
    pub symbols: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interval: "30m".to_string(),
            candle_limit: 120,
            symbol_delay_ms: 250,
            delivery: DeliveryMode::Digest,
            symbols: Vec::new(),
        }
    }
}

impl ScanConfig {
    pub fn symbol_delay(&self) -> Duration {
        Duration::from_millis(self.symbol_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownConfig {
    pub hours: f64,
    /// JSON file backing the cooldown records; in-memory when unset
    pub path: Option<PathBuf>,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            hours: 4.0,
            path: None,
        }
    }
}

impl CooldownConfig {
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::milliseconds((self.hours.max(0.0) * 3_600_000.0) as i64)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub classifier: ClassifierConfig,
    pub scan: ScanConfig,
    pub cooldown: CooldownConfig,
}

impl Settings {
    /// Load settings from defaults, an optional TOML file and `SCANNER_*`
    /// environment variables, in increasing priority.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings: Settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .context("Failed to build scanner configuration")?
            .try_deserialize()
            .context("Failed to parse scanner configuration")?;

        settings
            .classifier
            .validate()
            .context("Invalid classifier configuration")?;

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        assert!(ClassifierConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_ema_periods() {
        let mut config = ClassifierConfig::default();
        config.impulse.ema_fast = 21;
        config.impulse.ema_slow = 9;
        assert!(matches!(config.validate(), Err(ClassifierError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_empty_rule_set_and_zero_periods() {
        assert!(ClassifierConfig::only(&[]).validate().is_err());

        let config = ClassifierConfig {
            lookback_window: 0,
            ..ClassifierConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn cooldown_window_from_hours() {
        let config = CooldownConfig {
            hours: 1.5,
            path: None,
        };
        assert_eq!(config.window(), chrono::Duration::minutes(90));
    }

    #[test]
    fn loads_partial_toml_file_over_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[classifier]
rules = ["big_candle", "breakout"]
body_multiplier = 3.0
breakout_trigger = "wick"

[scan]
delivery = "per_alert"
symbols = ["BTC-USDT-SWAP"]

[cooldown]
hours = 2.0
"#
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.classifier.rules, vec![Rule::BigCandle, Rule::Breakout]);
        assert_eq!(settings.classifier.body_multiplier, 3.0);
        assert_eq!(settings.classifier.breakout_trigger, BreakoutTrigger::Wick);
        assert_eq!(settings.classifier.atr_period, 14);
        assert_eq!(settings.scan.delivery, DeliveryMode::PerAlert);
        assert_eq!(settings.scan.candle_limit, 120);
        assert_eq!(settings.cooldown.hours, 2.0);
    }
}
