use crate::config::Rule;
use crate::market::models::Direction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which momentum tier fired. The tiers are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MomentumTier {
    /// The last candle alone moved past the impulse threshold
    Impulse,
    /// Several same-signed candles add up past the trend threshold
    Trend,
}

/// Outcome of a pattern rule for the most recent candle of a window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Verdict {
    NoSignal,
    BigCandle {
        direction: Direction,
        /// Body over the mean body of the preceding candles, 2 decimals
        ratio: f64,
    },
    Impulse {
        direction: Direction,
    },
    Breakout {
        direction: Direction,
        /// Width of the consolidation range, percent of its low
        range_pct: f64,
        volume_confirmed: bool,
    },
    Momentum {
        direction: Direction,
        /// Percent move: single candle for `Impulse`, summed for `Trend`
        magnitude: f64,
        tier: MomentumTier,
    },
}

impl Verdict {
    pub fn is_signal(&self) -> bool {
        !matches!(self, Verdict::NoSignal)
    }

    pub fn rule(&self) -> Option<Rule> {
        match self {
            Verdict::NoSignal => None,
            Verdict::BigCandle { .. } => Some(Rule::BigCandle),
            Verdict::Impulse { .. } => Some(Rule::Impulse),
            Verdict::Breakout { .. } => Some(Rule::Breakout),
            Verdict::Momentum { .. } => Some(Rule::Momentum),
        }
    }

    pub fn direction(&self) -> Option<Direction> {
        match self {
            Verdict::NoSignal => None,
            Verdict::BigCandle { direction, .. }
            | Verdict::Impulse { direction }
            | Verdict::Breakout { direction, .. }
            | Verdict::Momentum { direction, .. } => Some(*direction),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::NoSignal => write!(f, "no signal"),
            Verdict::BigCandle { direction, ratio } => {
                write!(f, "BIG {} candle ({:.2}x avg body)", direction, ratio)
            }
            Verdict::Impulse { direction } => write!(f, "{} impulse candle", direction),
            Verdict::Breakout {
                direction,
                range_pct,
                volume_confirmed,
            } => {
                let side = match direction {
                    Direction::Bull => "UP",
                    Direction::Bear => "DOWN",
                };
                write!(f, "breakout {} from {:.2}% range", side, range_pct)?;
                if *volume_confirmed {
                    write!(f, " (volume confirmed)")?;
                }
                Ok(())
            }
            Verdict::Momentum {
                direction,
                magnitude,
                tier,
            } => {
                let move_kind = match direction {
                    Direction::Bull => "PUMP",
                    Direction::Bear => "DUMP",
                };
                match tier {
                    MomentumTier::Impulse => write!(f, "{} {:+.2}%", move_kind, magnitude),
                    MomentumTier::Trend => write!(f, "trend {} {:+.2}%", move_kind, magnitude),
                }
            }
        }
    }
}

/// Snapshot of the evaluated candle, kept even when nothing fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleMetrics {
    pub open_time: DateTime<Utc>,
    pub close: f64,
    pub body: f64,
    pub range: f64,
    pub pct_change: f64,
    pub avg_body: Option<f64>,
    pub relative_volume: Option<f64>,
    pub atr: Option<f64>,
    pub ema_fast: Option<f64>,
    pub ema_slow: Option<f64>,
}

/// Every rule that fired on a window, in rule priority order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub signals: Vec<Verdict>,
    /// `None` when the window was too short for every enabled rule
    pub metrics: Option<CandleMetrics>,
}

impl Evaluation {
    /// Highest-priority verdict, or `NoSignal`
    pub fn primary(&self) -> Verdict {
        self.signals.first().copied().unwrap_or(Verdict::NoSignal)
    }
}
