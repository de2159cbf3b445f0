// Alert delivery. Transports (SMTP, Telegram) plug in behind `Notifier`.
use crate::indicators::patterns::{CandleMetrics, Verdict};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// A signal that passed the cooldown check and is ready to be sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub symbol: String,
    pub interval: String,
    pub verdict: Verdict,
    pub metrics: Option<CandleMetrics>,
    pub detected_at: DateTime<Utc>,
}

impl Alert {
    /// Single message line, e.g. `BTC-USDT-SWAP: BIG BULL candle (3.12x avg body)`
    pub fn line(&self) -> String {
        format!("{}: {}", self.symbol, self.verdict)
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a batch of alerts. An empty batch is a no-op.
    async fn notify(&self, alerts: &[Alert]) -> Result<()>;
}

pub type SharedNotifier = Arc<dyn Notifier>;

pub fn render_subject(alerts: &[Alert]) -> String {
    match alerts {
        [] => "Candle pattern alert: nothing to report".to_string(),
        [alert] => format!("ALERT | {} | {}", alert.symbol, alert.verdict),
        [first, ..] => format!(
            "Candle pattern alert ({}): {} signals",
            first.interval,
            alerts.len()
        ),
    }
}

pub fn render_body(alerts: &[Alert]) -> String {
    let interval = alerts
        .first()
        .map(|alert| alert.interval.as_str())
        .unwrap_or("-");

    let mut body = format!(
        "The following pairs matched a candle pattern on the {} chart:\n\n",
        interval
    );
    for alert in alerts {
        body.push_str(&alert.line());
        if let Some(metrics) = &alert.metrics {
            body.push_str(&format!(
                " | close {} | change {:+.2}%",
                metrics.close, metrics.pct_change
            ));
        }
        body.push('\n');
    }
    body
}

/// Writes rendered alerts to the log instead of sending them anywhere.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, alerts: &[Alert]) -> Result<()> {
        if alerts.is_empty() {
            return Ok(());
        }

        info!(alerts = alerts.len(), "{}", render_subject(alerts));
        for alert in alerts {
            info!(
                symbol = %alert.symbol,
                interval = %alert.interval,
                detected_at = %alert.detected_at,
                "{}",
                alert.verdict
            );
        }
        Ok(())
    }
}
