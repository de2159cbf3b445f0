use crate::cache::{CooldownPolicy, SharedCooldownStore};
use crate::config::{DeliveryMode, ScanConfig, Settings};
use crate::indicators::patterns::{CandleClassifier, Evaluation};
use crate::market::source::SharedFetcher;
use crate::notify::{Alert, SharedNotifier};
use crate::processor::job::{FailureStage, ScanFailure, ScanJob};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, field, info, instrument, warn, Span};
use uuid::Uuid;

/// Outcome of one pass over the symbol list
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub scan_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub symbols_scanned: usize,
    /// Signals found, suppressed ones included
    pub signals: usize,
    /// Signals skipped because the symbol was still cooling down
    pub suppressed: usize,
    /// Alerts that passed the cooldown check
    pub alerts: Vec<Alert>,
    /// Alerts the notifier accepted
    pub delivered: usize,
    pub failures: Vec<ScanFailure>,
}

impl ScanReport {
    fn new(scan_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            scan_id,
            started_at,
            symbols_scanned: 0,
            signals: 0,
            suppressed: 0,
            alerts: Vec::new(),
            delivered: 0,
            failures: Vec::new(),
        }
    }

    fn fail(&mut self, symbol: &str, stage: FailureStage, err: impl std::fmt::Display) {
        let failure = ScanFailure::new(symbol, stage, err);
        warn!("{}", failure);
        self.failures.push(failure);
    }
}

/// Sequential fetch, classify and notify loop over a symbol list.
///
/// A failing symbol never aborts the scan: the error lands in
/// `ScanReport::failures` and the next symbol is processed.
pub struct Scanner {
    fetcher: SharedFetcher,
    notifier: SharedNotifier,
    cooldown: SharedCooldownStore,
    classifier: CandleClassifier,
    policy: CooldownPolicy,
    config: ScanConfig,
}

impl Scanner {
    pub fn new(
        fetcher: SharedFetcher,
        notifier: SharedNotifier,
        cooldown: SharedCooldownStore,
        settings: &Settings,
    ) -> Result<Self> {
        let classifier = CandleClassifier::new(settings.classifier.clone())
            .context("Failed to create candle classifier")?;

        Ok(Self {
            fetcher,
            notifier,
            cooldown,
            classifier,
            policy: CooldownPolicy::new(settings.cooldown.window()),
            config: settings.scan.clone(),
        })
    }

    pub async fn scan(&self, symbols: &[String]) -> ScanReport {
        self.scan_at(symbols, Utc::now()).await
    }

    /// Scan with an explicit clock; alerts and cooldown records use `now`.
    #[instrument(skip(self, symbols, now), fields(scan_id = field::Empty, symbols = symbols.len()))]
    pub async fn scan_at(&self, symbols: &[String], now: DateTime<Utc>) -> ScanReport {
        let scan_id = Uuid::new_v4();
        Span::current().record("scan_id", field::display(scan_id));
        let mut report = ScanReport::new(scan_id, now);
        let mut digest = Vec::new();

        info!("Starting scan of {} symbols", symbols.len());

        for (position, symbol) in symbols.iter().enumerate() {
            if position > 0 && !self.config.symbol_delay().is_zero() {
                tokio::time::sleep(self.config.symbol_delay()).await;
            }

            let job = ScanJob::new(symbol.as_str(), self.config.interval.as_str(), self.config.candle_limit);
            report.symbols_scanned += 1;

            let alerts = match self.process_symbol(&job, now, &mut report).await {
                Some(alerts) => alerts,
                None => continue,
            };

            match self.config.delivery {
                DeliveryMode::PerAlert => {
                    for alert in alerts {
                        self.deliver(std::slice::from_ref(&alert), now, &mut report).await;
                        report.alerts.push(alert);
                    }
                }
                DeliveryMode::Digest => digest.extend(alerts),
            }
        }

        if !digest.is_empty() {
            self.deliver(&digest, now, &mut report).await;
            report.alerts.extend(digest);
        }

        info!(
            scanned = report.symbols_scanned,
            signals = report.signals,
            suppressed = report.suppressed,
            delivered = report.delivered,
            failures = report.failures.len(),
            "Scan finished"
        );

        report
    }

    /// Alerts for one symbol, or `None` when there is nothing to send.
    #[instrument(skip(self, now, report), fields(symbol = %job.symbol))]
    async fn process_symbol(
        &self,
        job: &ScanJob,
        now: DateTime<Utc>,
        report: &mut ScanReport,
    ) -> Option<Vec<Alert>> {
        let candles = match self
            .fetcher
            .fetch_candles(&job.symbol, &job.interval, job.limit)
            .await
        {
            Ok(candles) => candles,
            Err(e) => {
                report.fail(&job.symbol, FailureStage::Fetch, e);
                return None;
            }
        };

        let Evaluation { signals, metrics } = match self.classifier.evaluate(&candles) {
            Ok(evaluation) => evaluation,
            Err(e) => {
                report.fail(&job.symbol, FailureStage::Classify, e);
                return None;
            }
        };

        if let Some(metrics) = &metrics {
            debug!(
                candles = candles.len(),
                close = metrics.close,
                pct_change = metrics.pct_change,
                relative_volume = ?metrics.relative_volume,
                signals = signals.len(),
                "Evaluated {}",
                job.key()
            );
        } else {
            debug!(candles = candles.len(), "Not enough candles for any rule");
        }

        if signals.is_empty() {
            return None;
        }
        report.signals += signals.len();

        let last_alert = match self.cooldown.get(&job.symbol).await {
            Ok(last_alert) => last_alert,
            Err(e) => {
                report.fail(&job.symbol, FailureStage::Cooldown, e);
                return None;
            }
        };

        if self.policy.is_suppressed(last_alert, now) {
            report.suppressed += signals.len();
            info!(
                last_alert = ?last_alert,
                "Cooling down, skipping {} signal(s)",
                signals.len()
            );
            return None;
        }

        Some(
            signals
                .into_iter()
                .map(|verdict| Alert {
                    symbol: job.symbol.clone(),
                    interval: job.interval.clone(),
                    verdict,
                    metrics: metrics.clone(),
                    detected_at: now,
                })
                .collect(),
        )
    }

    async fn deliver(&self, alerts: &[Alert], now: DateTime<Utc>, report: &mut ScanReport) {
        let symbols: BTreeSet<&str> = alerts.iter().map(|alert| alert.symbol.as_str()).collect();

        if let Err(e) = self.notifier.notify(alerts).await {
            error!("Failed to deliver {} alert(s): {:#}", alerts.len(), e);
            for symbol in symbols {
                report.fail(symbol, FailureStage::Notify, format!("{:#}", e));
            }
            return;
        }

        report.delivered += alerts.len();
        for symbol in symbols {
            if let Err(e) = self.cooldown.set(symbol, now).await {
                report.fail(symbol, FailureStage::Cooldown, e);
            }
        }
    }

    /// Repeat `scan` every `every` until the task is dropped.
    pub async fn run_forever(&self, symbols: &[String], every: Duration) {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let report = self.scan(symbols).await;
            if !report.failures.is_empty() {
                warn!(
                    scan_id = %report.scan_id,
                    "{} symbol(s) failed during scan",
                    report.failures.len()
                );
            }
        }
    }
}
