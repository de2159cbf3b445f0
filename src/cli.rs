// src/cli.rs
use crate::cache::{InMemoryCooldownStore, JsonFileCooldownStore, SharedCooldownStore};
use crate::config::Settings;
use crate::indicators::patterns::CandleClassifier;
use crate::market::okx::{parse_instruments, parse_tickers, CandleFilter};
use crate::market::source::{read_candle_file, JsonDirectorySource};
use crate::market::universe::{map_static_symbols, merge_universe, top_by_volume, usdt_swaps};
use crate::notify::LogNotifier;
use crate::processor::{ScanReport, Scanner};
use crate::utils::{format_time, measure_time};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "candle-scanner")]
#[command(about = "Candle pattern classifier and alert scanner", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./scanner.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify the latest candle of every symbol and send alerts
    Scan {
        /// Directory holding one saved OKX candle payload per symbol (<SYMBOL>.json)
        #[arg(long)]
        candles_dir: PathBuf,

        /// Symbols to scan, comma separated (e.g. "BTC-USDT-SWAP,ETH-USDT-SWAP")
        #[arg(short, long, value_delimiter = ',')]
        symbols: Vec<String>,

        /// Saved OKX instruments payload; enables universe selection
        #[arg(long)]
        instruments: Option<PathBuf>,

        /// Saved OKX tickers payload, ranked by 24h volume
        #[arg(long, requires = "instruments")]
        tickers: Option<PathBuf>,

        /// Number of top-volume swaps taken from the tickers payload
        #[arg(long, default_value = "100")]
        top: usize,

        /// Base assets always scanned when listed (e.g. "SOL,WIF")
        #[arg(long, value_delimiter = ',', requires = "instruments")]
        static_bases: Vec<String>,

        /// Repeat the scan every N minutes until interrupted
        #[arg(long)]
        every: Option<u64>,

        /// Print the scan report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify a saved OKX candle payload
    Classify {
        /// Input file
        #[arg(short, long)]
        file: PathBuf,

        /// Classify every candle of the file instead of only the latest one
        #[arg(long)]
        history: bool,

        /// Keep the still-forming candle
        #[arg(long)]
        include_forming: bool,
    },
}

fn read_payload(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Resolve the scan universe: explicit symbols, then instruments/tickers
/// payloads, then the configured list.
pub fn resolve_symbols(
    settings: &Settings,
    symbols: Vec<String>,
    instruments: Option<&Path>,
    tickers: Option<&Path>,
    top: usize,
    static_bases: &[String],
) -> Result<Vec<String>> {
    if !symbols.is_empty() {
        return Ok(symbols);
    }

    if let Some(instruments) = instruments {
        let valid = usdt_swaps(&parse_instruments(&read_payload(instruments)?)?);

        let ranked = match tickers {
            Some(tickers) => top_by_volume(&parse_tickers(&read_payload(tickers)?)?, &valid, top),
            None => Vec::new(),
        };

        let (mapped, skipped) = map_static_symbols(static_bases, &valid);
        info!(
            "Static mapped: {} | skipped: {} {:?}",
            mapped.len(),
            skipped.len(),
            skipped
        );

        return Ok(merge_universe(&ranked, &mapped));
    }

    Ok(settings.scan.symbols.clone())
}

fn cooldown_store(settings: &Settings) -> SharedCooldownStore {
    match &settings.cooldown.path {
        Some(path) => Arc::new(JsonFileCooldownStore::new(path.clone())),
        None => Arc::new(InMemoryCooldownStore::new()),
    }
}

fn print_report(report: &ScanReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!(
        "Scan {} at {}: {} symbols, {} signals, {} suppressed, {} delivered",
        report.scan_id,
        format_time(&report.started_at),
        report.symbols_scanned,
        report.signals,
        report.suppressed,
        report.delivered
    );
    for alert in &report.alerts {
        println!("  {}", alert.line());
    }
    for failure in &report.failures {
        println!("  ! {}", failure);
    }
    Ok(())
}

/// Execute a command from the CLI
pub async fn execute_command(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Scan {
            candles_dir,
            symbols,
            instruments,
            tickers,
            top,
            static_bases,
            every,
            json,
        } => {
            let symbols = resolve_symbols(
                &settings,
                symbols,
                instruments.as_deref(),
                tickers.as_deref(),
                top,
                &static_bases,
            )?;
            if symbols.is_empty() {
                bail!("No symbols to scan: pass --symbols, --instruments or set scan.symbols");
            }

            let scanner = Scanner::new(
                Arc::new(JsonDirectorySource::new(candles_dir)),
                Arc::new(LogNotifier),
                cooldown_store(&settings),
                &settings,
            )?;

            match every {
                Some(minutes) if minutes > 0 => {
                    info!("Scanning {} symbols every {} minutes", symbols.len(), minutes);
                    tokio::select! {
                        _ = scanner.run_forever(&symbols, Duration::from_secs(minutes * 60)) => {}
                        _ = tokio::signal::ctrl_c() => info!("Interrupted, stopping scanner"),
                    }
                }
                Some(_) => bail!("--every must be at least 1 minute"),
                None => {
                    let report = measure_time("scan", async { Ok(scanner.scan(&symbols).await) }).await?;
                    print_report(&report, json)?;
                }
            }
        }

        Commands::Classify {
            file,
            history,
            include_forming,
        } => {
            let filter = if include_forming {
                CandleFilter::All
            } else {
                CandleFilter::ClosedOnly
            };
            let candles = read_candle_file(&file, filter)
                .with_context(|| format!("Failed to load candles from {}", file.display()))?;
            let classifier = CandleClassifier::new(settings.classifier.clone())?;

            if history {
                let signals = classifier.scan_history(&candles)?;
                println!("Found {} signals in {} candles:", signals.len(), candles.len());
                for (time, verdict) in signals {
                    println!("{} | {}", format_time(&time), verdict);
                }
            } else {
                let evaluation = classifier.evaluate(&candles)?;
                match candles.last() {
                    Some(last) => println!("Latest candle: {}", format_time(&last.open_time)),
                    None => println!("No candles in {}", file.display()),
                }
                println!("Verdict: {}", evaluation.primary());
                for verdict in evaluation.signals.iter().skip(1) {
                    println!("Also: {}", verdict);
                }
                if let Some(metrics) = &evaluation.metrics {
                    println!(
                        "Body: {:.4} | Avg body: {} | Change: {:+.2}% | ATR: {}",
                        metrics.body,
                        metrics
                            .avg_body
                            .map_or_else(|| "-".to_string(), |v| format!("{:.4}", v)),
                        metrics.pct_change,
                        metrics
                            .atr
                            .map_or_else(|| "-".to_string(), |v| format!("{:.4}", v)),
                    );
                }
            }
        }
    }

    Ok(())
}
