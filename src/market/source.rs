use crate::error::MarketDataError;
use crate::market::models::Candle;
use crate::market::okx::{parse_candles, CandleFilter};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Supplies candles for one instrument, ordered oldest to newest.
#[async_trait]
pub trait MarketDataFetcher: Send + Sync {
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketDataError>;
}

pub type SharedFetcher = Arc<dyn MarketDataFetcher>;

/// Read an OKX candle payload from disk.
pub fn read_candle_file(path: &Path, filter: CandleFilter) -> Result<Vec<Candle>, MarketDataError> {
    let json = std::fs::read_to_string(path).map_err(|source| MarketDataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_candles(&json, filter)
}

/// Serves candles from `<dir>/<symbol>.json` files holding saved OKX
/// `/market/candles` responses.
#[derive(Debug, Clone)]
pub struct JsonDirectorySource {
    dir: PathBuf,
    filter: CandleFilter,
}

impl JsonDirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            filter: CandleFilter::ClosedOnly,
        }
    }

    pub fn with_filter(mut self, filter: CandleFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.json", symbol))
    }
}

#[async_trait]
impl MarketDataFetcher for JsonDirectorySource {
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let path = self.path_for(symbol);
        let json = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| MarketDataError::Io {
                path: path.clone(),
                source,
            })?;

        let mut candles = parse_candles(&json, self.filter)?;
        if candles.len() > limit {
            candles.drain(..candles.len() - limit);
        }

        debug!(symbol, interval, candles = candles.len(), path = %path.display(), "Loaded candles");
        Ok(candles)
    }
}
