use crate::cache::cooldown::CooldownStore;
use crate::error::CooldownError;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

type Records = BTreeMap<String, i64>;

/// Cooldown records in a flat JSON object `{"BTC-USDT-SWAP": 1709294400}`
/// (unix seconds).
///
/// Every access goes through one async mutex, so a store has at most one
/// writer. Writes land in a temporary sibling file that is then renamed over
/// the target. A missing file reads as an empty store.
#[derive(Debug)]
pub struct JsonFileCooldownStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileCooldownStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Records, CooldownError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(json) if json.trim().is_empty() => Ok(Records::new()),
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Records::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, records: &Records) -> Result<(), CooldownError> {
        let json = serde_json::to_string_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl CooldownStore for JsonFileCooldownStore {
    async fn get(&self, symbol: &str) -> Result<Option<DateTime<Utc>>, CooldownError> {
        let _guard = self.lock.lock().await;
        let records = self.load().await?;

        match records.get(symbol) {
            Some(&value) => Utc
                .timestamp_opt(value, 0)
                .single()
                .map(Some)
                .ok_or_else(|| CooldownError::InvalidTimestamp {
                    symbol: symbol.to_string(),
                    value,
                }),
            None => Ok(None),
        }
    }

    async fn set(&self, symbol: &str, at: DateTime<Utc>) -> Result<(), CooldownError> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        records.insert(symbol.to_string(), at.timestamp());
        self.save(&records).await?;

        debug!(symbol, at = %at, path = %self.path.display(), "Stored cooldown record");
        Ok(())
    }
}
