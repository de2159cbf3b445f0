use crate::error::CooldownError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Last-alert timestamps per symbol.
///
/// A record is created on the first alert and overwritten by every later one.
/// Nothing expires on its own; whether a record still suppresses alerts is
/// decided by `CooldownPolicy`.
#[async_trait]
pub trait CooldownStore: Send + Sync {
    async fn get(&self, symbol: &str) -> Result<Option<DateTime<Utc>>, CooldownError>;

    async fn set(&self, symbol: &str, at: DateTime<Utc>) -> Result<(), CooldownError>;
}

// Shared, thread-safe store that can be passed around
pub type SharedCooldownStore = Arc<dyn CooldownStore>;

/// Suppresses repeat notifications for a symbol within `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownPolicy {
    pub window: Duration,
}

impl CooldownPolicy {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    /// True while less than `window` has elapsed since the last alert.
    pub fn is_suppressed(&self, last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match last {
            Some(last) => now.signed_duration_since(last) < self.window,
            None => false,
        }
    }
}

/// Process-local store, lost on restart
#[derive(Debug, Default)]
pub struct InMemoryCooldownStore {
    records: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl InMemoryCooldownStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl CooldownStore for InMemoryCooldownStore {
    async fn get(&self, symbol: &str) -> Result<Option<DateTime<Utc>>, CooldownError> {
        Ok(self.records.read().get(symbol).copied())
    }

    async fn set(&self, symbol: &str, at: DateTime<Utc>) -> Result<(), CooldownError> {
        self.records.write().insert(symbol.to_string(), at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn suppressed_inside_window_lifted_after() {
        let policy = CooldownPolicy::new(Duration::hours(4));
        let last = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        assert!(!policy.is_suppressed(None, last));
        assert!(policy.is_suppressed(Some(last), last));
        assert!(policy.is_suppressed(Some(last), last + Duration::minutes(239)));
        assert!(!policy.is_suppressed(Some(last), last + Duration::hours(4)));
        assert!(!policy.is_suppressed(Some(last), last + Duration::hours(5)));
    }

    #[test]
    fn zero_window_never_suppresses() {
        let policy = CooldownPolicy::new(Duration::zero());
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert!(!policy.is_suppressed(Some(now), now));
    }

    #[tokio::test]
    async fn in_memory_store_overwrites_record() {
        let store = InMemoryCooldownStore::new();
        let first = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let second = first + Duration::hours(6);

        assert_eq!(store.get("BTC-USDT-SWAP").await.unwrap(), None);
        store.set("BTC-USDT-SWAP", first).await.unwrap();
        store.set("BTC-USDT-SWAP", second).await.unwrap();

        assert_eq!(store.get("BTC-USDT-SWAP").await.unwrap(), Some(second));
        assert_eq!(store.len(), 1);
    }
}
