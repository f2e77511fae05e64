use crate::core::currency::RateMap;
use crate::core::rates::{RateSet, RateStore};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory rate store. Iterates in insertion order.
#[derive(Clone, Default)]
pub struct MemoryRateStore {
    inner: Arc<Mutex<Vec<RateSet>>>,
}

impl MemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store pre-populated with `sets`, keeping their order.
    pub fn with_sets(sets: impl IntoIterator<Item = RateSet>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(sets.into_iter().collect())),
        }
    }
}

#[async_trait]
impl RateStore for MemoryRateStore {
    async fn get(&self, date_key: &str) -> Result<Option<RateSet>> {
        let sets = self.inner.lock().await;
        Ok(sets.iter().find(|s| s.date_key == date_key).cloned())
    }

    async fn upsert_rates(&self, date_key: &str, rates: RateMap) -> Result<()> {
        let mut sets = self.inner.lock().await;
        match sets.iter_mut().find(|s| s.date_key == date_key) {
            Some(existing) => existing.rates = rates,
            None => sets.push(RateSet::new(date_key, rates)),
        }
        debug!("Stored rates for {}", date_key);
        Ok(())
    }

    async fn record_attempt(&self, date_key: &str, at: DateTime<Utc>) -> Result<()> {
        let mut sets = self.inner.lock().await;
        match sets.iter_mut().find(|s| s.date_key == date_key) {
            Some(existing) => existing.last_attempt = Some(at),
            None => sets.push(RateSet {
                date_key: date_key.to_string(),
                rates: RateMap::new(),
                last_attempt: Some(at),
            }),
        }
        Ok(())
    }

    async fn all(&self) -> Result<Vec<RateSet>> {
        Ok(self.inner.lock().await.clone())
    }
}
