use crate::core::currency::RateMap;
use crate::core::rates::{RateSet, RateStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::debug;

const RATES_PARTITION: &str = "rates";

/// Rate store backed by a fjall partition. Values are JSON encoded [`RateSet`]s,
/// iteration follows key (date) order.
pub struct DiskRateStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
    // Serializes read-modify-write updates within this process.
    write_lock: Mutex<()>,
}

impl DiskRateStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        std::fs::create_dir_all(db_path)
            .with_context(|| format!("Failed to create data directory: {}", db_path.display()))?;

        let keyspace = Config::new(db_path.join("fjall_db"))
            .open()
            .context("Failed to open rate database")?;
        let partition = keyspace
            .open_partition(RATES_PARTITION, PartitionCreateOptions::default())
            .context("Failed to open rates partition")?;

        Ok(Self {
            keyspace,
            partition,
            write_lock: Mutex::new(()),
        })
    }

    fn read(&self, date_key: &str) -> Result<Option<RateSet>> {
        match self.partition.get(date_key.as_bytes())? {
            Some(value) => {
                let set: RateSet = serde_json::from_slice(&value)
                    .with_context(|| format!("Corrupt rate set stored under {date_key}"))?;
                Ok(Some(set))
            }
            None => Ok(None),
        }
    }

    fn write(&self, set: &RateSet) -> Result<()> {
        self.partition
            .insert(set.date_key.as_bytes(), serde_json::to_vec(set)?)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!("Persisted rate set for {}", set.date_key);
        Ok(())
    }
}

#[async_trait]
impl RateStore for DiskRateStore {
    async fn get(&self, date_key: &str) -> Result<Option<RateSet>> {
        self.read(date_key)
    }

    async fn upsert_rates(&self, date_key: &str, rates: RateMap) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let set = match self.read(date_key)? {
            Some(existing) => RateSet { rates, ..existing },
            None => RateSet::new(date_key, rates),
        };
        self.write(&set)
    }

    async fn record_attempt(&self, date_key: &str, at: DateTime<Utc>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut set = self
            .read(date_key)?
            .unwrap_or_else(|| RateSet::new(date_key, RateMap::new()));
        set.last_attempt = Some(at);
        self.write(&set)
    }

    async fn all(&self) -> Result<Vec<RateSet>> {
        let mut sets = Vec::new();
        for item in self.partition.iter() {
            let (key, value) = item?;
            match serde_json::from_slice::<RateSet>(&value) {
                Ok(set) => sets.push(set),
                Err(e) => debug!(
                    "Skipping unreadable rate set {}: {}",
                    String::from_utf8_lossy(&key),
                    e
                ),
            }
        }
        Ok(sets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn rates(pairs: &[(&str, f64)]) -> RateMap {
        pairs.iter().map(|(c, r)| (c.to_string(), *r)).collect()
    }

    #[tokio::test]
    async fn test_disk_store_round_trips_across_reopen() {
        let dir = tempdir().unwrap();
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 1, 0, 0).unwrap();
        {
            let store = DiskRateStore::open(dir.path()).unwrap();
            store
                .upsert_rates("2024-03-01", rates(&[("EUR", 0.9), ("USD", 1.0)]))
                .await
                .unwrap();
            store.record_attempt("2024-03-01", at).await.unwrap();
        }

        let store = DiskRateStore::open(dir.path()).unwrap();
        let set = store.get("2024-03-01").await.unwrap().unwrap();
        assert_eq!(set.rates, rates(&[("EUR", 0.9), ("USD", 1.0)]));
        assert_eq!(set.last_attempt, Some(at));
        assert!(store.get("2024-04-01").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_disk_store_iterates_in_date_order() {
        let dir = tempdir().unwrap();
        let store = DiskRateStore::open(dir.path()).unwrap();
        store.upsert_rates("2024-05-01", rates(&[("A", 1.0)])).await.unwrap();
        store.upsert_rates("2023-11-01", rates(&[("B", 1.0)])).await.unwrap();
        store
            .record_attempt("2024-01-01", Utc::now())
            .await
            .unwrap();

        let keys: Vec<_> = store
            .all()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.date_key)
            .collect();
        assert_eq!(keys, vec!["2023-11-01", "2024-01-01", "2024-05-01"]);
    }
}
