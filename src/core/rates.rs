//! Month-keyed exchange-rate snapshots and their persistence abstraction.
use crate::core::currency::RateMap;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Source key of the all-ones table used when a caller explicitly opts out of resolution.
pub const DEFAULT_RATES_KEY: &str = "default";

/// A persisted rate snapshot, at most one per calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSet {
    /// Canonical `YYYY-MM-01` key.
    pub date_key: String,
    #[serde(default)]
    pub rates: RateMap,
    #[serde(default)]
    pub last_attempt: Option<DateTime<Utc>>,
}

impl RateSet {
    pub fn new(date_key: impl Into<String>, rates: RateMap) -> Self {
        Self {
            date_key: date_key.into(),
            rates,
            last_attempt: None,
        }
    }

    /// An empty rate map counts as no data.
    pub fn has_rates(&self) -> bool {
        !self.rates.is_empty()
    }

    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date_key, "%Y-%m-%d").ok()
    }
}

/// Rates resolved for a month, tagged with the key of the snapshot they came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRates {
    pub rates: RateMap,
    pub source_date_key: String,
}

impl ResolvedRates {
    pub fn new(rates: RateMap, source_date_key: impl Into<String>) -> Self {
        Self {
            rates,
            source_date_key: source_date_key.into(),
        }
    }

    /// Empty table: every currency falls back to rate `1.0`.
    pub fn default_table() -> Self {
        Self::new(RateMap::new(), DEFAULT_RATES_KEY)
    }

    pub fn is_default_table(&self) -> bool {
        self.source_date_key == DEFAULT_RATES_KEY
    }
}

#[derive(Debug, Error)]
pub enum RatesError {
    #[error("no exchange rates available for {date_key}")]
    NotFound { date_key: String },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Persistence for [`RateSet`]s keyed by `YYYY-MM-01`.
#[async_trait]
pub trait RateStore: Send + Sync {
    async fn get(&self, date_key: &str) -> Result<Option<RateSet>>;

    /// Replaces the rates under `date_key`, keeping its attempt timestamp.
    async fn upsert_rates(&self, date_key: &str, rates: RateMap) -> Result<()>;

    /// Stamps a refresh attempt, creating an empty set when none exists.
    async fn record_attempt(&self, date_key: &str, at: DateTime<Utc>) -> Result<()>;

    /// Every stored set, in the store's iteration order.
    async fn all(&self) -> Result<Vec<RateSet>>;
}
