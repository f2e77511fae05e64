pub mod open_exchange;
pub mod util;

pub use open_exchange::OpenExchangeRatesProvider;

use crate::core::currency::{RateMap, RateProvider};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Used when no provider is configured: every fetch fails, so only stored rates are served.
pub struct OfflineRateProvider;

#[async_trait]
impl RateProvider for OfflineRateProvider {
    async fn fetch_historical_rates(&self, date: NaiveDate) -> Result<RateMap> {
        Err(anyhow!("No rate provider configured, cannot fetch rates for {date}"))
    }

    async fn fetch_latest_rates(&self) -> Result<RateMap> {
        Err(anyhow!("No rate provider configured, cannot fetch latest rates"))
    }
}
