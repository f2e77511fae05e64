//! Command handlers behind the `fxbudget` binary.
pub mod month;
pub mod rates;
pub mod seed;
pub mod setup;
pub mod ui;
pub mod year;

use crate::core::cache::Cache;
use crate::core::clock::{Clock, SystemClock};
use crate::core::config::AppConfig;
use crate::core::currency::RateProvider;
use crate::core::rates::RateStore;
use crate::core::resolver::ExchangeRateResolver;
use crate::core::scheduler::RateUpdater;
use crate::providers::{OfflineRateProvider, OpenExchangeRatesProvider};
use crate::store::DiskRateStore;
use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Collaborators shared by all commands for one run.
pub struct AppContext {
    pub config: AppConfig,
    pub store: Arc<dyn RateStore>,
    pub provider: Arc<dyn RateProvider>,
    pub clock: Arc<dyn Clock>,
    pub resolver: ExchangeRateResolver,
}

impl AppContext {
    /// Wires the on-disk rate store and the configured rate provider.
    pub fn new(config: AppConfig) -> Result<Self> {
        let data_path = config.default_data_path()?;
        debug!("Opening rate store at {}", data_path.display());
        let store: Arc<dyn RateStore> = Arc::new(DiskRateStore::open(&data_path)?);

        let provider: Arc<dyn RateProvider> = match &config.providers.open_exchange {
            Some(p) => Arc::new(OpenExchangeRatesProvider::new(
                &p.base_url,
                &p.app_id,
                &config.base_currency,
            )),
            None => Arc::new(OfflineRateProvider),
        };

        Ok(Self::with_collaborators(
            config,
            store,
            provider,
            Arc::new(SystemClock),
        ))
    }

    pub fn with_collaborators(
        config: AppConfig,
        store: Arc<dyn RateStore>,
        provider: Arc<dyn RateProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let resolver = ExchangeRateResolver::new(
            Arc::clone(&store),
            Arc::clone(&provider),
            Arc::clone(&clock),
            Cache::new(),
        );
        Self {
            config,
            store,
            provider,
            clock,
            resolver,
        }
    }

    pub fn updater(&self) -> RateUpdater {
        RateUpdater::new(
            Arc::clone(&self.store),
            Arc::clone(&self.provider),
            Arc::clone(&self.clock),
        )
    }
}
