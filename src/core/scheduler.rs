//! Calendar policy for background rate refreshes, and the updater that applies it.
use crate::core::clock::Clock;
use crate::core::currency::RateProvider;
use crate::core::month::MonthId;
use crate::core::rates::RateStore;
use crate::core::resolver::refresh_window_opens;
use crate::providers::util::seconds_until_next_run;
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Days of the month on which the previous month's closing rates are (re)tried.
pub const HISTORICAL_RETRY_DAYS: [u32; 4] = [2, 3, 8, 15];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdatePlan {
    pub update_current: bool,
    pub update_historical: bool,
}

impl UpdatePlan {
    pub fn is_idle(&self) -> bool {
        !self.update_current && !self.update_historical
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    /// The month already had rates; nothing was fetched.
    AlreadyPresent,
}

/// Decides which refreshes are due on `now`'s calendar day.
pub fn should_update_rates_now(now: DateTime<Utc>) -> UpdatePlan {
    let day = now.day();
    UpdatePlan {
        update_current: day == 1,
        update_historical: HISTORICAL_RETRY_DAYS.contains(&day),
    }
}

/// Whether the daily loop should run at `now`: the refresh window has opened and
/// nothing ran yet on this calendar day.
pub fn is_daily_run_due(now: DateTime<Utc>, last_run: Option<NaiveDate>) -> bool {
    now.time() >= refresh_window_opens() && last_run != Some(now.date_naive())
}

pub struct RateUpdater {
    store: Arc<dyn RateStore>,
    provider: Arc<dyn RateProvider>,
    clock: Arc<dyn Clock>,
}

impl RateUpdater {
    pub fn new(
        store: Arc<dyn RateStore>,
        provider: Arc<dyn RateProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            provider,
            clock,
        }
    }

    /// Fetches the latest rates and stores them under the current month's key.
    pub async fn update_current_rates(&self) -> Result<UpdateOutcome> {
        let date_key = MonthId::from_date(self.clock.today()).date_key();
        let rates = self
            .provider
            .fetch_latest_rates()
            .await
            .context("Failed to fetch latest rates")?;
        if rates.is_empty() {
            return Err(anyhow!("Rate provider returned no latest rates"));
        }
        self.store
            .upsert_rates(&date_key, rates)
            .await
            .with_context(|| format!("Failed to store latest rates under {date_key}"))?;
        info!("Stored latest rates under {}", date_key);
        Ok(UpdateOutcome::Updated)
    }

    /// Stores the previous month's closing rates under the current month's key,
    /// unless that key already has rates.
    pub async fn update_historical_rates_for_current_month(&self) -> Result<UpdateOutcome> {
        let current = MonthId::from_date(self.clock.today());
        let date_key = current.date_key();

        if let Some(existing) = self.store.get(&date_key).await? {
            if existing.has_rates() {
                debug!("Rates for {} already stored, skipping", date_key);
                return Ok(UpdateOutcome::AlreadyPresent);
            }
        }

        let as_of = current.pred().last_day();
        let rates = self
            .provider
            .fetch_historical_rates(as_of)
            .await
            .with_context(|| format!("Failed to fetch historical rates for {as_of}"))?;
        if rates.is_empty() {
            return Err(anyhow!("Rate provider returned no rates for {as_of}"));
        }
        self.store
            .upsert_rates(&date_key, rates)
            .await
            .with_context(|| format!("Failed to store historical rates under {date_key}"))?;
        info!("Stored {} closing rates under {}", as_of, date_key);
        Ok(UpdateOutcome::Updated)
    }

    /// Runs whatever the calendar says is due now. Failures are logged, never returned;
    /// the next scheduled day retries.
    pub async fn run_scheduled(&self) -> UpdatePlan {
        let plan = should_update_rates_now(self.clock.now());
        if plan.is_idle() {
            debug!("No rate updates scheduled today");
            return plan;
        }

        if plan.update_current {
            if let Err(e) = self.update_current_rates().await {
                warn!("Current rate update failed: {:#}", e);
            }
        }
        if plan.update_historical {
            if let Err(e) = self.update_historical_rates_for_current_month().await {
                warn!("Historical rate update failed: {:#}", e);
            }
        }
        plan
    }

    /// Wakes once a day shortly after midnight UTC and runs the scheduled updates. Never returns.
    pub async fn run_daily(&self) {
        let mut last_run: Option<NaiveDate> = None;
        loop {
            let wait = seconds_until_next_run(self.clock.now());
            debug!("Next scheduled rate update in {}s", wait);
            tokio::time::sleep(Duration::from_secs(wait)).await;

            let now = self.clock.now();
            if !is_daily_run_due(now, last_run) {
                debug!("Woke at {} before the next run is due", now);
                continue;
            }
            self.run_scheduled().await;
            last_run = Some(now.date_naive());
        }
    }
}
