//! Resolution of the rate table to use for a given month.
//!
//! Lookup order: owned cache, persisted snapshot, throttled live refresh (current
//! month only), then the persisted snapshot nearest in time.
use crate::core::cache::Cache;
use crate::core::clock::Clock;
use crate::core::currency::RateProvider;
use crate::core::month::MonthId;
use crate::core::rates::{RateSet, RateStore, RatesError, ResolvedRates};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Minimum gap between two live refresh attempts for the same key.
pub fn refresh_throttle() -> Duration {
    Duration::hours(1)
}

/// Live refreshes are not attempted before this time of day (UTC).
pub fn refresh_window_opens() -> NaiveTime {
    NaiveTime::from_hms_opt(0, 5, 0).unwrap_or(NaiveTime::MIN)
}

pub struct ExchangeRateResolver {
    store: Arc<dyn RateStore>,
    provider: Arc<dyn RateProvider>,
    clock: Arc<dyn Clock>,
    cache: Cache<String, ResolvedRates>,
}

impl ExchangeRateResolver {
    pub fn new(
        store: Arc<dyn RateStore>,
        provider: Arc<dyn RateProvider>,
        clock: Arc<dyn Clock>,
        cache: Cache<String, ResolvedRates>,
    ) -> Self {
        Self {
            store,
            provider,
            clock,
            cache,
        }
    }

    /// The cache this resolver reads through; callers own its invalidation.
    pub fn cache(&self) -> &Cache<String, ResolvedRates> {
        &self.cache
    }

    /// Resolves rates for the zero-indexed `month` of `year`.
    ///
    /// Fails with [`RatesError::NotFound`] only when no non-empty snapshot exists at all.
    #[instrument(name = "ResolveRates", skip(self))]
    pub async fn get_rates_for_month(
        &self,
        year: i32,
        month: u32,
    ) -> Result<ResolvedRates, RatesError> {
        let target = MonthId { year, month };
        let date_key = target.date_key();

        if let Some(cached) = self.cache.get(&date_key).await {
            return Ok(cached);
        }

        let stored = self.store.get(&date_key).await?;
        if let Some(set) = stored.as_ref().filter(|s| s.has_rates()) {
            debug!("Using stored rates for {}", date_key);
            let resolved = ResolvedRates::new(set.rates.clone(), &date_key);
            self.cache.put(date_key, resolved.clone()).await;
            return Ok(resolved);
        }

        let now = self.clock.now();
        let last_attempt = stored.as_ref().and_then(|s| s.last_attempt);
        if is_refresh_eligible(target, now, last_attempt) {
            if let Some(resolved) = self.refresh(target, now).await {
                self.cache.put(date_key, resolved.clone()).await;
                return Ok(resolved);
            }
        } else {
            debug!("Live refresh not eligible for {}", date_key);
        }

        self.nearest_stored(target).await
    }

    /// Fetches and persists the month's rates. Failures are logged and yield `None`.
    async fn refresh(&self, target: MonthId, now: DateTime<Utc>) -> Option<ResolvedRates> {
        let date_key = target.date_key();

        // Stamped before fetching so concurrent callers mostly skip; not a lock.
        if let Err(e) = self.store.record_attempt(&date_key, now).await {
            warn!("Failed to record refresh attempt for {}: {:#}", date_key, e);
        }

        let as_of = target.pred().last_day();
        let rates = match self.provider.fetch_historical_rates(as_of).await {
            Ok(rates) if !rates.is_empty() => rates,
            Ok(_) => {
                warn!("Rate provider returned no rates for {}", as_of);
                return None;
            }
            Err(e) => {
                warn!("Failed to fetch rates for {}: {:#}", as_of, e);
                return None;
            }
        };

        if let Err(e) = self.store.upsert_rates(&date_key, rates).await {
            warn!("Failed to persist refreshed rates for {}: {:#}", date_key, e);
            return None;
        }
        info!("Refreshed rates for {} from {}", date_key, as_of);

        match self.store.get(&date_key).await {
            Ok(Some(set)) if set.has_rates() => Some(ResolvedRates::new(set.rates, date_key)),
            Ok(_) => None,
            Err(e) => {
                warn!("Failed to re-read refreshed rates for {}: {:#}", date_key, e);
                None
            }
        }
    }

    async fn nearest_stored(&self, target: MonthId) -> Result<ResolvedRates, RatesError> {
        let date_key = target.date_key();
        let sets = self.store.all().await?;
        match find_nearest_rate_set(&sets, target) {
            Some(set) => {
                debug!("Falling back to rates from {} for {}", set.date_key, date_key);
                Ok(ResolvedRates::new(set.rates.clone(), &set.date_key))
            }
            None => Err(RatesError::NotFound { date_key }),
        }
    }
}

/// Whether a live refresh may run for `target` at `now`.
///
/// Only the current calendar month qualifies, only from 00:05 UTC, and only when
/// the previous attempt (if any) is more than [`refresh_throttle`] old.
pub fn is_refresh_eligible(
    target: MonthId,
    now: DateTime<Utc>,
    last_attempt: Option<DateTime<Utc>>,
) -> bool {
    if target != MonthId::from_date(now.date_naive()) {
        return false;
    }
    if now.time() < refresh_window_opens() {
        return false;
    }
    last_attempt.is_none_or(|at| now - at > refresh_throttle())
}

/// The non-empty set whose date is closest to the first day of `target`.
/// Ties go to the set encountered first.
pub fn find_nearest_rate_set(sets: &[RateSet], target: MonthId) -> Option<&RateSet> {
    let target_date = target.first_day();
    let mut best: Option<(&RateSet, i64)> = None;
    for set in sets.iter().filter(|s| s.has_rates()) {
        let Some(date) = set.date() else {
            warn!("Ignoring rate set with malformed key: {}", set.date_key);
            continue;
        };
        let distance = (date - target_date).num_days().abs();
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((set, distance));
        }
    }
    best.map(|(set, _)| set)
}
