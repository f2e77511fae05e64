//! Currency conversion against a rate table, and the rate-fetch abstraction.
//!
//! Every rate in a [`RateMap`] is relative to one fixed base currency, so converting
//! goes through the base: `amount / rate[from] * rate[to]`.

use crate::core::ledger::Entry;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Currency code -> rate relative to the base currency.
pub type RateMap = HashMap<String, f64>;

#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Rates as published for a past `date`.
    async fn fetch_historical_rates(&self, date: NaiveDate) -> Result<RateMap>;

    async fn fetch_latest_rates(&self) -> Result<RateMap>;
}

/// Converts `amount` from one currency to another.
///
/// A currency missing from `rates` is priced at `1.0` instead of failing.
pub fn convert(amount: f64, from: &str, to: &str, rates: &RateMap) -> f64 {
    if from == to {
        return amount;
    }
    let from_rate = rates.get(from).copied().unwrap_or(1.0);
    let to_rate = rates.get(to).copied().unwrap_or(1.0);
    amount / from_rate * to_rate
}

/// Sum of `entries` converted into `target`. Zero for no entries.
pub fn sum_in_currency<'a>(
    entries: impl IntoIterator<Item = &'a Entry>,
    target: &str,
    rates: &RateMap,
) -> f64 {
    entries
        .into_iter()
        .map(|e| convert(e.amount(), e.currency(), target, rates))
        .fold(0.0, |total, amount| total + amount)
}
