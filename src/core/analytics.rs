//! Turns raw months into currency-normalized, cross-month reconciled figures.
use crate::core::currency::sum_in_currency;
use crate::core::ledger::Month;
use crate::core::month::{MonthId, parse_month_id};
use crate::core::rates::{RatesError, ResolvedRates};
use crate::core::resolver::ExchangeRateResolver;
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

/// Title shown when a month is priced with the all-ones default table.
pub const DEFAULT_RATES_TITLE: &str = "Default rates";

pub const ENGLISH_MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// A month together with the rates resolved for it.
#[derive(Debug, Clone)]
pub struct RatedMonth {
    pub month: Month,
    pub rates: ResolvedRates,
}

/// Figures that need the following month's opening balances. Either all of them
/// are known or none are.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reconciliation {
    pub next_month_start_balance: f64,
    pub next_month_balance_at_current_rates: f64,
    pub calculated_balance_change: f64,
    pub currency_profit_loss: f64,
    pub calculated_pocket_expenses: f64,
    pub total_all_expenses: f64,
}

/// Read-only view of a month normalized into one currency.
///
/// Serializes flat: every reconciliation figure is its own key, `null` when the
/// following month is missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "MonthRecord")]
pub struct ComputedMonth {
    pub month_id: String,
    pub year: i32,
    pub month: u32,
    pub start_balance: f64,
    pub total_income: f64,
    pub total_expenses: f64,
    pub total_optional_expenses: f64,
    pub reconciliation: Option<Reconciliation>,
    pub is_using_other_month_rates: bool,
    pub source_month_title: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MonthRecord {
    month_id: String,
    date_key: String,
    year: i32,
    month: u32,
    start_balance: f64,
    total_income: f64,
    total_expenses: f64,
    total_optional_expenses: f64,
    next_month_start_balance: Option<f64>,
    next_month_balance_at_current_rates: Option<f64>,
    calculated_balance_change: Option<f64>,
    currency_profit_loss: Option<f64>,
    calculated_pocket_expenses: Option<f64>,
    total_all_expenses: Option<f64>,
    is_using_other_month_rates: bool,
    source_month_title: Option<String>,
}

impl From<ComputedMonth> for MonthRecord {
    fn from(m: ComputedMonth) -> Self {
        let r = m.reconciliation;
        MonthRecord {
            date_key: MonthId {
                year: m.year,
                month: m.month,
            }
            .date_key(),
            month_id: m.month_id,
            year: m.year,
            month: m.month,
            start_balance: m.start_balance,
            total_income: m.total_income,
            total_expenses: m.total_expenses,
            total_optional_expenses: m.total_optional_expenses,
            next_month_start_balance: r.map(|r| r.next_month_start_balance),
            next_month_balance_at_current_rates: r.map(|r| r.next_month_balance_at_current_rates),
            calculated_balance_change: r.map(|r| r.calculated_balance_change),
            currency_profit_loss: r.map(|r| r.currency_profit_loss),
            calculated_pocket_expenses: r.map(|r| r.calculated_pocket_expenses),
            total_all_expenses: r.map(|r| r.total_all_expenses),
            is_using_other_month_rates: m.is_using_other_month_rates,
            source_month_title: m.source_month_title,
        }
    }
}

impl ComputedMonth {
    pub fn next_month_start_balance(&self) -> Option<f64> {
        self.reconciliation.map(|r| r.next_month_start_balance)
    }

    pub fn next_month_balance_at_current_rates(&self) -> Option<f64> {
        self.reconciliation
            .map(|r| r.next_month_balance_at_current_rates)
    }

    pub fn calculated_balance_change(&self) -> Option<f64> {
        self.reconciliation.map(|r| r.calculated_balance_change)
    }

    pub fn currency_profit_loss(&self) -> Option<f64> {
        self.reconciliation.map(|r| r.currency_profit_loss)
    }

    pub fn calculated_pocket_expenses(&self) -> Option<f64> {
        self.reconciliation.map(|r| r.calculated_pocket_expenses)
    }

    pub fn total_all_expenses(&self) -> Option<f64> {
        self.reconciliation.map(|r| r.total_all_expenses)
    }
}

/// Computes the normalized view of `month`.
///
/// The chronological successor is looked up in `all_months`; without one the
/// reconciliation figures stay unknown rather than zero.
pub fn compute_month_data<S: AsRef<str>>(
    month: &RatedMonth,
    all_months: &[RatedMonth],
    target_currency: &str,
    month_names: &[S],
) -> ComputedMonth {
    let id = month.month.id();
    let this_rates = &month.rates.rates;

    let start_balance = sum_in_currency(month.month.balances(), target_currency, this_rates);
    let total_income = sum_in_currency(month.month.incomes(), target_currency, this_rates);
    let total_expenses = sum_in_currency(month.month.expenses(), target_currency, this_rates);
    let total_optional_expenses = sum_in_currency(
        month.month.expenses().filter(|e| e.is_optional()),
        target_currency,
        this_rates,
    );

    let next_id = id.succ();
    let reconciliation = all_months
        .iter()
        .find(|m| m.month.id() == next_id)
        .map(|next| {
            let next_month_start_balance =
                sum_in_currency(next.month.balances(), target_currency, &next.rates.rates);
            let next_month_balance_at_current_rates =
                sum_in_currency(next.month.balances(), target_currency, this_rates);
            let currency_profit_loss =
                next_month_start_balance - next_month_balance_at_current_rates;
            let calculated_pocket_expenses = start_balance + total_income + currency_profit_loss
                - next_month_start_balance
                - total_expenses;
            Reconciliation {
                next_month_start_balance,
                next_month_balance_at_current_rates,
                calculated_balance_change: next_month_start_balance - start_balance,
                currency_profit_loss,
                calculated_pocket_expenses,
                total_all_expenses: total_expenses + calculated_pocket_expenses,
            }
        });
    if reconciliation.is_none() {
        debug!("No data for {}, reconciliation left empty for {}", next_id, id);
    }

    let is_using_other_month_rates = month.rates.source_date_key != id.date_key();
    let source_month_title =
        is_using_other_month_rates.then(|| source_title(&month.rates, month_names));

    ComputedMonth {
        month_id: id.to_string(),
        year: id.year,
        month: id.month,
        start_balance,
        total_income,
        total_expenses,
        total_optional_expenses,
        reconciliation,
        is_using_other_month_rates,
        source_month_title,
    }
}

fn source_title<S: AsRef<str>>(rates: &ResolvedRates, month_names: &[S]) -> String {
    if rates.is_default_table() {
        return DEFAULT_RATES_TITLE.to_string();
    }
    match parse_month_id(&rates.source_date_key) {
        Ok(source) => {
            let name = month_names
                .get(source.month as usize)
                .map(|n| n.as_ref().to_string())
                .unwrap_or_else(|| ENGLISH_MONTH_NAMES[source.month as usize].to_string());
            format!("{} {}", name, source.year)
        }
        Err(_) => rates.source_date_key.clone(),
    }
}

/// Computes every month in `months`, oldest first.
pub fn compute_all_months<S: AsRef<str>>(
    months: &[RatedMonth],
    target_currency: &str,
    month_names: &[S],
) -> Vec<ComputedMonth> {
    let mut computed: Vec<ComputedMonth> = months
        .iter()
        .map(|m| compute_month_data(m, months, target_currency, month_names))
        .collect();
    computed.sort_by_key(|c| (c.year, c.month));
    computed
}

/// Resolves rates for every month concurrently.
///
/// With `allow_default_rates` a month without any resolvable rates is priced with
/// [`ResolvedRates::default_table`]; otherwise the not-found error is returned.
pub async fn rate_months(
    resolver: &ExchangeRateResolver,
    months: &[Month],
    allow_default_rates: bool,
) -> Result<Vec<RatedMonth>, RatesError> {
    let lookups = months
        .iter()
        .map(|m| resolver.get_rates_for_month(m.year, m.month));
    let results = join_all(lookups).await;

    months
        .iter()
        .zip(results)
        .map(|(month, result)| {
            let rates = match result {
                Ok(rates) => rates,
                Err(RatesError::NotFound { date_key }) if allow_default_rates => {
                    warn!("No rates for {}, using default table", date_key);
                    ResolvedRates::default_table()
                }
                Err(e) => return Err(e),
            };
            Ok(RatedMonth {
                month: month.clone(),
                rates,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::Cache;
    use crate::core::clock::FixedClock;
    use crate::core::currency::{RateMap, RateProvider};
    use crate::core::ledger::Entry;
    use crate::core::rates::RateSet;
    use crate::store::MemoryRateStore;
    use anyhow::{Result, anyhow};
    use approx::assert_relative_eq;
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::sync::Arc;

    fn rates(pairs: &[(&str, f64)]) -> RateMap {
        pairs.iter().map(|(c, r)| (c.to_string(), *r)).collect()
    }

    fn balance(amount: f64, currency: &str) -> Entry {
        Entry::Balance {
            description: "Account".to_string(),
            amount,
            currency: currency.to_string(),
        }
    }

    fn income(amount: f64, currency: &str) -> Entry {
        Entry::Income {
            description: "Salary".to_string(),
            amount,
            currency: currency.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        }
    }

    fn expense(amount: f64, currency: &str, optional: bool) -> Entry {
        Entry::Expense {
            description: "Shopping".to_string(),
            amount,
            currency: currency.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            optional,
        }
    }

    fn rated(year: i32, month: u32, entries: Vec<Entry>, table: RateMap) -> RatedMonth {
        let month = Month::new(year, month).with_entries(entries);
        let key = month.id().date_key();
        RatedMonth {
            month,
            rates: ResolvedRates::new(table, key),
        }
    }

    #[test]
    fn test_start_balance_mixed_currencies() {
        let month = rated(
            2024,
            0,
            vec![balance(100.0, "USD"), balance(200.0, "EUR")],
            rates(&[("USD", 1.0), ("EUR", 0.9)]),
        );
        let computed = compute_month_data(&month, &[], "USD", &ENGLISH_MONTH_NAMES);
        assert_relative_eq!(computed.start_balance, 322.22, epsilon = 0.01);
        assert_eq!(computed.month_id, "2024-01");
    }

    #[test]
    fn test_totals_and_optional_expenses() {
        let month = rated(
            2024,
            0,
            vec![
                income(3000.0, "USD"),
                expense(90.0, "EUR", true),
                expense(500.0, "USD", false),
            ],
            rates(&[("USD", 1.0), ("EUR", 0.9)]),
        );
        let computed = compute_month_data(&month, &[], "USD", &ENGLISH_MONTH_NAMES);
        assert_eq!(computed.total_income, 3000.0);
        assert_relative_eq!(computed.total_expenses, 600.0);
        assert_relative_eq!(computed.total_optional_expenses, 100.0);
        assert_eq!(computed.start_balance, 0.0);
        assert!(computed.start_balance.is_sign_positive());
    }

    #[test]
    fn test_without_successor_reconciliation_is_null() {
        let month = rated(2024, 0, vec![balance(100.0, "USD")], rates(&[("USD", 1.0)]));
        // March exists but is not adjacent to January
        let march = rated(2024, 2, vec![balance(50.0, "USD")], rates(&[("USD", 1.0)]));
        let all = vec![month.clone(), march];

        let computed = compute_month_data(&month, &all, "USD", &ENGLISH_MONTH_NAMES);
        assert!(computed.reconciliation.is_none());
        assert_eq!(computed.calculated_balance_change(), None);
        assert_eq!(computed.calculated_pocket_expenses(), None);
        assert_eq!(computed.currency_profit_loss(), None);
        assert_eq!(computed.total_all_expenses(), None);
        assert_eq!(computed.next_month_start_balance(), None);
        assert_eq!(computed.next_month_balance_at_current_rates(), None);

        let json = serde_json::to_value(&computed).unwrap();
        for key in [
            "nextMonthStartBalance",
            "nextMonthBalanceAtCurrentRates",
            "calculatedBalanceChange",
            "currencyProfitLoss",
            "calculatedPocketExpenses",
            "totalAllExpenses",
        ] {
            assert!(json.get(key).is_some(), "missing key {key}");
            assert!(json[key].is_null(), "{key} should be null");
        }
        assert!(json.get("reconciliation").is_none());
        assert_eq!(json["monthId"], "2024-01");
        assert_eq!(json["dateKey"], "2024-01-01");
        assert_eq!(json["startBalance"], 100.0);
    }

    #[test]
    fn test_reconciliation_with_successor() {
        let january = rated(
            2024,
            0,
            vec![balance(1000.0, "USD"), income(500.0, "USD"), expense(300.0, "USD", false)],
            rates(&[("USD", 1.0)]),
        );
        let february = rated(2024, 1, vec![balance(1100.0, "USD")], rates(&[("USD", 1.0)]));
        let all = vec![february.clone(), january.clone()];

        let computed = compute_month_data(&january, &all, "USD", &ENGLISH_MONTH_NAMES);
        assert_eq!(computed.next_month_start_balance(), Some(1100.0));
        assert_eq!(computed.calculated_balance_change(), Some(100.0));
        assert_eq!(computed.currency_profit_loss(), Some(0.0));
        // 1000 + 500 + 0 - 1100 - 300
        assert_eq!(computed.calculated_pocket_expenses(), Some(100.0));
        assert_eq!(computed.total_all_expenses(), Some(400.0));

        let json = serde_json::to_value(&computed).unwrap();
        assert_eq!(json["calculatedPocketExpenses"], 100.0);
        assert_eq!(json["nextMonthBalanceAtCurrentRates"], 1100.0);
        assert_eq!(json["isUsingOtherMonthRates"], false);
        assert!(json["sourceMonthTitle"].is_null());
    }

    #[test]
    fn test_currency_profit_loss_uses_default_rate_for_missing_currency() {
        // January's table has no EUR entry, so re-pricing February's EUR holding at
        // January's rates falls back to rate 1.0 and yields exactly 1000.
        let january = rated(2024, 0, vec![balance(1000.0, "USD")], rates(&[("USD", 1.0)]));
        let february = rated(
            2024,
            1,
            vec![balance(1000.0, "EUR")],
            rates(&[("USD", 1.0), ("EUR", 0.95)]),
        );
        let all = vec![january.clone(), february];

        let computed = compute_month_data(&january, &all, "USD", &ENGLISH_MONTH_NAMES);
        let reconciliation = computed.reconciliation.unwrap();
        assert_relative_eq!(
            reconciliation.next_month_start_balance,
            1052.63,
            epsilon = 0.01
        );
        assert_eq!(reconciliation.next_month_balance_at_current_rates, 1000.0);
        assert_relative_eq!(reconciliation.currency_profit_loss, 52.63, epsilon = 0.01);
    }

    #[test]
    fn test_december_reconciles_against_january() {
        let december = rated(2024, 11, vec![balance(10.0, "USD")], rates(&[("USD", 1.0)]));
        let january = rated(2025, 0, vec![balance(25.0, "USD")], rates(&[("USD", 1.0)]));
        let november = rated(2024, 10, vec![balance(5.0, "USD")], rates(&[("USD", 1.0)]));
        let all = vec![november.clone(), december.clone(), january];

        let computed = compute_month_data(&december, &all, "USD", &ENGLISH_MONTH_NAMES);
        assert_eq!(computed.calculated_balance_change(), Some(15.0));

        let computed = compute_month_data(&november, &all, "USD", &ENGLISH_MONTH_NAMES);
        assert_eq!(computed.calculated_balance_change(), Some(5.0));
    }

    #[test]
    fn test_rates_from_other_month_are_titled() {
        let mut june = rated(2024, 5, vec![balance(1.0, "USD")], rates(&[("USD", 1.0)]));
        june.rates.source_date_key = "2024-03-01".to_string();

        let computed = compute_month_data(&june, &[], "USD", &ENGLISH_MONTH_NAMES);
        assert!(computed.is_using_other_month_rates);
        assert_eq!(computed.source_month_title.as_deref(), Some("March 2024"));

        let german = [
            "Januar", "Februar", "März", "April", "Mai", "Juni", "Juli", "August",
            "September", "Oktober", "November", "Dezember",
        ];
        let computed = compute_month_data(&june, &[], "USD", &german);
        assert_eq!(computed.source_month_title.as_deref(), Some("März 2024"));
    }

    #[test]
    fn test_default_table_title_and_own_rates() {
        let mut month = rated(2024, 5, vec![balance(1.0, "EUR")], RateMap::new());
        let computed = compute_month_data(&month, &[], "USD", &ENGLISH_MONTH_NAMES);
        assert!(!computed.is_using_other_month_rates);
        assert_eq!(computed.source_month_title, None);

        month.rates = ResolvedRates::default_table();
        let computed = compute_month_data(&month, &[], "USD", &ENGLISH_MONTH_NAMES);
        assert!(computed.is_using_other_month_rates);
        assert_eq!(computed.source_month_title.as_deref(), Some(DEFAULT_RATES_TITLE));
        assert_eq!(computed.start_balance, 1.0);
    }

    #[test]
    fn test_compute_all_months_is_chronological() {
        let months = vec![
            rated(2025, 0, vec![], RateMap::new()),
            rated(2024, 11, vec![], RateMap::new()),
        ];
        let computed = compute_all_months(&months, "USD", &ENGLISH_MONTH_NAMES);
        let ids: Vec<_> = computed.iter().map(|c| c.month_id.as_str()).collect();
        assert_eq!(ids, vec!["2024-12", "2025-01"]);
        assert!(computed[0].reconciliation.is_some());
        assert!(computed[1].reconciliation.is_none());
    }

    struct OfflineProvider;

    #[async_trait]
    impl RateProvider for OfflineProvider {
        async fn fetch_historical_rates(&self, _date: NaiveDate) -> Result<RateMap> {
            Err(anyhow!("offline"))
        }

        async fn fetch_latest_rates(&self) -> Result<RateMap> {
            Err(anyhow!("offline"))
        }
    }

    fn resolver_over(store: MemoryRateStore) -> ExchangeRateResolver {
        ExchangeRateResolver::new(
            Arc::new(store),
            Arc::new(OfflineProvider),
            Arc::new(FixedClock::new(
                Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap(),
            )),
            Cache::new(),
        )
    }

    #[tokio::test]
    async fn test_rate_months_falls_back_to_nearest_stored() {
        let resolver = resolver_over(MemoryRateStore::with_sets([RateSet::new(
            "2024-03-01",
            rates(&[("USD", 1.0), ("EUR", 0.9)]),
        )]));
        let months = vec![Month::new(2024, 5).with_entries([balance(90.0, "EUR")])];

        let rated = rate_months(&resolver, &months, false).await.unwrap();
        let computed = compute_month_data(&rated[0], &rated, "USD", &ENGLISH_MONTH_NAMES);
        assert!(computed.is_using_other_month_rates);
        assert_eq!(computed.source_month_title.as_deref(), Some("March 2024"));
        assert_relative_eq!(computed.start_balance, 100.0);
    }

    #[tokio::test]
    async fn test_rate_months_without_rates() {
        let resolver = resolver_over(MemoryRateStore::new());
        let months = vec![Month::new(2024, 5)];

        let err = rate_months(&resolver, &months, false).await.unwrap_err();
        assert!(matches!(err, RatesError::NotFound { .. }));

        let rated = rate_months(&resolver, &months, true).await.unwrap();
        assert!(rated[0].rates.is_default_table());
    }
}
