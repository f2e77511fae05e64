//! Rolls computed months up into yearly totals and averages.
use crate::core::analytics::ComputedMonth;
use serde::Serialize;

/// Sum and average of one metric across a year.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetricSummary {
    pub total: f64,
    pub average: f64,
    /// Months that contributed a value.
    pub months: usize,
}

impl MetricSummary {
    /// Sums the known values and averages over how many there were.
    fn from_values(values: impl IntoIterator<Item = Option<f64>>) -> Self {
        let (total, months) = values
            .into_iter()
            .flatten()
            .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
        let average = if months == 0 {
            0.0
        } else {
            total / months as f64
        };
        Self {
            total,
            average,
            months,
        }
    }
}

/// Yearly roll-up. Serializes flat as `total*`/`avg*` pairs per metric.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(into = "YearRecord")]
pub struct YearSummary {
    pub year: i32,
    pub month_count: usize,
    pub start_balance: MetricSummary,
    pub total_income: MetricSummary,
    pub total_expenses: MetricSummary,
    pub total_optional_expenses: MetricSummary,
    pub balance_change: MetricSummary,
    pub pocket_expenses: MetricSummary,
    pub currency_profit_loss: MetricSummary,
    pub total_all_expenses: MetricSummary,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct YearRecord {
    year: i32,
    month_count: usize,
    /// Months whose reconciliation figures are known.
    reconciled_month_count: usize,
    total_start_balance: f64,
    avg_start_balance: f64,
    total_income: f64,
    avg_income: f64,
    total_expenses: f64,
    avg_expenses: f64,
    total_optional_expenses: f64,
    avg_optional_expenses: f64,
    total_balance_change: f64,
    avg_balance_change: f64,
    total_pocket_expenses: f64,
    avg_pocket_expenses: f64,
    total_currency_profit_loss: f64,
    avg_currency_profit_loss: f64,
    total_all_expenses: f64,
    avg_all_expenses: f64,
}

impl From<YearSummary> for YearRecord {
    fn from(y: YearSummary) -> Self {
        YearRecord {
            year: y.year,
            month_count: y.month_count,
            reconciled_month_count: y.pocket_expenses.months,
            total_start_balance: y.start_balance.total,
            avg_start_balance: y.start_balance.average,
            total_income: y.total_income.total,
            avg_income: y.total_income.average,
            total_expenses: y.total_expenses.total,
            avg_expenses: y.total_expenses.average,
            total_optional_expenses: y.total_optional_expenses.total,
            avg_optional_expenses: y.total_optional_expenses.average,
            total_balance_change: y.balance_change.total,
            avg_balance_change: y.balance_change.average,
            total_pocket_expenses: y.pocket_expenses.total,
            avg_pocket_expenses: y.pocket_expenses.average,
            total_currency_profit_loss: y.currency_profit_loss.total,
            avg_currency_profit_loss: y.currency_profit_loss.average,
            total_all_expenses: y.total_all_expenses.total,
            avg_all_expenses: y.total_all_expenses.average,
        }
    }
}

/// Summarizes the months of `computed_months` that fall in `year`.
///
/// Reconciliation metrics are averaged only over the months where they are known.
pub fn compute_year_summary(year: i32, computed_months: &[ComputedMonth]) -> YearSummary {
    let months: Vec<&ComputedMonth> = computed_months.iter().filter(|m| m.year == year).collect();
    if months.is_empty() {
        return YearSummary {
            year,
            ..Default::default()
        };
    }

    let metric = |f: fn(&ComputedMonth) -> Option<f64>| {
        MetricSummary::from_values(months.iter().map(|m| f(m)))
    };

    YearSummary {
        year,
        month_count: months.len(),
        start_balance: metric(|m| Some(m.start_balance)),
        total_income: metric(|m| Some(m.total_income)),
        total_expenses: metric(|m| Some(m.total_expenses)),
        total_optional_expenses: metric(|m| Some(m.total_optional_expenses)),
        balance_change: metric(ComputedMonth::calculated_balance_change),
        pocket_expenses: metric(ComputedMonth::calculated_pocket_expenses),
        currency_profit_loss: metric(ComputedMonth::currency_profit_loss),
        total_all_expenses: metric(ComputedMonth::total_all_expenses),
    }
}
