use super::{AppContext, OutputFormat, ui};
use crate::core::analytics::{compute_all_months, rate_months};
use crate::core::year::{MetricSummary, YearSummary, compute_year_summary};
use anyhow::Result;
use comfy_table::Cell;

impl YearSummary {
    pub fn display_as_table(&self, target_currency: &str) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Metric"),
            ui::header_cell(&format!("Total ({target_currency})")),
            ui::header_cell(&format!("Monthly avg ({target_currency})")),
            ui::header_cell("Months"),
        ]);

        let rows: [(&str, &MetricSummary); 8] = [
            ("Start balance", &self.start_balance),
            ("Income", &self.total_income),
            ("Expenses", &self.total_expenses),
            ("Optional expenses", &self.total_optional_expenses),
            ("Balance change", &self.balance_change),
            ("Currency profit/loss", &self.currency_profit_loss),
            ("Pocket expenses", &self.pocket_expenses),
            ("All expenses", &self.total_all_expenses),
        ];
        for (label, metric) in rows {
            table.add_row(vec![
                Cell::new(label),
                ui::amount_cell(metric.total),
                ui::amount_cell(metric.average),
                Cell::new(metric.months),
            ]);
        }

        format!(
            "Year: {} ({} {})\n\n{}",
            ui::style_text(&self.year.to_string(), ui::StyleType::Title),
            self.month_count,
            if self.month_count == 1 { "month" } else { "months" },
            table
        )
    }
}

/// Summarizes `year`. January of the following year is included only so December
/// can be reconciled.
pub async fn compute_year(ctx: &AppContext, year: i32) -> Result<YearSummary> {
    let months: Vec<_> = ctx
        .config
        .months
        .iter()
        .filter(|m| m.year == year || (m.year == year + 1 && m.month == 0))
        .cloned()
        .collect();

    let spinner = ui::new_spinner("Resolving exchange rates...");
    let rated = rate_months(&ctx.resolver, &months, ctx.config.allow_default_rates).await;
    spinner.finish_and_clear();
    let rated = rated?;

    let computed = compute_all_months(&rated, &ctx.config.currency, &ctx.config.month_labels());
    Ok(compute_year_summary(year, &computed))
}

pub async fn run(ctx: &AppContext, year: i32, format: OutputFormat) -> Result<()> {
    let summary = compute_year(ctx, year).await?;
    match format {
        OutputFormat::Table => println!("{}", summary.display_as_table(&ctx.config.currency)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(())
}
