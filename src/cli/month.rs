use super::{AppContext, OutputFormat, ui};
use crate::core::analytics::{ComputedMonth, compute_month_data, rate_months};
use crate::core::month::MonthId;
use anyhow::{Result, anyhow};
use comfy_table::Cell;

impl ComputedMonth {
    pub fn display_as_table(&self, target_currency: &str) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Metric"),
            ui::header_cell(&format!("Value ({target_currency})")),
        ]);

        let known = |label: &str, value: f64| vec![Cell::new(label), ui::amount_cell(value)];
        let derived = |label: &str, value: Option<f64>| {
            vec![
                Cell::new(label),
                ui::format_optional_cell(value, |v| format!("{v:.2}")),
            ]
        };

        table.add_row(known("Start balance", self.start_balance));
        table.add_row(known("Income", self.total_income));
        table.add_row(known("Expenses", self.total_expenses));
        table.add_row(known("Optional expenses", self.total_optional_expenses));
        table.add_row(derived(
            "Next month start balance",
            self.next_month_start_balance(),
        ));
        table.add_row(derived("Balance change", self.calculated_balance_change()));
        table.add_row(derived("Currency profit/loss", self.currency_profit_loss()));
        table.add_row(derived("Pocket expenses", self.calculated_pocket_expenses()));
        table.add_row(derived("All expenses", self.total_all_expenses()));

        let mut output = format!(
            "Month: {}\n\n",
            ui::style_text(&self.month_id, ui::StyleType::Title)
        );
        output.push_str(&table.to_string());

        if let Some(title) = &self.source_month_title {
            output.push_str(&format!(
                "\n\n{}",
                ui::style_text(
                    &format!("Using exchange rates from {title}"),
                    ui::StyleType::Warning
                )
            ));
        }
        if self.reconciliation.is_none() {
            output.push_str(&format!(
                "\n{}",
                ui::style_text(
                    "Add next month's balances to reconcile this month",
                    ui::StyleType::Subtle
                )
            ));
        }
        output
    }
}

/// Computes one month, resolving rates for it and its successor only.
pub async fn compute_month(ctx: &AppContext, target: MonthId) -> Result<ComputedMonth> {
    let months: Vec<_> = ctx
        .config
        .months
        .iter()
        .filter(|m| m.id() == target || m.id() == target.succ())
        .cloned()
        .collect();
    if !months.iter().any(|m| m.id() == target) {
        return Err(anyhow!("No ledger data for month {target}"));
    }

    let spinner = ui::new_spinner("Resolving exchange rates...");
    let rated = rate_months(&ctx.resolver, &months, ctx.config.allow_default_rates).await;
    spinner.finish_and_clear();
    let rated = rated?;

    let this = rated
        .iter()
        .find(|m| m.month.id() == target)
        .ok_or_else(|| anyhow!("No ledger data for month {target}"))?;
    Ok(compute_month_data(
        this,
        &rated,
        &ctx.config.currency,
        &ctx.config.month_labels(),
    ))
}

pub async fn run(ctx: &AppContext, target: MonthId, format: OutputFormat) -> Result<()> {
    let computed = compute_month(ctx, target).await?;
    match format {
        OutputFormat::Table => println!("{}", computed.display_as_table(&ctx.config.currency)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&computed)?),
    }
    Ok(())
}
