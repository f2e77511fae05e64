use super::{AppContext, OutputFormat, ui};
use crate::core::month::MonthId;
use crate::core::rates::ResolvedRates;
use anyhow::Result;
use comfy_table::{Cell, CellAlignment};
use tracing::info;

impl ResolvedRates {
    pub fn display_as_table(&self, month: MonthId, base_currency: &str) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Currency"),
            ui::header_cell(&format!("Per 1 {base_currency}")),
        ]);

        let mut codes: Vec<_> = self.rates.iter().collect();
        codes.sort_by(|a, b| a.0.cmp(b.0));
        for (code, rate) in codes {
            table.add_row(vec![
                Cell::new(code),
                Cell::new(format!("{rate:.6}")).set_alignment(CellAlignment::Right),
            ]);
        }

        let mut output = format!(
            "Exchange rates for {}\n\n{}",
            ui::style_text(&month.to_string(), ui::StyleType::Title),
            table
        );
        if self.source_date_key != month.date_key() {
            output.push_str(&format!(
                "\n\n{}",
                ui::style_text(
                    &format!("Nearest available snapshot: {}", self.source_date_key),
                    ui::StyleType::Warning
                )
            ));
        }
        output
    }
}

pub async fn show(ctx: &AppContext, month: MonthId, format: OutputFormat) -> Result<()> {
    let resolved = ctx
        .resolver
        .get_rates_for_month(month.year, month.month)
        .await?;
    match format {
        OutputFormat::Table => println!(
            "{}",
            resolved.display_as_table(month, &ctx.config.base_currency)
        ),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&resolved)?),
    }
    Ok(())
}

/// Runs today's scheduled refreshes once, or keeps running them daily.
pub async fn update(ctx: &AppContext, daemon: bool) -> Result<()> {
    let updater = ctx.updater();
    if daemon {
        info!("Starting daily rate updates");
        updater.run_daily().await;
        return Ok(());
    }

    let plan = updater.run_scheduled().await;
    // Cached answers may predate what was just stored
    ctx.resolver.cache().clear().await;
    println!(
        "{}",
        ui::style_text(
            &format!(
                "Rate update: current={} historical={}",
                plan.update_current, plan.update_historical
            ),
            ui::StyleType::Subtle
        )
    );
    Ok(())
}
