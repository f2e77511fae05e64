use super::AppContext;
use crate::core::ledger::{Month, seed_month};
use crate::core::month::{CopyDirection, MonthId, get_next_month, get_previous_month};
use anyhow::{Context, Result};

/// Builds the month to append to the ledger: after the latest month by default,
/// or before the earliest with `before`.
pub fn new_month(ctx: &AppContext, before: bool) -> Month {
    let ids: Vec<MonthId> = ctx.config.months.iter().map(Month::id).collect();
    let (target, direction) = if before {
        (
            get_previous_month(&ids, ctx.clock.as_ref()),
            CopyDirection::Previous,
        )
    } else {
        (
            get_next_month(&ids, ctx.clock.as_ref()),
            CopyDirection::Next,
        )
    };
    seed_month(&ctx.config.months, target, direction)
}

/// Prints the seeded month as YAML, ready to paste under `months:`.
pub fn run(ctx: &AppContext, before: bool) -> Result<()> {
    let month = new_month(ctx, before);
    let yaml = serde_yaml::to_string(&vec![month]).context("Failed to render month as YAML")?;
    println!("{yaml}");
    Ok(())
}
