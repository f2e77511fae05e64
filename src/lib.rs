pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

pub use crate::cli::OutputFormat;
pub use crate::core::config;

use crate::cli::AppContext;
use crate::core::month::MonthId;
use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    /// Computed figures for one month.
    Month(MonthId),
    /// Totals and averages for a calendar year.
    Year(i32),
    /// The rate table resolved for a month.
    Rates(MonthId),
    /// A new ledger month seeded with the nearest month's balances.
    NewMonth { before: bool },
    /// Scheduled rate refreshes, once or as a daily loop.
    UpdateRates { daemon: bool },
}

pub async fn run_command(
    command: AppCommand,
    config_path: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    info!("fxbudget starting...");

    let config = match config_path {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let ctx = AppContext::new(config)?;
    run_with_context(&ctx, command, format).await
}

/// Dispatches `command` against already wired collaborators.
pub async fn run_with_context(
    ctx: &AppContext,
    command: AppCommand,
    format: OutputFormat,
) -> Result<()> {
    match command {
        AppCommand::Month(month) => cli::month::run(ctx, month, format).await,
        AppCommand::Year(year) => cli::year::run(ctx, year, format).await,
        AppCommand::Rates(month) => cli::rates::show(ctx, month, format).await,
        AppCommand::NewMonth { before } => cli::seed::run(ctx, before),
        AppCommand::UpdateRates { daemon } => cli::rates::update(ctx, daemon).await,
    }
}
