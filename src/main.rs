use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fxbudget::OutputFormat;
use fxbudget::core::log::init_logging;
use fxbudget::core::month::MonthId;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    /// Print results as JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display the computed figures for a month (YYYY-MM)
    Month { month: MonthId },
    /// Display yearly totals and averages
    Year { year: i32 },
    /// Display the exchange rates used for a month (YYYY-MM)
    Rates { month: MonthId },
    /// Print a new month seeded with the closest month's balances
    NewMonth {
        /// Create the month before the earliest one instead of after the latest
        #[arg(long)]
        before: bool,
    },
    /// Run today's scheduled exchange rate updates
    UpdateRates {
        /// Keep running and update daily
        #[arg(long)]
        daemon: bool,
    },
}

impl From<Commands> for fxbudget::AppCommand {
    fn from(cmd: Commands) -> fxbudget::AppCommand {
        match cmd {
            Commands::Month { month } => fxbudget::AppCommand::Month(month),
            Commands::Year { year } => fxbudget::AppCommand::Year(year),
            Commands::Rates { month } => fxbudget::AppCommand::Rates(month),
            Commands::NewMonth { before } => fxbudget::AppCommand::NewMonth { before },
            Commands::UpdateRates { daemon } => fxbudget::AppCommand::UpdateRates { daemon },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Table
    };

    let result = match cli.command {
        Some(Commands::Setup) => fxbudget::cli::setup::setup(),
        Some(cmd) => fxbudget::run_command(cmd.into(), cli.config_path.as_deref(), format).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
