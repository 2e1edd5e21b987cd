use anyhow::Result;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use vescambio::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display current exchange rates
    Rates {
        /// Category filter: all, dolar, euro or cripto
        #[arg(short, long, default_value = "all")]
        tab: String,
    },
    /// Interactive session with manual refresh (Enter) and cooldown
    Watch,
    /// Convert between a currency and bolívares
    Calc {
        /// Rate id, e.g. usd-bcv or usdt-binance
        #[arg(long, default_value = "usd-bcv")]
        rate: String,
        /// Amount to convert, comma or dot decimals
        #[arg(long, default_value = "1")]
        amount: String,
        /// have-currency or have-ves
        #[arg(long, default_value = "have-currency")]
        side: String,
        /// buy or sell
        #[arg(long, default_value = "buy")]
        quote: String,
    },
    /// Display historical rates
    History {
        /// Maximum number of records to request
        #[arg(long)]
        limit: Option<usize>,
        /// Filter by exchange code, e.g. BCV or BINANCE_P2P
        #[arg(long)]
        exchange: Option<String>,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Write the filtered records to a JSON file
        #[arg(long)]
        export: Option<PathBuf>,
    },
}

impl From<Commands> for vescambio::AppCommand {
    fn from(cmd: Commands) -> vescambio::AppCommand {
        match cmd {
            Commands::Rates { tab } => vescambio::AppCommand::Rates { tab },
            Commands::Watch => vescambio::AppCommand::Watch,
            Commands::Calc {
                rate,
                amount,
                side,
                quote,
            } => vescambio::AppCommand::Calc {
                rate_id: rate,
                amount,
                side,
                quote,
            },
            Commands::History {
                limit,
                exchange,
                start,
                end,
                export,
            } => vescambio::AppCommand::History {
                limit,
                exchange,
                start,
                end,
                export,
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => vescambio::run_command(cmd.into(), cli.config_path.as_deref()).await,
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

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = vescambio::core::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
api:
  base_url: "https://api.crystodolarvzla.site"

history_limit: 100
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
