pub mod cli;
pub mod core;
pub mod providers;

use crate::cli::history::HistoryArgs;
use crate::core::config::AppConfig;
use crate::core::notify::ConsoleNotifier;
use crate::core::state::RateStore;
use anyhow::Result;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Rates {
        tab: String,
    },
    Watch,
    Calc {
        rate_id: String,
        amount: String,
        side: String,
        quote: String,
    },
    History {
        limit: Option<usize>,
        exchange: Option<String>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        export: Option<PathBuf>,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("CrystoDolar rates tracker starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let base_url = config.api_base_url().to_string();

    match command {
        AppCommand::Rates { tab } => {
            let tab = tab.parse()?;
            let store = new_store(&base_url);
            store.set_active_tab(tab);
            cli::rates::run(&store).await
        }
        AppCommand::Watch => {
            let store = new_store(&base_url);
            cli::watch::run(&store).await
        }
        AppCommand::Calc {
            rate_id,
            amount,
            side,
            quote,
        } => {
            let store = new_store(&base_url);
            cli::calc::run(&store, &rate_id, &amount, &side, &quote).await
        }
        AppCommand::History {
            limit,
            exchange,
            start,
            end,
            export,
        } => {
            cli::history::run(
                &base_url,
                HistoryArgs {
                    limit: limit.unwrap_or(config.history_limit),
                    exchange,
                    start,
                    end,
                    export,
                },
            )
            .await
        }
    }
}

/// Composition root: the store is owned here and handed to the views by
/// reference, never through a global.
fn new_store(base_url: &str) -> RateStore {
    let source = Arc::new(providers::ApiRateSource::new(base_url));
    RateStore::new(source, Box::new(ConsoleNotifier))
}
