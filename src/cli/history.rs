use super::ui;
use crate::core::format::format_bolivares;
use crate::providers::history::{HistoryClient, filter_history};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use comfy_table::Cell;
use std::fs;
use std::path::PathBuf;

pub struct HistoryArgs {
    pub limit: usize,
    pub exchange: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub export: Option<PathBuf>,
}

pub async fn run(base_url: &str, args: HistoryArgs) -> Result<()> {
    let spinner = ui::new_spinner("Obteniendo histórico...");
    let records = HistoryClient::new(base_url).fetch_history(args.limit).await;
    spinner.finish_and_clear();

    let records = filter_history(records?, args.exchange.as_deref(), args.start, args.end);
    if records.is_empty() {
        println!("No hay datos históricos para el rango seleccionado.");
        return Ok(());
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Fecha"),
        ui::header_cell("Exchange"),
        ui::header_cell("Par"),
        ui::header_cell("Compra"),
        ui::header_cell("Venta"),
    ]);
    for record in &records {
        let when = record
            .timestamp_utc()
            .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| record.timestamp.clone());
        table.add_row(vec![
            Cell::new(when),
            Cell::new(&record.exchange_code),
            Cell::new(&record.currency_pair),
            ui::price_cell(format_bolivares(record.buy_price)),
            ui::price_cell(format_bolivares(record.sell_price)),
        ]);
    }
    println!("{table}");
    println!(
        "{} {}",
        ui::style_text("Registros:", ui::StyleType::Label),
        records.len()
    );

    if let Some(path) = args.export {
        let json = serde_json::to_string_pretty(&records)?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write export file: {}", path.display()))?;
        println!(
            "{}",
            ui::style_text(
                &format!("Histórico exportado a {}", path.display()),
                ui::StyleType::Value
            )
        );
    }
    Ok(())
}
