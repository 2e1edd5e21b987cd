use super::ui;
use crate::core::format::{format_bolivares, format_update_time, format_variation};
use crate::core::rate::{Rate, RateKind, TradeType, crypto_gap};
use crate::core::state::{RateStore, StoreState};
use anyhow::{Result, anyhow};
use comfy_table::{Cell, Table};

/// The grid shows at most five unique quotes, like the web layout it mirrors.
const MAX_VISIBLE_RATES: usize = 5;

pub(crate) fn visible_rates(state: &StoreState) -> Vec<&Rate> {
    state
        .rates
        .iter()
        .filter(|rate| state.active_tab.matches(rate.category))
        .take(MAX_VISIBLE_RATES)
        .collect()
}

pub(crate) fn rates_table(state: &StoreState) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Cotización"),
        ui::header_cell("Categoría"),
        ui::header_cell("Compra"),
        ui::header_cell("Venta"),
        ui::header_cell("Variación"),
        ui::header_cell("Fuente"),
    ]);

    for rate in visible_rates(state) {
        let source = match rate.trade_type {
            TradeType::Official => "BCV",
            TradeType::P2p => "Binance P2P",
        };
        table.add_row(vec![
            Cell::new(&rate.name),
            Cell::new(rate.category.to_string()),
            ui::price_cell(format_bolivares(rate.buy)),
            ui::price_cell(format_bolivares(rate.sell)),
            ui::variation_cell(rate.variation, format_variation(rate.variation)),
            Cell::new(source),
        ]);
    }
    table
}

pub(crate) fn market_summary(state: &StoreState) -> Vec<String> {
    let mut lines = Vec::new();

    let fiat = state.rates.iter().find(|r| r.kind == RateKind::Fiat);
    let crypto = state.rates.iter().find(|r| r.kind == RateKind::Crypto);
    if let (Some(fiat), Some(crypto)) = (fiat, crypto) {
        lines.push(format!(
            "{} {:.1}%",
            ui::style_text("Brecha fiat/cripto:", ui::StyleType::Label),
            crypto_gap(fiat.sell, crypto.sell)
        ));
    }

    if !state.rates.is_empty() {
        let average =
            state.rates.iter().map(|r| r.variation).sum::<f64>() / state.rates.len() as f64;
        lines.push(format!(
            "{} {}",
            ui::style_text("Variación promedio:", ui::StyleType::Label),
            format_variation(average)
        ));
    }

    if let Some(ts) = state.last_update {
        lines.push(format!(
            "{} {}",
            ui::style_text("Actualizado:", ui::StyleType::Label),
            format_update_time(ts)
        ));
    }

    lines
}

pub async fn run(store: &RateStore) -> Result<()> {
    let spinner = ui::new_spinner("Obteniendo cotizaciones...");
    store.initial_load().await;
    spinner.finish_and_clear();

    let state = store.snapshot();
    if let Some(error) = &state.error {
        if state.rates.is_empty() {
            return Err(anyhow!(error.clone()));
        }
        // Stale rates are still shown; the error banner sits above them.
        println!("{}", ui::style_text(error, ui::StyleType::Error));
    }

    println!("{}", rates_table(&state));
    for line in market_summary(&state) {
        println!("{line}");
    }
    Ok(())
}
