use super::ui;
use crate::core::format::format_bolivares;
use crate::core::rate::Rate;
use crate::core::state::RateStore;
use anyhow::{Result, anyhow};
use std::str::FromStr;

/// Which side of the conversion the user holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    HaveCurrency,
    HaveVes,
}

impl FromStr for Side {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "have-currency" | "divisa" => Ok(Side::HaveCurrency),
            "have-ves" | "bolivares" => Ok(Side::HaveVes),
            _ => Err(anyhow::anyhow!("Invalid side: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    Buy,
    Sell,
}

impl FromStr for Quote {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "buy" | "compra" => Ok(Quote::Buy),
            "sell" | "venta" => Ok(Quote::Sell),
            _ => Err(anyhow::anyhow!("Invalid quote: {}", s)),
        }
    }
}

/// Accepts comma or dot as the decimal separator; anything unparsable or
/// negative collapses to zero.
pub fn parse_amount(raw: &str) -> f64 {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(|n| n.max(0.0))
        .unwrap_or(0.0)
}

pub fn convert(rate: &Rate, amount: f64, side: Side, quote: Quote) -> f64 {
    let price = match quote {
        Quote::Buy => rate.buy,
        Quote::Sell => rate.sell,
    };
    if price <= 0.0 {
        return 0.0;
    }
    match side {
        Side::HaveCurrency => amount * price,
        Side::HaveVes => amount / price,
    }
}

pub async fn run(store: &RateStore, rate_id: &str, amount: &str, side: &str, quote: &str) -> Result<()> {
    let side: Side = side.parse()?;
    let quote: Quote = quote.parse()?;

    let spinner = ui::new_spinner("Obteniendo cotizaciones...");
    store.initial_load().await;
    spinner.finish_and_clear();

    let state = store.snapshot();
    if state.rates.is_empty() {
        return Err(anyhow!(state
            .error
            .unwrap_or_else(|| "No hay cotizaciones disponibles".to_string())));
    }

    let rate = state.rates.iter().find(|r| r.id == rate_id).ok_or_else(|| {
        let available: Vec<&str> = state.rates.iter().map(|r| r.id.as_str()).collect();
        anyhow!(
            "Unknown rate id: {rate_id}. Available: {}",
            available.join(", ")
        )
    })?;

    let amount = parse_amount(amount);
    let result = convert(rate, amount, side, quote);

    println!(
        "{}",
        ui::style_text(
            &format!("Calculadora de {}", rate.base_currency),
            ui::StyleType::Title
        )
    );
    let quote_label = match quote {
        Quote::Buy => "compra",
        Quote::Sell => "venta",
    };
    let price = match quote {
        Quote::Buy => rate.buy,
        Quote::Sell => rate.sell,
    };
    println!(
        "{} {} ({quote_label})",
        ui::style_text("Cotización:", ui::StyleType::Label),
        format_bolivares(price)
    );
    let result_text = match side {
        Side::HaveCurrency => format!(
            "{amount:.2} {} = {}",
            rate.base_currency,
            format_bolivares(result)
        ),
        Side::HaveVes => format!(
            "{} = {result:.2} {}",
            format_bolivares(amount),
            rate.base_currency
        ),
    };
    println!("{}", ui::style_text(&result_text, ui::StyleType::Value));
    Ok(())
}
