//! Field extraction helpers for the rates API's response shapes.
//!
//! Every normalized field is resolved through an ordered chain of candidate
//! values, tried in priority order until one yields a usable price. A field
//! that stays unresolved drops the whole record for that category; prices are
//! never defaulted to zero.

use crate::core::rate::{Category, Rate, RateKind, TradeType};
use chrono::{DateTime, Utc};

/// Returns the first resolved candidate of an ordered extractor chain.
pub(crate) fn first_value<T>(candidates: impl IntoIterator<Item = Option<T>>) -> Option<T> {
    candidates.into_iter().flatten().next()
}

/// A price candidate is only usable when strictly positive.
pub(crate) fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v > 0.0)
}

/// Parses a percentage like `+0.50%`, `-1.2` or `3%`. Unknown input maps to
/// zero, the "no variation" value.
pub(crate) fn parse_variation(raw: &str) -> f64 {
    raw.trim()
        .trim_end_matches('%')
        .trim_start_matches('+')
        .trim()
        .parse()
        .unwrap_or(0.0)
}

/// Builds a BCV official record. Official rates quote one price for both
/// sides and report no intraday variation.
pub(crate) fn official_rate(category: Category, price: f64, now: DateTime<Utc>) -> Rate {
    let (id, name, base) = match category {
        Category::Dolar => ("usd-bcv", "Dólar Oficial", "USD"),
        Category::Euro => ("eur-bcv", "Euro Oficial", "EUR"),
        Category::Cripto => ("usdt-bcv", "USDT", "USDT"),
    };
    Rate {
        id: id.to_string(),
        name: name.to_string(),
        category,
        buy: price,
        sell: price,
        variation: 0.0,
        last_update: now,
        kind: RateKind::Fiat,
        trade_type: TradeType::Official,
        base_currency: base.to_string(),
        quote_currency: "VES".to_string(),
    }
}

/// Raw USDT/VES quotes gathered across the P2P endpoints.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct UsdtQuotes {
    pub buy: Option<f64>,
    pub sell: Option<f64>,
    pub avg: Option<f64>,
}

/// Builds the Binance P2P record. When only an average is available it is
/// used for both sides; with no usable quote at all the record is skipped.
pub(crate) fn usdt_rate(quotes: UsdtQuotes, now: DateTime<Utc>) -> Option<Rate> {
    let buy = first_value([quotes.buy, quotes.avg, quotes.sell])?;
    let sell = first_value([quotes.sell, quotes.avg, quotes.buy])?;
    Some(Rate {
        id: "usdt-binance".to_string(),
        name: "USDT".to_string(),
        category: Category::Cripto,
        buy,
        sell,
        variation: 0.0,
        last_update: now,
        kind: RateKind::Crypto,
        trade_type: TradeType::P2p,
        base_currency: "USDT".to_string(),
        quote_currency: "VES".to_string(),
    })
}
