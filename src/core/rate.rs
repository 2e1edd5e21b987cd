//! Rate abstractions and core types

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// UI grouping for a quote. Not part of a rate's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Dolar,
    Euro,
    Cripto,
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Category::Dolar => "dolar",
                Category::Euro => "euro",
                Category::Cripto => "cripto",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateKind {
    Fiat,
    Crypto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeType {
    Official,
    P2p,
}

/// Active category filter in the view layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    All,
    Dolar,
    Euro,
    Cripto,
}

impl Tab {
    pub fn matches(&self, category: Category) -> bool {
        match self {
            Tab::All => true,
            Tab::Dolar => category == Category::Dolar,
            Tab::Euro => category == Category::Euro,
            Tab::Cripto => category == Category::Cripto,
        }
    }
}

impl Display for Tab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Tab::All => "all",
                Tab::Dolar => "dolar",
                Tab::Euro => "euro",
                Tab::Cripto => "cripto",
            }
        )
    }
}

impl FromStr for Tab {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Tab::All),
            "dolar" => Ok(Tab::Dolar),
            "euro" => Ok(Tab::Euro),
            "cripto" => Ok(Tab::Cripto),
            _ => Err(anyhow::anyhow!("Invalid tab: {}", s)),
        }
    }
}

/// One buy/sell quote for a currency pair from a given source.
///
/// `id` is unique per (base currency, source) combination. Official rates
/// quote the same price on both sides; no ordering between `buy` and `sell`
/// is assumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rate {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub buy: f64,
    pub sell: f64,
    pub variation: f64,
    pub last_update: DateTime<Utc>,
    pub kind: RateKind,
    pub trade_type: TradeType,
    pub base_currency: String,
    pub quote_currency: String,
}

/// Partial update for a stored rate. Unset fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct RatePatch {
    pub name: Option<String>,
    pub buy: Option<f64>,
    pub sell: Option<f64>,
    pub variation: Option<f64>,
}

impl Rate {
    pub fn apply(&mut self, patch: RatePatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(buy) = patch.buy {
            self.buy = buy;
        }
        if let Some(sell) = patch.sell {
            self.sell = sell;
        }
        if let Some(variation) = patch.variation {
            self.variation = variation;
        }
        self.last_update = now;
    }
}

/// Percentage gap of the crypto quote over the official fiat quote.
pub fn crypto_gap(fiat_rate: f64, crypto_rate: f64) -> f64 {
    ((crypto_rate - fiat_rate) / fiat_rate) * 100.0
}

/// Anything that can produce the canonical rate set for one refresh.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_rates(&self) -> Result<Vec<Rate>>;
}
