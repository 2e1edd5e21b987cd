use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::join;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::normalize::{UsdtQuotes, first_value, official_rate, parse_variation, positive, usdt_rate};
use crate::core::rate::{Category, Rate, RateKind, RateSource, TradeType};

const USER_AGENT: &str = "vescambio/0.1";

/// Rate source backed by the CrystoDolar rates API.
///
/// The current flat endpoint is the primary shape; when it is unavailable the
/// three legacy endpoints (compare, scrape-bcv, binance-p2p/complete) are
/// merged through the extractor chains in [`super::normalize`].
pub struct ApiRateSource {
    base_url: String,
}

impl ApiRateSource {
    pub fn new(base_url: &str) -> Self {
        ApiRateSource {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, client: &reqwest::Client, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Requesting rates from {}", url);

        let response = client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Request failed for URL: {url}"))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {} for URL: {}", response.status(), url));
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| anyhow!("Failed to parse response from {}: {}", url, e))
    }

    async fn fetch_current(&self) -> Result<Vec<Rate>> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        let data: CurrentResponse = self.get_json(&client, "/api/v1/rates/current").await?;

        if data.status != "success" {
            return Err(anyhow!("Rates API returned status: {}", data.status));
        }

        let rates = normalize_current(data.data);
        if rates.is_empty() {
            return Err(anyhow!("No rates could be resolved from the current response"));
        }
        Ok(rates)
    }

    async fn fetch_legacy(&self) -> Result<Vec<Rate>> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        let (compare, scrape, complete) = join!(
            self.get_json::<CompareResponse>(&client, "/api/v1/rates/compare"),
            self.get_json::<ScrapeBcvResponse>(&client, "/api/v1/rates/scrape-bcv"),
            self.get_json::<BinanceCompleteResponse>(&client, "/api/v1/rates/binance-p2p/complete"),
        );

        let compare = match compare {
            // Keep the first cause so connectivity failures stay recognizable.
            Err(e) if scrape.is_err() && complete.is_err() => {
                return Err(e.context("All legacy rate endpoints failed"));
            }
            other => ok_or_warn(other, "compare"),
        };
        let scrape = ok_or_warn(scrape, "scrape-bcv");
        let complete = ok_or_warn(complete, "binance-p2p/complete");

        let bcv = compare.as_ref().and_then(|c| c.data.bcv.as_ref());
        let p2p = compare.as_ref().and_then(|c| c.data.binance_p2p.as_ref());
        let scraped = scrape.map(|s| s.data);
        let complete = complete.map(|c| c.data);
        let buy_quote = complete.as_ref().and_then(|d| d.buy_usdt.as_ref());
        let sell_quote = complete.as_ref().and_then(|d| d.sell_usdt.as_ref());

        // Direct scrape wins over the compare aggregate.
        let usd_ves = first_value([
            positive(scraped.as_ref().and_then(|d| d.usd_ves)),
            positive(bcv.and_then(|b| b.usd_ves)),
        ]);
        // EUR only exists on the scrape path; absent means no euro card.
        let eur_ves = positive(scraped.as_ref().and_then(|d| d.eur_ves));

        // The compare quotes are market-side, the card shows the user side,
        // hence the buy/sell swap on the fallback.
        let usdt = UsdtQuotes {
            buy: first_value([
                positive(buy_quote.and_then(|q| q.price)),
                positive(p2p.and_then(|p| p.usdt_ves_sell)),
            ]),
            sell: first_value([
                positive(sell_quote.and_then(|q| q.price)),
                positive(p2p.and_then(|p| p.usdt_ves_buy)),
            ]),
            avg: first_value([
                positive(buy_quote.and_then(|q| q.avg_price)),
                positive(sell_quote.and_then(|q| q.avg_price)),
                positive(p2p.and_then(|p| p.usdt_ves_avg)),
            ]),
        };

        let now = Utc::now();
        let mut rates = Vec::new();
        if let Some(usd) = usd_ves {
            rates.push(official_rate(Category::Dolar, usd, now));
        }
        if let Some(eur) = eur_ves {
            rates.push(official_rate(Category::Euro, eur, now));
        }
        if let Some(rate) = usdt_rate(usdt, now) {
            rates.push(rate);
        }

        if rates.is_empty() {
            return Err(anyhow!("No rates could be resolved from the legacy endpoints"));
        }
        Ok(rates)
    }
}

fn ok_or_warn<T>(result: Result<T>, endpoint: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = ?e, endpoint, "Legacy endpoint failed, continuing without it");
            None
        }
    }
}

#[async_trait]
impl RateSource for ApiRateSource {
    #[instrument(name = "RatesFetch", skip(self))]
    async fn fetch_rates(&self) -> Result<Vec<Rate>> {
        match self.fetch_current().await {
            Ok(rates) => Ok(rates),
            Err(e) => {
                debug!(error = ?e, "Current endpoint unavailable, trying legacy endpoints");
                self.fetch_legacy().await
            }
        }
    }
}

// Current flat shape

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    status: String,
    data: Vec<ApiRateData>,
}

#[derive(Debug, Deserialize)]
struct ApiRateData {
    base_currency: String,
    #[serde(default)]
    quote_currency: Option<String>,
    buy_price: f64,
    sell_price: f64,
    #[serde(default)]
    source: Option<String>,
    trade_type: String,
    #[serde(default)]
    variation_percentage: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

fn normalize_current(records: Vec<ApiRateData>) -> Vec<Rate> {
    let mut rates: Vec<Rate> = Vec::new();

    for record in records {
        let trade_type = if record.trade_type.eq_ignore_ascii_case("p2p") {
            TradeType::P2p
        } else {
            TradeType::Official
        };
        let category = match (record.base_currency.as_str(), trade_type) {
            ("USD", TradeType::Official) => Category::Dolar,
            ("EUR", TradeType::Official) => Category::Euro,
            ("USDT", _) => Category::Cripto,
            _ => {
                debug!(base = %record.base_currency, "Skipping unrecognized rate record");
                continue;
            }
        };
        // At most one record per category; the API lists the freshest first.
        if rates.iter().any(|r| r.category == category) {
            continue;
        }

        let (buy, sell) = match (positive(Some(record.buy_price)), positive(Some(record.sell_price))) {
            (Some(b), Some(s)) => (b, s),
            (Some(b), None) => (b, b),
            (None, Some(s)) => (s, s),
            (None, None) => continue,
        };

        let name = match category {
            Category::Dolar => "Dólar Oficial",
            Category::Euro => "Euro Oficial",
            Category::Cripto => "USDT",
        };
        let kind = match category {
            Category::Cripto => RateKind::Crypto,
            _ => RateKind::Fiat,
        };
        let source_slug = record
            .source
            .as_deref()
            .unwrap_or(match trade_type {
                TradeType::Official => "bcv",
                TradeType::P2p => "binance_p2p",
            })
            .to_lowercase()
            .replace(' ', "_");
        let last_update = record
            .timestamp
            .as_deref()
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        rates.push(Rate {
            id: format!("{}-{}", record.base_currency.to_lowercase(), source_slug),
            name: name.to_string(),
            category,
            buy,
            sell,
            variation: record
                .variation_percentage
                .as_deref()
                .map(parse_variation)
                .unwrap_or(0.0),
            last_update,
            kind,
            trade_type,
            base_currency: record.base_currency,
            quote_currency: record.quote_currency.unwrap_or_else(|| "VES".to_string()),
        });
    }

    rates
}

// Legacy shapes

#[derive(Debug, Default, Deserialize)]
struct CompareResponse {
    #[serde(default)]
    data: CompareData,
}

#[derive(Debug, Default, Deserialize)]
struct CompareData {
    bcv: Option<CompareBcv>,
    binance_p2p: Option<CompareP2p>,
}

#[derive(Debug, Deserialize)]
struct CompareBcv {
    usd_ves: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CompareP2p {
    usdt_ves_buy: Option<f64>,
    usdt_ves_sell: Option<f64>,
    usdt_ves_avg: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct ScrapeBcvResponse {
    #[serde(default)]
    data: ScrapeBcvData,
}

#[derive(Debug, Default, Deserialize)]
struct ScrapeBcvData {
    usd_ves: Option<f64>,
    eur_ves: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct BinanceCompleteResponse {
    #[serde(default)]
    data: BinanceCompleteData,
}

#[derive(Debug, Default, Deserialize)]
struct BinanceCompleteData {
    buy_usdt: Option<P2pQuote>,
    sell_usdt: Option<P2pQuote>,
}

#[derive(Debug, Deserialize)]
struct P2pQuote {
    price: Option<f64>,
    avg_price: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount(server: &MockServer, endpoint: &str, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path(endpoint))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    const CURRENT_JSON: &str = r#"{
        "status": "success",
        "data": [
            {
                "base_currency": "USD",
                "quote_currency": "VES",
                "buy_price": 36.50,
                "sell_price": 36.50,
                "source": "BCV",
                "trade_type": "official",
                "variation_percentage": "+0.50%",
                "timestamp": "2025-06-30T12:00:00Z",
                "currency_pair": "USD/VES"
            },
            {
                "base_currency": "USDT",
                "quote_currency": "VES",
                "buy_price": 37.20,
                "sell_price": 37.80,
                "source": "Binance P2P",
                "trade_type": "p2p",
                "variation_percentage": "-1.2",
                "timestamp": "2025-06-30T12:00:00Z",
                "currency_pair": "USDT/VES"
            }
        ]
    }"#;

    #[tokio::test]
    async fn test_current_shape_is_normalized() {
        let server = MockServer::start().await;
        mount(&server, "/api/v1/rates/current", 200, CURRENT_JSON).await;

        let source = ApiRateSource::new(&server.uri());
        let rates = source.fetch_rates().await.unwrap();

        assert_eq!(rates.len(), 2);

        let usd = &rates[0];
        assert_eq!(usd.id, "usd-bcv");
        assert_eq!(usd.category, Category::Dolar);
        assert_eq!(usd.buy, 36.5);
        assert_eq!(usd.variation, 0.5);
        assert_eq!(usd.trade_type, TradeType::Official);

        let usdt = &rates[1];
        assert_eq!(usdt.id, "usdt-binance_p2p");
        assert_eq!(usdt.category, Category::Cripto);
        assert_eq!(usdt.buy, 37.2);
        assert_eq!(usdt.sell, 37.8);
        assert_eq!(usdt.variation, -1.2);
        assert_eq!(usdt.kind, RateKind::Crypto);
    }

    #[tokio::test]
    async fn test_current_shape_deduplicates_categories() {
        let body = r#"{
            "status": "success",
            "data": [
                {"base_currency": "USD", "buy_price": 36.5, "sell_price": 36.5, "trade_type": "official"},
                {"base_currency": "USD", "buy_price": 99.0, "sell_price": 99.0, "trade_type": "official"}
            ]
        }"#;
        let server = MockServer::start().await;
        mount(&server, "/api/v1/rates/current", 200, body).await;

        let rates = ApiRateSource::new(&server.uri()).fetch_rates().await.unwrap();

        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].buy, 36.5);
    }

    #[tokio::test]
    async fn test_current_shape_skips_zero_prices() {
        let body = r#"{
            "status": "success",
            "data": [
                {"base_currency": "USD", "buy_price": 0.0, "sell_price": 0.0, "trade_type": "official"},
                {"base_currency": "USDT", "buy_price": 37.2, "sell_price": 0.0, "trade_type": "p2p"}
            ]
        }"#;
        let server = MockServer::start().await;
        mount(&server, "/api/v1/rates/current", 200, body).await;

        let rates = ApiRateSource::new(&server.uri()).fetch_rates().await.unwrap();

        // The zero-priced USD record is dropped rather than shown as 0.
        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].category, Category::Cripto);
        assert_eq!(rates[0].buy, 37.2);
        assert_eq!(rates[0].sell, 37.2);
    }

    #[tokio::test]
    async fn test_falls_back_to_legacy_endpoints() {
        let server = MockServer::start().await;
        mount(&server, "/api/v1/rates/current", 404, "not found").await;
        mount(
            &server,
            "/api/v1/rates/compare",
            200,
            r#"{"data": {"bcv": {"usd_ves": 36.5}, "binance_p2p": {"usdt_ves_buy": 37.0, "usdt_ves_sell": 37.6, "usdt_ves_avg": 37.3}}}"#,
        )
        .await;
        mount(
            &server,
            "/api/v1/rates/scrape-bcv",
            200,
            r#"{"data": {"usd_ves": 36.55, "eur_ves": 39.80}}"#,
        )
        .await;
        mount(
            &server,
            "/api/v1/rates/binance-p2p/complete",
            200,
            r#"{"data": {"buy_usdt": {"price": 37.2, "avg_price": 37.25}, "sell_usdt": {"price": 37.8, "avg_price": 37.75}}}"#,
        )
        .await;

        let rates = ApiRateSource::new(&server.uri()).fetch_rates().await.unwrap();

        assert_eq!(rates.len(), 3);
        // Direct scrape beats the compare aggregate.
        assert_eq!(rates[0].id, "usd-bcv");
        assert_eq!(rates[0].buy, 36.55);
        assert_eq!(rates[1].id, "eur-bcv");
        assert_eq!(rates[1].buy, 39.8);
        // Explicit complete quotes beat the compare fallback.
        assert_eq!(rates[2].id, "usdt-binance");
        assert_eq!(rates[2].buy, 37.2);
        assert_eq!(rates[2].sell, 37.8);
    }

    #[tokio::test]
    async fn test_legacy_usd_from_compare_when_scrape_fails() {
        let server = MockServer::start().await;
        mount(&server, "/api/v1/rates/current", 500, "").await;
        mount(
            &server,
            "/api/v1/rates/compare",
            200,
            r#"{"data": {"bcv": {"usd_ves": 36.5}, "binance_p2p": {"usdt_ves_buy": 37.0, "usdt_ves_sell": 37.6}}}"#,
        )
        .await;
        mount(&server, "/api/v1/rates/scrape-bcv", 500, "").await;
        mount(&server, "/api/v1/rates/binance-p2p/complete", 500, "").await;

        let rates = ApiRateSource::new(&server.uri()).fetch_rates().await.unwrap();

        assert_eq!(rates.len(), 2);
        assert_eq!(rates[0].id, "usd-bcv");
        assert_eq!(rates[0].buy, 36.5);
        // No euro record without the scrape path.
        assert!(rates.iter().all(|r| r.category != Category::Euro));
        // Compare quotes are market-side, so buy/sell are swapped.
        assert_eq!(rates[1].buy, 37.6);
        assert_eq!(rates[1].sell, 37.0);
    }

    #[tokio::test]
    async fn test_legacy_average_only_covers_both_sides() {
        let server = MockServer::start().await;
        mount(&server, "/api/v1/rates/current", 500, "").await;
        mount(&server, "/api/v1/rates/compare", 500, "").await;
        mount(&server, "/api/v1/rates/scrape-bcv", 500, "").await;
        mount(
            &server,
            "/api/v1/rates/binance-p2p/complete",
            200,
            r#"{"data": {"buy_usdt": {"price": null, "avg_price": 37.5}}}"#,
        )
        .await;

        let rates = ApiRateSource::new(&server.uri()).fetch_rates().await.unwrap();

        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].buy, 37.5);
        assert_eq!(rates[0].sell, 37.5);
    }

    #[tokio::test]
    async fn test_usd_without_eur_yields_no_euro_record() {
        let server = MockServer::start().await;
        mount(&server, "/api/v1/rates/current", 500, "").await;
        mount(&server, "/api/v1/rates/compare", 500, "").await;
        mount(
            &server,
            "/api/v1/rates/scrape-bcv",
            200,
            r#"{"data": {"usd_ves": 36.50}}"#,
        )
        .await;
        mount(&server, "/api/v1/rates/binance-p2p/complete", 500, "").await;

        let rates = ApiRateSource::new(&server.uri()).fetch_rates().await.unwrap();

        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].category, Category::Dolar);
        assert_eq!(rates[0].buy, 36.5);
    }

    #[tokio::test]
    async fn test_all_endpoints_down_is_an_error() {
        let server = MockServer::start().await;
        mount(&server, "/api/v1/rates/current", 500, "").await;
        mount(&server, "/api/v1/rates/compare", 500, "").await;
        mount(&server, "/api/v1/rates/scrape-bcv", 500, "").await;
        mount(&server, "/api/v1/rates/binance-p2p/complete", 500, "").await;

        let result = ApiRateSource::new(&server.uri()).fetch_rates().await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_malformed_current_response_falls_back() {
        let server = MockServer::start().await;
        mount(&server, "/api/v1/rates/current", 200, "{not json").await;
        mount(&server, "/api/v1/rates/compare", 500, "").await;
        mount(
            &server,
            "/api/v1/rates/scrape-bcv",
            200,
            r#"{"data": {"usd_ves": 36.50}}"#,
        )
        .await;
        mount(&server, "/api/v1/rates/binance-p2p/complete", 500, "").await;

        let rates = ApiRateSource::new(&server.uri()).fetch_rates().await.unwrap();

        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].id, "usd-bcv");
    }

    #[tokio::test]
    async fn test_current_error_status_is_rejected() {
        let server = MockServer::start().await;
        mount(
            &server,
            "/api/v1/rates/current",
            200,
            r#"{"status": "error", "data": []}"#,
        )
        .await;
        mount(&server, "/api/v1/rates/compare", 500, "").await;
        mount(&server, "/api/v1/rates/scrape-bcv", 500, "").await;
        mount(&server, "/api/v1/rates/binance-p2p/complete", 500, "").await;

        let result = ApiRateSource::new(&server.uri()).fetch_rates().await;

        assert!(result.is_err());
    }
}
