use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

const USER_AGENT: &str = "vescambio/0.1";

/// One stored quote from the history endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalRate {
    #[serde(default)]
    pub id: Option<i64>,
    pub exchange_code: String,
    pub currency_pair: String,
    pub buy_price: f64,
    pub sell_price: f64,
    #[serde(default)]
    pub avg_price: Option<f64>,
    pub timestamp: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub trade_type: Option<String>,
}

impl HistoricalRate {
    /// Parses the API timestamp, which may or may not carry a timezone.
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .map(|t| t.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%dT%H:%M:%S%.f")
                    .or_else(|_| NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%d %H:%M:%S"))
                    .ok()
                    .map(|t| t.and_utc())
            })
    }
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    status: String,
    data: Vec<HistoricalRate>,
}

pub struct HistoryClient {
    base_url: String,
}

impl HistoryClient {
    pub fn new(base_url: &str) -> Self {
        HistoryClient {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetches up to `limit` historical records, newest first.
    pub async fn fetch_history(&self, limit: usize) -> Result<Vec<HistoricalRate>> {
        let url = format!("{}/api/v1/rates/history?limit={}", self.base_url, limit);
        debug!("Requesting rate history from {}", url);

        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        let response = client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Request failed for URL: {url}"))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {} for rate history", response.status()));
        }

        let text = response.text().await?;
        let data: HistoryResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse history response: {e}"))?;

        if data.status != "success" {
            return Err(anyhow!("History API returned status: {}", data.status));
        }

        let mut records = data.data;
        records.sort_by(|a, b| b.timestamp_utc().cmp(&a.timestamp_utc()));
        Ok(records)
    }
}

/// Client-side filtering; the API does not support these parameters.
pub fn filter_history(
    records: Vec<HistoricalRate>,
    exchange: Option<&str>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<HistoricalRate> {
    records
        .into_iter()
        .filter(|record| {
            exchange.is_none_or(|code| record.exchange_code.eq_ignore_ascii_case(code))
        })
        .filter(|record| {
            let Some(ts) = record.timestamp_utc() else {
                return false;
            };
            let date = ts.date_naive();
            start.is_none_or(|s| date >= s) && end.is_none_or(|e| date <= e)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const HISTORY_JSON: &str = r#"{
        "status": "success",
        "data": [
            {
                "id": 1,
                "exchange_code": "BCV",
                "currency_pair": "USD/VES",
                "buy_price": 36.1,
                "sell_price": 36.1,
                "avg_price": 36.1,
                "timestamp": "2025-06-28T09:00:00Z",
                "source": "bcv",
                "trade_type": "official"
            },
            {
                "id": 2,
                "exchange_code": "BINANCE_P2P",
                "currency_pair": "USDT/VES",
                "buy_price": 37.2,
                "sell_price": 37.8,
                "avg_price": 37.5,
                "timestamp": "2025-06-30T12:00:00Z",
                "source": "binance_p2p",
                "trade_type": "p2p"
            }
        ]
    }"#;

    #[tokio::test]
    async fn test_fetch_history_sorts_newest_first() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/rates/history"))
            .and(query_param("limit", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_string(HISTORY_JSON))
            .mount(&server)
            .await;

        let records = HistoryClient::new(&server.uri()).fetch_history(100).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].exchange_code, "BINANCE_P2P");
        assert_eq!(records[1].exchange_code, "BCV");
    }

    #[tokio::test]
    async fn test_fetch_history_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/rates/history"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"status": "error", "data": []}"#),
            )
            .mount(&server)
            .await;

        let result = HistoryClient::new(&server.uri()).fetch_history(50).await;

        assert!(result.is_err());
    }

    fn record(exchange: &str, timestamp: &str) -> HistoricalRate {
        HistoricalRate {
            id: None,
            exchange_code: exchange.to_string(),
            currency_pair: "USD/VES".to_string(),
            buy_price: 36.5,
            sell_price: 36.5,
            avg_price: None,
            timestamp: timestamp.to_string(),
            source: None,
            trade_type: None,
        }
    }

    #[test]
    fn test_filter_by_exchange_is_case_insensitive() {
        let records = vec![
            record("BCV", "2025-06-28T09:00:00Z"),
            record("BINANCE_P2P", "2025-06-28T10:00:00Z"),
        ];

        let filtered = filter_history(records, Some("bcv"), None, None);

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].exchange_code, "BCV");
    }

    #[test]
    fn test_filter_by_date_range_is_inclusive() {
        let records = vec![
            record("BCV", "2025-06-27T23:59:00Z"),
            record("BCV", "2025-06-28T09:00:00Z"),
            record("BCV", "2025-06-30T00:00:00Z"),
            record("BCV", "2025-07-01T00:00:00Z"),
        ];

        let filtered = filter_history(
            records,
            None,
            Some(NaiveDate::from_ymd_opt(2025, 6, 28).unwrap()),
            Some(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()),
        );

        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_naive_timestamps_are_parsed() {
        let with_space = record("BCV", "2025-06-28 09:00:00");
        let with_t = record("BCV", "2025-06-28T09:00:00.123");

        assert!(with_space.timestamp_utc().is_some());
        assert!(with_t.timestamp_utc().is_some());
        assert!(record("BCV", "garbage").timestamp_utc().is_none());
    }
}
