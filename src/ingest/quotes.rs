//! HTTP quote service client
//!
//! Talks to a quote service exposing `GET /api/quotes?symbols=A,B` that
//! answers with a JSON array of quotes, timestamps in unix seconds.

use super::{IngestError, QuoteFetcher};
use crate::model::Quote;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

/// Configuration for the quote client
#[derive(Debug, Clone)]
pub struct QuoteClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for QuoteClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5001".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiQuote {
    symbol: String,
    #[serde(default)]
    name: String,
    price: Decimal,
    #[serde(default)]
    open: Decimal,
    #[serde(default)]
    high: Decimal,
    #[serde(default)]
    low: Decimal,
    #[serde(default)]
    volume: Decimal,
    #[serde(default)]
    change_percent: Decimal,
    /// Unix seconds
    #[serde(default)]
    timestamp: i64,
}

impl From<ApiQuote> for Quote {
    fn from(api: ApiQuote) -> Self {
        let timestamp = Utc
            .timestamp_opt(api.timestamp, 0)
            .single()
            .filter(|_| api.timestamp > 0)
            .unwrap_or_else(Utc::now);
        Quote {
            symbol: api.symbol,
            name: api.name,
            price: api.price,
            open: api.open,
            high: api.high,
            low: api.low,
            volume: api.volume,
            change_percent: api.change_percent,
            timestamp,
        }
    }
}

/// Client for the quote service
pub struct HttpQuoteClient {
    config: QuoteClientConfig,
    client: Client,
}

impl HttpQuoteClient {
    pub fn new(config: QuoteClientConfig) -> Result<Self, IngestError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    fn quotes_url(&self) -> String {
        format!("{}/api/quotes", self.config.base_url.trim_end_matches('/'))
    }

    /// Fetch quotes for several symbols in one request
    pub async fn fetch_quotes(&self, symbols: &[&str]) -> Result<Vec<Quote>, IngestError> {
        let url = self.quotes_url();
        let joined = symbols.join(",");

        tracing::debug!(url = %url, symbols = %joined, "Fetching quotes");

        let response = self
            .client
            .get(&url)
            .query(&[("symbols", joined.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(IngestError::Status { status, body });
        }

        let body = response.text().await?;
        parse_quotes(&body)
    }
}

fn parse_quotes(body: &str) -> Result<Vec<Quote>, IngestError> {
    let quotes: Vec<ApiQuote> =
        serde_json::from_str(body).map_err(|e| IngestError::Decode(e.to_string()))?;
    Ok(quotes.into_iter().map(Quote::from).collect())
}

#[async_trait]
impl QuoteFetcher for HttpQuoteClient {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, IngestError> {
        self.fetch_quotes(&[symbol])
            .await?
            .into_iter()
            .find(|q| q.symbol == symbol)
            .ok_or_else(|| IngestError::NotFound(symbol.to_string()))
    }
}
