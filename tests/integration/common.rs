//! Shared fixtures

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use trade_radar::dispatch::{AlertDispatcher, AlertStream};
use trade_radar::engine::{EngineConfig, MonitorEngine};
use trade_radar::ingest::{IngestError, NewsHub, QuoteFetcher};
use trade_radar::model::{AlertRule, Quote, Subscription};
use trade_radar::rules::RuleKind;

/// Quote source backed by an in-memory map
#[derive(Default)]
pub struct StaticQuotes {
    quotes: RwLock<HashMap<String, Quote>>,
}

impl StaticQuotes {
    pub async fn set(&self, quote: Quote) {
        self.quotes.write().await.insert(quote.symbol.clone(), quote);
    }
}

#[async_trait]
impl QuoteFetcher for StaticQuotes {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, IngestError> {
        self.quotes
            .read()
            .await
            .get(symbol)
            .cloned()
            .ok_or_else(|| IngestError::NotFound(symbol.to_string()))
    }
}

pub fn quote(symbol: &str, change_percent: Decimal) -> Quote {
    Quote {
        symbol: symbol.to_string(),
        name: "Ping An Bank".to_string(),
        price: dec!(12.35),
        open: dec!(11.60),
        high: dec!(12.40),
        low: dec!(11.55),
        volume: dec!(2500000),
        change_percent,
        timestamp: Utc::now(),
    }
}

pub fn subscription(id: &str, symbols: &[&str], rules: Vec<AlertRule>) -> Subscription {
    Subscription::new("user-1", symbols.iter().map(|s| s.to_string()).collect(), rules).with_id(id)
}

pub fn rule(kind: RuleKind, threshold: Decimal) -> AlertRule {
    AlertRule::new(kind, threshold)
}

pub struct Setup {
    pub engine: Arc<MonitorEngine>,
    pub quotes: Arc<StaticQuotes>,
    pub hub: Arc<NewsHub>,
    pub stream: AlertStream,
}

pub fn setup(alert_buffer: usize) -> Setup {
    let quotes = Arc::new(StaticQuotes::default());
    let hub = Arc::new(NewsHub::new(Duration::from_secs(3600)));
    let (dispatcher, stream) = AlertDispatcher::channel(alert_buffer);
    let engine = MonitorEngine::new(
        EngineConfig {
            sweep_interval: Duration::from_millis(50),
            ..Default::default()
        },
        quotes.clone(),
        hub.clone(),
        Arc::new(dispatcher),
    );
    Setup {
        engine: Arc::new(engine),
        quotes,
        hub,
        stream,
    }
}
