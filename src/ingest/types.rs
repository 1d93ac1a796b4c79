//! Ingestion contracts

use crate::model::{NewsItem, Quote};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Transient ingestion failures. The sweep logs them and retries next cycle.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Quote API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("No quote returned for {0}")]
    NotFound(String),
    #[error("WebSocket error: {0}")]
    WebSocket(String),
    #[error("Maximum reconnection attempts exceeded")]
    MaxReconnectsExceeded,
    #[error("Source closed")]
    Closed,
}

/// Pull access to the latest quote for a symbol
#[async_trait]
pub trait QuoteFetcher: Send + Sync {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, IngestError>;
}

/// Cached news lookup plus push registration
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Recent news for a symbol, newest first
    async fn latest_news(&self, symbol: &str) -> Result<Vec<NewsItem>, IngestError>;

    /// Register for pushed news. Each new item is delivered once per receiver.
    async fn subscribe(&self) -> Result<mpsc::Receiver<NewsItem>, IngestError>;
}
