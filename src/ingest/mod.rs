//! Quote and news ingestion
//!
//! The engine sees ingestion only through [`QuoteFetcher`] and [`NewsSource`].
//! Concrete adapters: an HTTP quote service client, an in-memory news hub and
//! a WebSocket feed that fills the hub.

mod hub;
mod quotes;
mod types;
mod ws;

pub use hub::NewsHub;
pub use quotes::{HttpQuoteClient, QuoteClientConfig};
pub use types::{IngestError, NewsSource, QuoteFetcher};
pub use ws::{WsNewsConfig, WsNewsFeed};
