//! News items

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentiment attached to a news item by the ingestion side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A news item. Immutable once ingested, deduplicated by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    /// Externally assigned unique id
    pub id: String,
    /// Related symbol; empty means general market news
    #[serde(default)]
    pub symbol: String,
    pub title: String,
    /// Body or summary text
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub sentiment: Sentiment,
    /// Impact score in [0, 1]
    #[serde(default)]
    pub impact: Decimal,
    pub published_at: DateTime<Utc>,
}

impl NewsItem {
    /// True for general market news not tied to a symbol
    pub fn is_general(&self) -> bool {
        self.symbol.is_empty()
    }
}
