//! Market quote snapshot

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A point-in-time quote for one exchange-qualified symbol (e.g. "000001.SZ")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Exchange-qualified symbol
    pub symbol: String,
    /// Display name of the stock
    #[serde(default)]
    pub name: String,
    /// Last traded price
    pub price: Decimal,
    #[serde(default)]
    pub open: Decimal,
    #[serde(default)]
    pub high: Decimal,
    #[serde(default)]
    pub low: Decimal,
    /// Traded volume for the session
    #[serde(default)]
    pub volume: Decimal,
    /// Change versus previous close, in percent (6.5 means +6.5%)
    #[serde(default)]
    pub change_percent: Decimal,
    /// Quote time
    pub timestamp: DateTime<Utc>,
}

impl Quote {
    /// Name to show in alert text, falling back to the symbol
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.symbol
        } else {
            &self.name
        }
    }
}
