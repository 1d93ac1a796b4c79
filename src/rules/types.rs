//! Evaluation output types

use super::RuleKind;
use crate::model::{NewsItem, Quote, Severity};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// The event that caused a rule to fire
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    /// A market quote (price-change, volume-spike, price-level)
    Quote(Quote),
    /// A significant news item (news-impact)
    News(NewsItem),
    /// A subscription nearing its expiry (system)
    Expiry {
        expires_at: DateTime<Utc>,
        remaining: chrono::Duration,
    },
}

/// One rule evaluated true against one event. Not yet an alert: it carries no
/// identity or timestamp, so evaluating the same input twice yields equal
/// matches.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggeredMatch {
    /// Rule that fired; `None` for monitor-generated system matches
    pub rule_id: Option<String>,
    pub kind: RuleKind,
    pub trigger: Trigger,
    pub threshold: Decimal,
    pub intensity: Decimal,
    pub severity: Severity,
}

impl TriggeredMatch {
    /// Symbol the match refers to; empty for general news and system matches
    pub fn symbol(&self) -> &str {
        match &self.trigger {
            Trigger::Quote(quote) => &quote.symbol,
            Trigger::News(news) => &news.symbol,
            Trigger::Expiry { .. } => "",
        }
    }

    /// Stock name if the trigger carries one
    pub fn stock_name(&self) -> &str {
        match &self.trigger {
            Trigger::Quote(quote) => &quote.name,
            _ => "",
        }
    }
}
