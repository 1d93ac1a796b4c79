//! Domain data model
//!
//! Quotes and news flow in from ingestion, subscriptions are owned by the
//! registry, and alert events flow out of the dispatcher.

mod alert;
mod news;
mod quote;
mod subscription;

pub use alert::{AlertEvent, Severity};
pub use news::{NewsItem, Sentiment};
pub use quote::Quote;
pub use subscription::{AlertRule, Subscription, SubscriptionStatus};
