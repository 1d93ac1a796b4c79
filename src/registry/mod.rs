//! Subscription registry
//!
//! The single owner of subscription state. The evaluator only ever sees
//! snapshots; the monitor writes back `last_checked_at`, `last_alert_at`
//! and expiry transitions through this API.

mod subscriptions;
mod types;

pub use subscriptions::SubscriptionRegistry;
pub use types::{RegistryError, RegistryStats, ValidationError};
