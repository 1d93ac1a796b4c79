//! Persistence
//!
//! The engine reads seed subscriptions through [`SubscriptionStore`] at
//! startup. Alerts are persisted by an [`AlertRecorder`] draining the
//! dispatcher's stream into an [`AlertSink`], never by the engine itself.

mod parquet;
mod recorder;
mod subscriptions;
mod types;

pub use self::parquet::{alert_schema, read_alerts, ParquetAlertSink};
pub use recorder::{AlertRecorder, RecorderStats};
pub use subscriptions::FileSubscriptionStore;
pub use types::{AlertSink, StoreError, SubscriptionStore};
