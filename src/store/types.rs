//! Persistence contracts

use crate::model::{AlertEvent, Subscription};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Parquet error: {0}")]
    Parquet(#[from] ::parquet::errors::ParquetError),
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// Source of the subscriptions the engine starts with
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn load_active_subscriptions(&self) -> Result<Vec<Subscription>, StoreError>;
}

/// Destination for dispatched alerts
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Store one alert. Saving an id that was already stored is a no-op.
    async fn save_alert(&self, alert: &AlertEvent) -> Result<(), StoreError>;

    /// Persist anything buffered
    async fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
