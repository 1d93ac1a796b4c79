//! JSON file subscription store

use super::{StoreError, SubscriptionStore};
use crate::model::Subscription;
use async_trait::async_trait;
use std::path::PathBuf;

/// Reads subscriptions from a JSON array on disk
pub struct FileSubscriptionStore {
    path: PathBuf,
}

impl FileSubscriptionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Every subscription in the file, whatever its status. A missing file is
    /// an empty store.
    pub async fn load_all(&self) -> Result<Vec<Subscription>, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = ?self.path, "Subscription file not found, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write subscriptions back as pretty JSON
    pub async fn save_all(&self, subscriptions: &[Subscription]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(subscriptions)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for FileSubscriptionStore {
    async fn load_active_subscriptions(&self) -> Result<Vec<Subscription>, StoreError> {
        let all = self.load_all().await?;
        let total = all.len();
        let active: Vec<Subscription> = all.into_iter().filter(|s| s.is_active()).collect();
        tracing::info!(path = ?self.path, total, active = active.len(), "Loaded subscriptions");
        Ok(active)
    }
}
