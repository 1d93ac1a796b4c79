//! In-memory news hub: cache, dedupe and fan-out

use super::{IngestError, NewsSource};
use crate::model::NewsItem;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;

/// Default per-subscriber channel capacity
const SUBSCRIBER_CAPACITY: usize = 256;

struct CachedNews {
    item: NewsItem,
    received_at: Instant,
}

#[derive(Default)]
struct HubState {
    items: HashMap<String, CachedNews>,
    subscribers: Vec<mpsc::Sender<NewsItem>>,
}

/// Keeps recent news by id and broadcasts new items to subscribers.
///
/// An id seen within the retention window is ignored and not re-broadcast.
/// Broadcasting never waits on a slow subscriber.
pub struct NewsHub {
    retention: Duration,
    subscriber_capacity: usize,
    state: RwLock<HubState>,
}

impl NewsHub {
    pub fn new(retention: Duration) -> Self {
        Self {
            retention,
            subscriber_capacity: SUBSCRIBER_CAPACITY,
            state: RwLock::new(HubState::default()),
        }
    }

    /// Builder: per-subscriber buffer size
    pub fn with_subscriber_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_capacity = capacity.max(1);
        self
    }

    /// Cache and broadcast an item. Returns false for a duplicate id.
    pub async fn publish(&self, item: NewsItem) -> bool {
        let mut state = self.state.write().await;
        self.prune(&mut state);

        if state.items.contains_key(&item.id) {
            tracing::trace!(news_id = %item.id, "Duplicate news item ignored");
            return false;
        }

        state.subscribers.retain(|tx| match tx.try_send(item.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(news_id = %item.id, "News subscriber lagging, item skipped");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });

        tracing::debug!(news_id = %item.id, symbol = %item.symbol, title = %item.title, "News item cached");
        state.items.insert(
            item.id.clone(),
            CachedNews {
                item,
                received_at: Instant::now(),
            },
        );
        true
    }

    /// Items for `symbol` published within the retention window, newest first
    pub async fn latest(&self, symbol: &str) -> Vec<NewsItem> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(self.retention).unwrap_or_else(|_| chrono::Duration::zero());
        let state = self.state.read().await;
        let mut items: Vec<NewsItem> = state
            .items
            .values()
            .map(|c| &c.item)
            .filter(|item| item.symbol == symbol && item.published_at >= cutoff)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        items
    }

    /// Register a new subscriber
    pub async fn subscribe_channel(&self) -> mpsc::Receiver<NewsItem> {
        let (tx, rx) = mpsc::channel(self.subscriber_capacity);
        self.state.write().await.subscribers.push(tx);
        rx
    }

    /// Number of cached items
    pub async fn len(&self) -> usize {
        self.state.read().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn prune(&self, state: &mut HubState) {
        let retention = self.retention;
        state
            .items
            .retain(|_, cached| cached.received_at.elapsed() < retention);
    }
}

#[async_trait]
impl NewsSource for NewsHub {
    async fn latest_news(&self, symbol: &str) -> Result<Vec<NewsItem>, IngestError> {
        Ok(self.latest(symbol).await)
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<NewsItem>, IngestError> {
        Ok(self.subscribe_channel().await)
    }
}
