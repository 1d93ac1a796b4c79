//! Engine configuration, errors and sweep reports

use crate::ingest::IngestError;
use crate::registry::RegistryError;
use crate::store::StoreError;
use std::time::Duration;
use thiserror::Error;

/// Monitoring loop settings
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Time between sweeps
    pub sweep_interval: Duration,
    /// Upper bound on concurrently running news handlers
    pub max_news_handlers: usize,
    /// Subscriptions checked concurrently within one sweep
    pub sweep_concurrency: usize,
    /// Warn about expiry when less than this remains
    pub expiry_warning: chrono::Duration,
    /// Log a staleness warning when a subscription went unchecked this long
    pub stale_after: chrono::Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(5),
            max_news_handlers: 16,
            sweep_concurrency: 8,
            expiry_warning: chrono::Duration::days(7),
            stale_after: chrono::Duration::minutes(10),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Counters for one sweep, or for one subscription within it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Subscriptions examined
    pub subscriptions: usize,
    /// Subscriptions transitioned to expired
    pub expired: usize,
    /// Cancelled subscriptions evicted before the sweep
    pub evicted: usize,
    pub quotes_fetched: usize,
    pub fetch_failures: usize,
    pub matches: usize,
    pub published: usize,
    pub dropped: usize,
    /// Prepared alerts whose subscription stopped being active before publish
    pub discarded: usize,
}

impl SweepReport {
    pub fn merge(&mut self, other: SweepReport) {
        self.subscriptions += other.subscriptions;
        self.expired += other.expired;
        self.evicted += other.evicted;
        self.quotes_fetched += other.quotes_fetched;
        self.fetch_failures += other.fetch_failures;
        self.matches += other.matches;
        self.published += other.published;
        self.dropped += other.dropped;
        self.discarded += other.discarded;
    }
}
