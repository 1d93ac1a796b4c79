//! Dispatch outcomes, counters and the consumer-side stream

use crate::model::AlertEvent;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Result of handing one match to the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Event queued on the output channel
    Published(Uuid),
    /// Channel full; event discarded and counted
    Dropped,
    /// Dispatcher closed or consumer gone
    Closed,
}

impl DispatchOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published(_))
    }
}

/// Monotonic dispatch counters, shared with callers
#[derive(Debug, Default)]
pub struct DispatchStats {
    published: AtomicU64,
    dropped: AtomicU64,
    closed: AtomicU64,
    enrichment_fallbacks: AtomicU64,
}

/// Plain copy of [`DispatchStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSnapshot {
    pub published: u64,
    pub dropped: u64,
    pub closed: u64,
    pub enrichment_fallbacks: u64,
}

impl DispatchStats {
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn closed(&self) -> u64 {
        self.closed.load(Ordering::Relaxed)
    }

    pub fn enrichment_fallbacks(&self) -> u64 {
        self.enrichment_fallbacks.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            published: self.published(),
            dropped: self.dropped(),
            closed: self.closed(),
            enrichment_fallbacks: self.enrichment_fallbacks(),
        }
    }

    pub(crate) fn record(&self, outcome: DispatchOutcome) {
        let counter = match outcome {
            DispatchOutcome::Published(_) => &self.published,
            DispatchOutcome::Dropped => &self.dropped,
            DispatchOutcome::Closed => &self.closed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fallback(&self) {
        self.enrichment_fallbacks.fetch_add(1, Ordering::Relaxed);
    }
}

/// Read side of the dispatcher's bounded output channel.
///
/// Yields `None` once the dispatcher is closed and every queued event has been
/// received.
pub struct AlertStream {
    receiver: mpsc::Receiver<AlertEvent>,
}

impl AlertStream {
    pub(crate) fn new(receiver: mpsc::Receiver<AlertEvent>) -> Self {
        Self { receiver }
    }

    pub async fn recv(&mut self) -> Option<AlertEvent> {
        self.receiver.recv().await
    }

    /// Non-blocking receive; `None` when nothing is queued right now
    pub fn try_recv(&mut self) -> Option<AlertEvent> {
        self.receiver.try_recv().ok()
    }
}
