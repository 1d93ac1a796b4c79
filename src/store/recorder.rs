//! Alert recorder: drains the dispatcher's stream into a sink

use super::AlertSink;
use crate::dispatch::AlertStream;
use crate::telemetry::{self, CounterMetric};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Recording statistics
#[derive(Debug, Default, Clone)]
pub struct RecorderStats {
    pub alerts_received: u64,
    pub alerts_saved: u64,
    pub save_failures: u64,
    pub last_flush: Option<DateTime<Utc>>,
}

/// Single consumer of the alert stream
pub struct AlertRecorder {
    sink: Arc<dyn AlertSink>,
    flush_interval: Duration,
    stats: Arc<RwLock<RecorderStats>>,
}

impl AlertRecorder {
    pub fn new(sink: Arc<dyn AlertSink>, flush_interval: Duration) -> Self {
        Self {
            sink,
            flush_interval,
            stats: Arc::new(RwLock::new(RecorderStats::default())),
        }
    }

    pub fn stats(&self) -> Arc<RwLock<RecorderStats>> {
        Arc::clone(&self.stats)
    }

    /// Consume alerts until the stream ends, then flush and return final stats
    pub async fn run(self, mut stream: AlertStream) -> RecorderStats {
        let mut last_flush = tokio::time::Instant::now();

        loop {
            tokio::select! {
                result = stream.recv() => {
                    match result {
                        Some(alert) => {
                            tracing::info!(
                                alert_id = %alert.id,
                                user_id = %alert.user_id,
                                subscription_id = %alert.subscription_id,
                                symbol = %alert.symbol,
                                kind = %alert.kind,
                                severity = %alert.severity,
                                title = %alert.title,
                                "Alert"
                            );

                            let saved = self.sink.save_alert(&alert).await;
                            let mut s = self.stats.write().await;
                            s.alerts_received += 1;
                            match saved {
                                Ok(()) => {
                                    s.alerts_saved += 1;
                                    telemetry::increment(CounterMetric::AlertsStored);
                                }
                                Err(e) => {
                                    s.save_failures += 1;
                                    tracing::error!(alert_id = %alert.id, error = %e, "Failed to save alert");
                                }
                            }
                        }
                        None => {
                            self.flush().await;
                            tracing::info!("Alert stream ended, recorder shutting down");
                            break;
                        }
                    }
                }

                _ = tokio::time::sleep_until(last_flush + self.flush_interval) => {
                    self.flush().await;
                    last_flush = tokio::time::Instant::now();
                }
            }
        }

        self.stats.read().await.clone()
    }

    async fn flush(&self) {
        match self.sink.flush().await {
            Ok(()) => {
                self.stats.write().await.last_flush = Some(Utc::now());
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to flush alerts");
            }
        }
    }
}
