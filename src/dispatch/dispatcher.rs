//! Alert dispatcher

use super::templates;
use super::{AlertStream, DispatchOutcome, DispatchStats};
use crate::analysis::{AnalysisContext, AnalysisError, Analyzer};
use crate::model::{AlertEvent, Subscription};
use crate::rules::{RuleKind, Trigger, TriggeredMatch};
use crate::telemetry::{self, AlertOutcome, CounterMetric, LatencyMetric};
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Default bound on one enrichment call
pub const DEFAULT_ANALYSIS_TIMEOUT: Duration = Duration::from_secs(3);

/// Turns matches into alert events and publishes them onto a bounded channel.
///
/// Publishing never waits: when the channel is full the event is dropped and
/// counted. Many tasks may dispatch concurrently through a shared reference.
pub struct AlertDispatcher {
    sender: RwLock<Option<mpsc::Sender<AlertEvent>>>,
    analyzer: Option<Arc<dyn Analyzer>>,
    analysis_timeout: Duration,
    stats: Arc<DispatchStats>,
}

impl AlertDispatcher {
    /// Create a dispatcher and the stream its events are published to.
    /// A zero capacity is raised to one.
    pub fn channel(capacity: usize) -> (Self, AlertStream) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let dispatcher = Self {
            sender: RwLock::new(Some(tx)),
            analyzer: None,
            analysis_timeout: DEFAULT_ANALYSIS_TIMEOUT,
            stats: Arc::new(DispatchStats::default()),
        };
        (dispatcher, AlertStream::new(rx))
    }

    /// Builder: enrich alerts through `analyzer`, bounded by `timeout`
    pub fn with_analyzer(mut self, analyzer: Arc<dyn Analyzer>, timeout: Duration) -> Self {
        self.analyzer = Some(analyzer);
        self.analysis_timeout = timeout;
        self
    }

    pub fn stats(&self) -> Arc<DispatchStats> {
        Arc::clone(&self.stats)
    }

    /// Build the event for a match without enrichment
    pub fn build_event(&self, matched: &TriggeredMatch, subscription: &Subscription) -> AlertEvent {
        AlertEvent {
            id: Uuid::new_v4(),
            user_id: subscription.user_id.clone(),
            subscription_id: subscription.id.clone(),
            symbol: matched.symbol().to_string(),
            stock_name: matched.stock_name().to_string(),
            kind: matched.kind,
            severity: matched.severity,
            title: templates::title(matched),
            message: templates::message(matched, subscription),
            ai_analysis: None,
            intensity: matched.intensity,
            threshold: matched.threshold,
            is_read: false,
            is_notified: false,
            created_at: Utc::now(),
        }
    }

    /// Analysis text for an event. System notices carry none; otherwise the
    /// analyzer's answer or the templated fallback.
    async fn enrich(&self, matched: &TriggeredMatch, event: &AlertEvent) -> Option<String> {
        if matched.kind == RuleKind::System {
            return None;
        }
        let Some(analyzer) = &self.analyzer else {
            return Some(templates::fallback_analysis(matched));
        };

        let context = AnalysisContext {
            symbol: event.symbol.clone(),
            stock_name: event.stock_name.clone(),
            kind: event.kind,
            severity: event.severity,
            intensity: event.intensity,
            threshold: event.threshold,
            message: event.message.clone(),
            headline: match &matched.trigger {
                Trigger::News(news) => Some(news.title.clone()),
                _ => None,
            },
        };

        let started = Instant::now();
        let result = match tokio::time::timeout(self.analysis_timeout, analyzer.analyze(&context)).await {
            Ok(result) => result,
            Err(_) => Err(AnalysisError::Timeout(self.analysis_timeout)),
        };
        telemetry::record_latency(LatencyMetric::Analysis, started.elapsed());

        match result {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(
                    alert_id = %event.id,
                    symbol = %event.symbol,
                    error = %e,
                    "Alert analysis failed, using fallback text"
                );
                self.stats.record_fallback();
                telemetry::increment(CounterMetric::EnrichmentFallbacks);
                Some(templates::fallback_analysis(matched))
            }
        }
    }

    /// Build and enrich the event for `matched` without publishing it
    pub async fn prepare(&self, matched: &TriggeredMatch, subscription: &Subscription) -> AlertEvent {
        let mut event = self.build_event(matched, subscription);
        event.ai_analysis = self.enrich(matched, &event).await;
        event
    }

    /// Build, enrich and publish one alert for `matched`
    pub async fn dispatch(&self, matched: &TriggeredMatch, subscription: &Subscription) -> DispatchOutcome {
        if self.is_closed().await {
            self.stats.record(DispatchOutcome::Closed);
            return DispatchOutcome::Closed;
        }

        let event = self.prepare(matched, subscription).await;
        self.publish(event).await
    }

    /// Publish an already built event
    pub async fn publish(&self, event: AlertEvent) -> DispatchOutcome {
        let id = event.id;
        let kind = event.kind;
        let subscription_id = event.subscription_id.clone();
        let symbol = event.symbol.clone();

        let outcome = {
            let guard = self.sender.read().await;
            match guard.as_ref() {
                None => DispatchOutcome::Closed,
                Some(sender) => match sender.try_send(event) {
                    Ok(()) => DispatchOutcome::Published(id),
                    Err(TrySendError::Full(_)) => DispatchOutcome::Dropped,
                    Err(TrySendError::Closed(_)) => DispatchOutcome::Closed,
                },
            }
        };

        self.stats.record(outcome);
        match outcome {
            DispatchOutcome::Published(_) => {
                telemetry::record_alert(AlertOutcome::Published, kind);
                tracing::debug!(alert_id = %id, %subscription_id, %symbol, %kind, "Alert published");
            }
            DispatchOutcome::Dropped => {
                telemetry::record_alert(AlertOutcome::Dropped, kind);
                tracing::warn!(alert_id = %id, %subscription_id, %symbol, %kind, "Alert channel full, dropping alert");
            }
            DispatchOutcome::Closed => {
                tracing::debug!(alert_id = %id, %subscription_id, "Alert channel closed, discarding alert");
            }
        }
        outcome
    }

    /// Close the output channel. Queued events are still delivered, after
    /// which the stream ends.
    pub async fn close(&self) {
        if self.sender.write().await.take().is_some() {
            tracing::info!("Alert dispatcher closed");
        }
    }

    pub async fn is_closed(&self) -> bool {
        match self.sender.read().await.as_ref() {
            Some(sender) => sender.is_closed(),
            None => true,
        }
    }
}
