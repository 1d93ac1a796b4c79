//! Monitor engine

use super::{EngineConfig, EngineError, SweepReport};
use crate::dispatch::{AlertDispatcher, DispatchOutcome};
use crate::ingest::{NewsSource, QuoteFetcher};
use crate::model::{AlertRule, NewsItem, Subscription, SubscriptionStatus};
use crate::registry::SubscriptionRegistry;
use crate::rules::{self, RuleUpdate, TriggeredMatch};
use crate::store::SubscriptionStore;
use crate::telemetry::{self, CounterMetric, GaugeMetric, LatencyMetric};
use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

/// Top-level coordinator.
///
/// Sweeps every active subscription on a timer and evaluates pushed news as
/// it arrives. Both paths share the registry and the dispatcher.
pub struct MonitorEngine {
    config: EngineConfig,
    registry: Arc<SubscriptionRegistry>,
    quotes: Arc<dyn QuoteFetcher>,
    news: Arc<dyn NewsSource>,
    dispatcher: Arc<AlertDispatcher>,
    news_permits: Arc<Semaphore>,
}

impl MonitorEngine {
    pub fn new(
        config: EngineConfig,
        quotes: Arc<dyn QuoteFetcher>,
        news: Arc<dyn NewsSource>,
        dispatcher: Arc<AlertDispatcher>,
    ) -> Self {
        let news_permits = Arc::new(Semaphore::new(config.max_news_handlers.max(1)));
        Self {
            config,
            registry: Arc::new(SubscriptionRegistry::new()),
            quotes,
            news,
            dispatcher,
            news_permits,
        }
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Arc<AlertDispatcher> {
        &self.dispatcher
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn add_subscription(&self, subscription: Subscription) -> Result<(), EngineError> {
        let id = subscription.id.clone();
        let symbols = subscription.symbols.len();
        self.registry.add(subscription).await?;
        tracing::info!(subscription_id = %id, symbols, "Subscription added");
        Ok(())
    }

    pub async fn update_subscription(
        &self,
        subscription: Subscription,
    ) -> Result<Subscription, EngineError> {
        let updated = self.registry.update(subscription).await?;
        tracing::info!(subscription_id = %updated.id, "Subscription updated");
        Ok(updated)
    }

    pub async fn remove_subscription(&self, id: &str) -> Result<(), EngineError> {
        self.registry.remove(id).await?;
        tracing::info!(subscription_id = %id, "Subscription removed");
        Ok(())
    }

    pub async fn update_rule(
        &self,
        subscription_id: &str,
        rule_id: &str,
        update: RuleUpdate,
    ) -> Result<AlertRule, EngineError> {
        let rule = self
            .registry
            .update_rule(subscription_id, rule_id, update)
            .await?;
        tracing::info!(%subscription_id, %rule_id, "Rule updated");
        Ok(rule)
    }

    /// Seed the registry from a store. Invalid entries are logged and skipped.
    pub async fn load_subscriptions(
        &self,
        store: &dyn SubscriptionStore,
    ) -> Result<usize, EngineError> {
        let mut loaded = 0;
        for subscription in store.load_active_subscriptions().await? {
            let id = subscription.id.clone();
            match self.registry.add(subscription).await {
                Ok(()) => loaded += 1,
                Err(e) => {
                    tracing::warn!(subscription_id = %id, error = %e, "Skipping invalid stored subscription")
                }
            }
        }
        tracing::info!(loaded, "Subscriptions loaded");
        Ok(loaded)
    }

    /// One pass over every active subscription
    pub async fn sweep(&self) -> SweepReport {
        let started = Instant::now();
        let now = Utc::now();

        let evicted = self.registry.evict_cancelled().await;
        let active = self.registry.all_active().await;
        telemetry::set_gauge(GaugeMetric::ActiveSubscriptions, active.len() as f64);

        let reports: Vec<SweepReport> = stream::iter(active)
            .map(|subscription| self.check_subscription(subscription, now))
            .buffer_unordered(self.config.sweep_concurrency.max(1))
            .collect()
            .await;

        let mut report = SweepReport {
            evicted,
            ..Default::default()
        };
        for partial in reports {
            report.merge(partial);
        }

        telemetry::record_latency(LatencyMetric::Sweep, started.elapsed());
        report
    }

    async fn check_subscription(&self, subscription: Subscription, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport {
            subscriptions: 1,
            ..Default::default()
        };

        if !subscription.is_active() {
            return report;
        }

        if subscription.is_expired_at(now) {
            match self
                .registry
                .set_status(&subscription.id, SubscriptionStatus::Expired)
                .await
            {
                Ok(()) => {
                    report.expired = 1;
                    telemetry::increment(CounterMetric::SubscriptionsExpired);
                    tracing::info!(subscription_id = %subscription.id, "Subscription expired");
                }
                Err(e) => {
                    tracing::debug!(subscription_id = %subscription.id, error = %e, "Could not expire subscription");
                }
            }
            return report;
        }

        // Cached news is evaluated once per subscription: only items newer
        // than the previous check.
        let news_since = subscription.last_checked_at;
        let mut matches: Vec<TriggeredMatch> = Vec::new();
        let mut seen = HashSet::new();

        for symbol in &subscription.symbols {
            if !seen.insert(symbol.as_str()) {
                continue;
            }

            let quote = match self.quotes.fetch_quote(symbol).await {
                Ok(quote) => quote,
                Err(e) => {
                    report.fetch_failures += 1;
                    telemetry::increment(CounterMetric::QuoteFetchFailures);
                    tracing::warn!(
                        subscription_id = %subscription.id,
                        %symbol,
                        error = %e,
                        "Quote fetch failed, skipping symbol this cycle"
                    );
                    continue;
                }
            };
            report.quotes_fetched += 1;
            matches.extend(rules::evaluate_quote(&quote, &subscription));

            match self.news.latest_news(symbol).await {
                Ok(items) => {
                    for item in items
                        .iter()
                        .filter(|n| news_since.map_or(true, |since| n.published_at > since))
                    {
                        matches.extend(rules::evaluate_news(item, &subscription));
                    }
                }
                Err(e) => {
                    tracing::warn!(%symbol, error = %e, "Cached news lookup failed");
                }
            }
        }

        if let Some(warning) = rules::evaluate_expiry(&subscription, now, self.config.expiry_warning) {
            matches.push(warning);
        }

        match self.registry.mark_checked(&subscription.id, now).await {
            Ok(Some(previous)) if now - previous > self.config.stale_after => {
                tracing::warn!(
                    subscription_id = %subscription.id,
                    last_checked_at = %previous,
                    "Subscription was not checked for too long"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(subscription_id = %subscription.id, error = %e, "Subscription removed during sweep");
                return report;
            }
        }

        report.merge(self.dispatch_all(&matches, &subscription).await);
        report
    }

    async fn dispatch_all(&self, matches: &[TriggeredMatch], subscription: &Subscription) -> SweepReport {
        let mut report = SweepReport {
            matches: matches.len(),
            ..Default::default()
        };

        for matched in matches {
            let event = self.dispatcher.prepare(matched, subscription).await;

            // Enrichment may take a while; the subscription can be removed or
            // paused meanwhile.
            if !self.is_live(&subscription.id).await {
                report.discarded += 1;
                tracing::debug!(
                    subscription_id = %subscription.id,
                    alert_id = %event.id,
                    "Subscription no longer active, discarding alert"
                );
                continue;
            }

            match self.dispatcher.publish(event).await {
                DispatchOutcome::Published(_) => report.published += 1,
                DispatchOutcome::Dropped => report.dropped += 1,
                DispatchOutcome::Closed => {}
            }
        }

        if report.published > 0 {
            if let Err(e) = self.registry.mark_alerted(&subscription.id, Utc::now()).await {
                tracing::debug!(subscription_id = %subscription.id, error = %e, "Could not record alert time");
            }
        }
        report
    }

    async fn is_live(&self, id: &str) -> bool {
        self.registry
            .get(id)
            .await
            .is_some_and(|s| s.is_active() && !s.is_expired_at(Utc::now()))
    }

    /// Evaluate one pushed news item against every interested active
    /// subscription and dispatch immediately. Returns alerts published.
    pub async fn handle_news(&self, news: &NewsItem) -> usize {
        if !rules::is_significant(news) {
            tracing::trace!(news_id = %news.id, "News not significant");
            return 0;
        }

        let now = Utc::now();
        let candidates = if news.is_general() {
            self.registry.all_active().await
        } else {
            self.registry.by_symbol(&news.symbol).await
        };

        let live: Vec<Subscription> = candidates
            .into_iter()
            .filter(|s| s.is_active() && !s.is_expired_at(now))
            .collect();

        let published: usize = stream::iter(live)
            .map(|subscription| self.notify_news(news, subscription))
            .buffer_unordered(self.config.sweep_concurrency.max(1))
            .collect::<Vec<usize>>()
            .await
            .into_iter()
            .sum();

        tracing::debug!(news_id = %news.id, symbol = %news.symbol, published, "News handled");
        published
    }

    async fn notify_news(&self, news: &NewsItem, subscription: Subscription) -> usize {
        let matches = rules::evaluate_news(news, &subscription);
        if matches.is_empty() {
            return 0;
        }
        self.dispatch_all(&matches, &subscription).await.published
    }

    /// Run sweeps and news handling until `shutdown` turns true.
    ///
    /// Sweeps and news handlers run as separate tasks so pushed news is never
    /// queued behind a slow sweep. At most one sweep is in flight; ticks that
    /// arrive while it runs are skipped. On shutdown the running sweep and
    /// news handlers are awaited, then the dispatcher is closed so the alert
    /// stream ends.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> Result<(), EngineError> {
        let mut news_rx = self.news.subscribe().await?;
        let mut news_open = true;
        let mut handlers: JoinSet<usize> = JoinSet::new();
        let mut sweeps: JoinSet<SweepReport> = JoinSet::new();

        let mut interval = tokio::time::interval(self.config.sweep_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            sweep_interval = ?self.config.sweep_interval,
            max_news_handlers = self.config.max_news_handlers,
            "Monitor engine started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }

                Some(joined) = handlers.join_next(), if !handlers.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "News handler failed");
                    }
                }

                Some(joined) = sweeps.join_next(), if !sweeps.is_empty() => {
                    match joined {
                        Ok(report) => log_sweep(&report),
                        Err(e) => tracing::error!(error = %e, "Sweep task failed"),
                    }
                }

                _ = interval.tick() => {
                    if sweeps.is_empty() {
                        let engine = Arc::clone(&self);
                        sweeps.spawn(async move { engine.sweep().await });
                    } else {
                        tracing::debug!("Previous sweep still running, skipping tick");
                    }
                }

                received = news_rx.recv(), if news_open => {
                    match received {
                        Some(news) => {
                            let engine = Arc::clone(&self);
                            let permits = Arc::clone(&self.news_permits);
                            handlers.spawn(async move {
                                let Ok(_permit) = permits.acquire_owned().await else {
                                    return 0;
                                };
                                engine.handle_news(&news).await
                            });
                        }
                        None => {
                            news_open = false;
                            tracing::warn!("News source closed, continuing with sweeps only");
                        }
                    }
                }
            }
        }

        tracing::info!(
            sweeps = sweeps.len(),
            news_handlers = handlers.len(),
            "Monitor engine stopping"
        );
        while let Some(joined) = sweeps.join_next().await {
            match joined {
                Ok(report) => log_sweep(&report),
                Err(e) => tracing::error!(error = %e, "Sweep task failed"),
            }
        }
        while let Some(joined) = handlers.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "News handler failed");
            }
        }

        self.dispatcher.close().await;
        tracing::info!("Monitor engine stopped");
        Ok(())
    }
}

fn log_sweep(report: &SweepReport) {
    tracing::debug!(
        subscriptions = report.subscriptions,
        matches = report.matches,
        published = report.published,
        dropped = report.dropped,
        discarded = report.discarded,
        expired = report.expired,
        fetch_failures = report.fetch_failures,
        "Sweep complete"
    );
}
