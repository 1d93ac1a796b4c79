//! Prometheus metrics

use crate::rules::RuleKind;
use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Analysis failed or timed out, templated text used instead
    EnrichmentFallbacks,
    /// Quote fetches that failed during a sweep
    QuoteFetchFailures,
    /// News items accepted by the engine
    NewsReceived,
    /// Subscriptions transitioned to expired
    SubscriptionsExpired,
    /// Alerts written by the recorder
    AlertsStored,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Active subscriptions seen by the last sweep
    ActiveSubscriptions,
}

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// Full sweep over all active subscriptions
    Sweep,
    /// One enrichment call
    Analysis,
}

/// What happened to an alert at the output channel
#[derive(Debug, Clone, Copy)]
pub enum AlertOutcome {
    Published,
    Dropped,
}

/// Increment a counter by one
pub fn increment(metric: CounterMetric) {
    let metric_name = match metric {
        CounterMetric::EnrichmentFallbacks => "traderadar_enrichment_fallbacks_total",
        CounterMetric::QuoteFetchFailures => "traderadar_quote_fetch_failures_total",
        CounterMetric::NewsReceived => "traderadar_news_received_total",
        CounterMetric::SubscriptionsExpired => "traderadar_subscriptions_expired_total",
        CounterMetric::AlertsStored => "traderadar_alerts_stored_total",
    };
    ::metrics::counter!(metric_name).increment(1);
}

/// Count a published or dropped alert, labelled by rule kind
pub fn record_alert(outcome: AlertOutcome, kind: RuleKind) {
    let metric_name = match outcome {
        AlertOutcome::Published => "traderadar_alerts_published_total",
        AlertOutcome::Dropped => "traderadar_alerts_dropped_total",
    };
    ::metrics::counter!(metric_name, "kind" => kind.as_str()).increment(1);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let metric_name = match metric {
        GaugeMetric::ActiveSubscriptions => "traderadar_active_subscriptions",
    };
    ::metrics::gauge!(metric_name).set(value);
}

/// Record a latency measurement in seconds
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let metric_name = match metric {
        LatencyMetric::Sweep => "traderadar_sweep_duration_seconds",
        LatencyMetric::Analysis => "traderadar_analysis_duration_seconds",
    };
    ::metrics::histogram!(metric_name).record(duration.as_secs_f64());
}

/// Install the Prometheus recorder with an HTTP scrape endpoint
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics exporter: {}", e))?;

    tracing::info!(%addr, "Prometheus metrics endpoint listening");
    Ok(())
}
