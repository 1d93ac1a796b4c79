//! Telemetry module
//!
//! Structured logging and Prometheus metrics

mod logging;
mod metrics;

pub use self::metrics::{
    increment, init_metrics, record_alert, record_latency, set_gauge, AlertOutcome,
    CounterMetric, GaugeMetric, LatencyMetric,
};
pub use logging::{init_logging, LogFormat};

use crate::config::TelemetryConfig;

/// Guard held for the lifetime of the process
pub struct TelemetryGuard {
    _priv: (),
}

/// Initialize all telemetry subsystems
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<TelemetryGuard> {
    init_logging(&config.log_level, config.log_format)?;

    if config.metrics_port == 0 {
        tracing::info!("Metrics endpoint disabled");
    } else {
        init_metrics(config.metrics_port)?;
    }

    Ok(TelemetryGuard { _priv: () })
}
