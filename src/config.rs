//! Configuration types for trade-radar

use crate::analysis::LlmConfig;
use crate::engine::EngineConfig;
use crate::ingest::{QuoteClientConfig, WsNewsConfig};
use crate::telemetry::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure. Every section may be omitted.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Monitoring loop configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineSettings {
    /// Seconds between sweeps
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Capacity of the bounded alert channel
    #[serde(default = "default_alert_buffer")]
    pub alert_buffer: usize,

    /// Maximum concurrently running news handlers
    #[serde(default = "default_max_news_handlers")]
    pub max_news_handlers: usize,

    /// Subscriptions checked concurrently per sweep
    #[serde(default = "default_sweep_concurrency")]
    pub sweep_concurrency: usize,

    /// Expiry warning window in days
    #[serde(default = "default_expiry_warning_days")]
    pub expiry_warning_days: i64,

    /// Staleness warning threshold in seconds
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: i64,
}

fn default_sweep_interval_secs() -> u64 {
    5
}
fn default_alert_buffer() -> usize {
    100
}
fn default_max_news_handlers() -> usize {
    16
}
fn default_sweep_concurrency() -> usize {
    8
}
fn default_expiry_warning_days() -> i64 {
    7
}
fn default_stale_after_secs() -> i64 {
    600
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval_secs(),
            alert_buffer: default_alert_buffer(),
            max_news_handlers: default_max_news_handlers(),
            sweep_concurrency: default_sweep_concurrency(),
            expiry_warning_days: default_expiry_warning_days(),
            stale_after_secs: default_stale_after_secs(),
        }
    }
}

impl EngineSettings {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
            max_news_handlers: self.max_news_handlers,
            sweep_concurrency: self.sweep_concurrency,
            expiry_warning: chrono::Duration::days(self.expiry_warning_days),
            stale_after: chrono::Duration::seconds(self.stale_after_secs),
        }
    }
}

/// Quote and news ingestion configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Base URL of the quote service
    pub quote_api_url: String,
    pub request_timeout_secs: u64,
    /// WebSocket news endpoint; empty disables the push feed
    pub news_ws_url: String,
    /// How long cached news counts as latest
    pub news_retention_secs: u64,
    /// Consecutive reconnect attempts before the feed gives up (0 = never)
    pub news_max_reconnects: u32,
    pub news_reconnect_delay_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            quote_api_url: "http://localhost:5001".to_string(),
            request_timeout_secs: 10,
            news_ws_url: String::new(),
            news_retention_secs: 3600,
            news_max_reconnects: 0,
            news_reconnect_delay_ms: 1000,
        }
    }
}

impl IngestConfig {
    pub fn quote_client_config(&self) -> QuoteClientConfig {
        QuoteClientConfig {
            base_url: self.quote_api_url.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn news_retention(&self) -> Duration {
        Duration::from_secs(self.news_retention_secs)
    }

    pub fn news_feed_enabled(&self) -> bool {
        !self.news_ws_url.trim().is_empty()
    }

    pub fn ws_news_config(&self) -> WsNewsConfig {
        WsNewsConfig::new(self.news_ws_url.trim())
            .max_reconnects(self.news_max_reconnects)
            .initial_delay(Duration::from_millis(self.news_reconnect_delay_ms))
    }
}

/// LLM enrichment configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub enabled: bool,
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    /// Bound on one enrichment call
    pub timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let llm = LlmConfig::default();
        Self {
            enabled: false,
            api_url: llm.api_url,
            api_key: String::new(),
            model: llm.model,
            timeout_secs: 3,
        }
    }
}

impl AnalysisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn llm_config(&self) -> LlmConfig {
        LlmConfig {
            api_url: self.api_url.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            ..Default::default()
        }
    }
}

/// Persistence configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default = "default_subscriptions_path")]
    pub subscriptions_path: PathBuf,

    #[serde(default = "default_alert_dir")]
    pub alert_dir: PathBuf,

    /// Alerts buffered before a Parquet file is written
    #[serde(default = "default_flush_batch")]
    pub flush_batch: usize,

    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
}

fn default_subscriptions_path() -> PathBuf {
    PathBuf::from("subscriptions.json")
}
fn default_alert_dir() -> PathBuf {
    PathBuf::from("./alerts")
}
fn default_flush_batch() -> usize {
    100
}
fn default_flush_interval_secs() -> u64 {
    30
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            subscriptions_path: default_subscriptions_path(),
            alert_dir: default_alert_dir(),
            flush_batch: default_flush_batch(),
            flush_interval_secs: default_flush_interval_secs(),
        }
    }
}

impl StoreConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs.max(1))
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Prometheus scrape port; 0 disables the endpoint
    pub metrics_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_port: 9090,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse TOML, clamping capacities that must be at least one
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        config.normalize();
        Ok(config)
    }

    fn normalize(&mut self) {
        let engine = &mut self.engine;
        engine.alert_buffer = engine.alert_buffer.max(1);
        engine.max_news_handlers = engine.max_news_handlers.max(1);
        engine.sweep_concurrency = engine.sweep_concurrency.max(1);
        engine.sweep_interval_secs = engine.sweep_interval_secs.max(1);
        self.store.flush_batch = self.store.flush_batch.max(1);
    }

    /// Render as TOML
    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialize() {
        let toml = r#"
            [engine]
            sweep_interval_secs = 10
            alert_buffer = 50
            max_news_handlers = 4
            sweep_concurrency = 2
            expiry_warning_days = 3
            stale_after_secs = 120

            [ingest]
            quote_api_url = "http://quotes:5001"
            request_timeout_secs = 5
            news_ws_url = "ws://news:8080/ws"
            news_retention_secs = 600

            [analysis]
            enabled = true
            api_key = "sk-test"
            model = "gpt-4o"
            timeout_secs = 2

            [store]
            subscriptions_path = "/data/subs.json"
            alert_dir = "/data/alerts"
            flush_batch = 10
            flush_interval_secs = 5

            [telemetry]
            metrics_port = 0
            log_level = "debug"
            log_format = "json"
        "#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.engine.sweep_interval_secs, 10);
        assert_eq!(config.engine.alert_buffer, 50);
        assert_eq!(config.ingest.quote_api_url, "http://quotes:5001");
        assert!(config.ingest.news_feed_enabled());
        assert!(config.analysis.enabled);
        assert_eq!(config.analysis.model, "gpt-4o");
        assert_eq!(config.store.alert_dir, PathBuf::from("/data/alerts"));
        assert_eq!(config.telemetry.metrics_port, 0);
        assert_eq!(config.telemetry.log_format, LogFormat::Json);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.engine.sweep_interval_secs, 5);
        assert_eq!(config.engine.alert_buffer, 100);
        assert_eq!(config.engine.expiry_warning_days, 7);
        assert_eq!(config.engine.stale_after_secs, 600);
        assert_eq!(config.ingest.quote_api_url, "http://localhost:5001");
        assert!(!config.ingest.news_feed_enabled());
        assert!(!config.analysis.enabled);
        assert_eq!(config.analysis.timeout_secs, 3);
        assert_eq!(config.store.flush_batch, 100);
        assert_eq!(config.telemetry.metrics_port, 9090);
        assert_eq!(config.telemetry.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_partial_section() {
        let config = Config::parse("[engine]\nsweep_interval_secs = 30\n").unwrap();
        assert_eq!(config.engine.sweep_interval_secs, 30);
        assert_eq!(config.engine.max_news_handlers, 16);
    }

    #[test]
    fn test_zero_capacities_are_clamped() {
        let toml = r#"
            [engine]
            alert_buffer = 0
            max_news_handlers = 0
            sweep_concurrency = 0

            [store]
            flush_batch = 0
        "#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.engine.alert_buffer, 1);
        assert_eq!(config.engine.max_news_handlers, 1);
        assert_eq!(config.engine.sweep_concurrency, 1);
        assert_eq!(config.store.flush_batch, 1);
    }

    #[test]
    fn test_engine_config_conversion() {
        let engine = EngineSettings::default().engine_config();
        assert_eq!(engine.sweep_interval, Duration::from_secs(5));
        assert_eq!(engine.expiry_warning, chrono::Duration::days(7));
        assert_eq!(engine.stale_after, chrono::Duration::minutes(10));
    }

    #[test]
    fn test_ws_news_config_from_ingest() {
        let config = Config::parse(
            "[ingest]\nnews_ws_url = \" ws://news:8080/ws \"\nnews_max_reconnects = 5\nnews_reconnect_delay_ms = 250\n",
        )
        .unwrap();
        let ws = config.ingest.ws_news_config();
        assert_eq!(ws.url, "ws://news:8080/ws");
        assert_eq!(ws.max_reconnect_attempts, 5);
        assert_eq!(ws.initial_reconnect_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_config_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[telemetry]\nlog_level = \"warn\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.telemetry.log_level, "warn");
    }

    #[test]
    fn test_example_config_parses() {
        let config = Config::parse(include_str!("../config.toml.example")).unwrap();
        assert_eq!(config.engine.sweep_interval_secs, 5);
    }

    #[test]
    fn test_to_toml_round_trips() {
        let config = Config::default();
        let rendered = config.to_toml().unwrap();
        let parsed = Config::parse(&rendered).unwrap();
        assert_eq!(parsed.engine.alert_buffer, config.engine.alert_buffer);
        assert_eq!(parsed.store.alert_dir, config.store.alert_dir);
    }
}
