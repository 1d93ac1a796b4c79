//! Configuration loading

use std::time::Duration;
use trade_radar::config::Config;
use trade_radar::telemetry::LogFormat;

#[test]
fn test_example_config_loads() {
    let config = Config::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml.example")).unwrap();
    assert_eq!(config.engine.engine_config().sweep_interval, Duration::from_secs(5));
    assert!(!config.analysis.enabled);
}

#[test]
fn test_partial_config_uses_defaults() {
    let config = Config::parse(
        r#"
        [engine]
        alert_buffer = 8

        [telemetry]
        log_format = "json"
        "#,
    )
    .unwrap();
    assert_eq!(config.engine.alert_buffer, 8);
    assert_eq!(config.engine.max_news_handlers, 16);
    assert_eq!(config.telemetry.log_format, LogFormat::Json);
    assert_eq!(config.store.flush_batch, Config::default().store.flush_batch);
}

#[test]
fn test_missing_file_is_an_error() {
    assert!(Config::load("/nonexistent/trade-radar.toml").is_err());
}
