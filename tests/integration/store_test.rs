//! Subscription file loading and alert capture

use crate::common::{quote, rule, setup, subscription};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use trade_radar::model::SubscriptionStatus;
use trade_radar::rules::RuleKind;
use trade_radar::store::{
    read_alerts, AlertRecorder, FileSubscriptionStore, ParquetAlertSink, SubscriptionStore,
};

#[tokio::test]
async fn test_load_skips_inactive_and_invalid() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("subscriptions.json");
    let json = r#"[
        {"id": "s1", "user_id": "u1", "symbols": ["000001.SZ"],
         "alert_rules": [{"id": "r1", "type": "price_volatility", "threshold": 5}]},
        {"id": "s2", "user_id": "u1", "symbols": ["600000.SH"], "status": "paused",
         "rules": [{"id": "r2", "type": "price-level", "threshold": 10}]},
        {"id": "s3", "user_id": "u2", "symbols": [],
         "rules": [{"id": "r3", "type": "volume-spike", "threshold": 100}]}
    ]"#;
    std::fs::write(&path, json).unwrap();

    let store = FileSubscriptionStore::new(&path);
    assert_eq!(store.load_active_subscriptions().await.unwrap().len(), 2);

    let s = setup(16);
    let loaded = s.engine.load_subscriptions(&store).await.unwrap();
    assert_eq!(loaded, 1);

    let stored = s.engine.registry().get("s1").await.unwrap();
    assert_eq!(stored.status, SubscriptionStatus::Active);
    assert_eq!(stored.rules[0].kind, RuleKind::PriceChange);
    assert!(s.engine.registry().get("s3").await.is_none());
}

#[tokio::test]
async fn test_sweep_alerts_are_recorded_to_parquet() {
    let dir = TempDir::new().unwrap();
    let mut s = setup(16);
    s.quotes.set(quote("000001.SZ", dec!(6.5))).await;
    s.engine
        .add_subscription(subscription(
            "sub-rec",
            &["000001.SZ"],
            vec![
                rule(RuleKind::PriceChange, dec!(5.0)),
                rule(RuleKind::PriceLevel, dec!(12.00)),
            ],
        ))
        .await
        .unwrap();

    let report = s.engine.sweep().await;
    assert_eq!(report.published, 2);
    s.engine.dispatcher().close().await;

    let sink = Arc::new(ParquetAlertSink::new(dir.path(), 100));
    let recorder = AlertRecorder::new(sink.clone(), Duration::from_secs(60));
    let stats = recorder.run(s.stream).await;

    assert_eq!(stats.alerts_received, 2);
    assert_eq!(stats.alerts_saved, 2);
    assert_eq!(sink.files_written().await, 1);

    let file = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .find(|p| p.extension().is_some_and(|ext| ext == "parquet"))
        .unwrap();
    let mut alerts = read_alerts(&file).unwrap();
    alerts.sort_by_key(|a| a.kind);

    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0].kind, RuleKind::PriceChange);
    assert_eq!(alerts[0].symbol, "000001.SZ");
    assert_eq!(alerts[0].intensity, dec!(1.3));
    assert!(alerts[0].ai_analysis.is_some());
    assert_eq!(alerts[1].kind, RuleKind::PriceLevel);
    assert_eq!(alerts[1].threshold, dec!(12.00));
}
