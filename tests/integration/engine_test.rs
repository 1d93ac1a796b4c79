//! End-to-end monitoring scenarios

use crate::common::{quote, rule, setup, subscription};
use chrono::{Duration as ChronoDuration, Utc};
use rust_decimal_macros::dec;
use std::time::Duration;
use tokio::sync::watch;
use trade_radar::model::{NewsItem, Sentiment, Severity, SubscriptionStatus};
use trade_radar::rules::{self, RuleKind};

#[tokio::test]
async fn test_price_change_low_severity() {
    let mut s = setup(16);
    s.quotes.set(quote("000001.SZ", dec!(6.5))).await;
    s.engine
        .add_subscription(subscription(
            "sub-a",
            &["000001.SZ"],
            vec![rule(RuleKind::PriceChange, dec!(5.0))],
        ))
        .await
        .unwrap();

    let report = s.engine.sweep().await;
    assert_eq!(report.published, 1);

    let alert = s.stream.try_recv().unwrap();
    assert_eq!(alert.kind, RuleKind::PriceChange);
    assert_eq!(alert.intensity, dec!(1.3));
    assert_eq!(alert.severity, Severity::Low);
    assert_eq!(alert.subscription_id, "sub-a");
    assert!(s.stream.try_recv().is_none());
}

#[tokio::test]
async fn test_price_change_critical_severity() {
    let sub = subscription(
        "sub-b",
        &["000001.SZ"],
        vec![rule(RuleKind::PriceChange, dec!(2.0))],
    );
    let matches = rules::evaluate_quote(&quote("000001.SZ", dec!(6.5)), &sub);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].intensity, dec!(3.25));
    assert_eq!(matches[0].severity, Severity::Critical);
}

#[tokio::test]
async fn test_general_news_reaches_unrelated_symbol() {
    let mut s = setup(16);
    s.engine
        .add_subscription(subscription(
            "sub-c",
            &["600000.SH"],
            vec![rule(RuleKind::NewsImpact, dec!(0.5))],
        ))
        .await
        .unwrap();

    let news = NewsItem {
        id: "n-1".to_string(),
        symbol: String::new(),
        title: "Central bank cuts reserve ratio".to_string(),
        content: String::new(),
        sentiment: Sentiment::Negative,
        impact: dec!(0.8),
        published_at: Utc::now(),
    };
    assert_eq!(s.engine.handle_news(&news).await, 1);

    let alert = s.stream.try_recv().unwrap();
    assert_eq!(alert.kind, RuleKind::NewsImpact);
    assert_eq!(alert.severity, Severity::High);
    assert_eq!(alert.subscription_id, "sub-c");
}

#[tokio::test]
async fn test_expired_subscription_is_not_alerted_again() {
    let mut s = setup(16);
    s.quotes.set(quote("000001.SZ", dec!(9.0))).await;
    let sub = subscription(
        "sub-d",
        &["000001.SZ"],
        vec![rule(RuleKind::PriceChange, dec!(1.0))],
    )
    .expiring_at(Utc::now() - ChronoDuration::hours(1));
    s.engine.add_subscription(sub).await.unwrap();

    let first = s.engine.sweep().await;
    assert_eq!(first.expired, 1);
    assert_eq!(first.published, 0);

    let stored = s.engine.registry().get("sub-d").await.unwrap();
    assert_eq!(stored.status, SubscriptionStatus::Expired);

    let second = s.engine.sweep().await;
    assert_eq!(second.subscriptions, 0);
    assert!(s.stream.try_recv().is_none());
}

#[tokio::test]
async fn test_full_channel_drops_and_counts() {
    let mut s = setup(1);
    s.quotes.set(quote("000001.SZ", dec!(6.5))).await;
    s.engine
        .add_subscription(subscription(
            "sub-e",
            &["000001.SZ"],
            vec![
                rule(RuleKind::PriceChange, dec!(5.0)),
                rule(RuleKind::VolumeSpike, dec!(1000000)),
            ],
        ))
        .await
        .unwrap();

    let report = s.engine.sweep().await;
    assert_eq!(report.matches, 2);
    assert_eq!(report.published, 1);
    assert_eq!(report.dropped, 1);
    assert_eq!(s.engine.dispatcher().stats().dropped(), 1);

    assert!(s.stream.try_recv().is_some());
    assert!(s.stream.try_recv().is_none());
}

#[tokio::test]
async fn test_run_loop_end_to_end() {
    let mut s = setup(16);
    s.quotes.set(quote("000001.SZ", dec!(6.5))).await;
    s.engine
        .add_subscription(subscription(
            "sub-run",
            &["000001.SZ"],
            vec![
                rule(RuleKind::PriceChange, dec!(5.0)),
                rule(RuleKind::NewsImpact, dec!(0.5)),
            ],
        ))
        .await
        .unwrap();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(s.engine.clone().run(shutdown_rx));

    let first = tokio::time::timeout(Duration::from_secs(2), s.stream.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.kind, RuleKind::PriceChange);

    s.hub
        .publish(NewsItem {
            id: "n-run".to_string(),
            symbol: "000001.SZ".to_string(),
            title: "Ping An Bank under investigation".to_string(),
            content: String::new(),
            sentiment: Sentiment::Negative,
            impact: dec!(0.95),
            published_at: Utc::now(),
        })
        .await;

    let mut saw_news = false;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while let Ok(Some(alert)) = tokio::time::timeout_at(deadline, s.stream.recv()).await {
        if alert.kind == RuleKind::NewsImpact {
            assert_eq!(alert.severity, Severity::Critical);
            saw_news = true;
            break;
        }
    }
    assert!(saw_news);

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap().unwrap();

    // stream ends once the dispatcher is closed
    while s.stream.recv().await.is_some() {}
}
