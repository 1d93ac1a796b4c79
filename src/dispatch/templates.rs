//! Alert title, message and fallback analysis text

use crate::model::Subscription;
use crate::rules::{RuleKind, Trigger, TriggeredMatch};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const SECONDS_PER_DAY: Decimal = dec!(86400);

/// Display name for the stock a match refers to
fn stock_label(matched: &TriggeredMatch) -> &str {
    match &matched.trigger {
        Trigger::Quote(quote) => quote.display_name(),
        Trigger::News(news) if !news.symbol.is_empty() => &news.symbol,
        _ => "Market",
    }
}

fn subscription_label(subscription: &Subscription) -> &str {
    if subscription.name.is_empty() {
        &subscription.id
    } else {
        &subscription.name
    }
}

fn remaining_days(remaining: chrono::Duration) -> Decimal {
    Decimal::from(remaining.num_seconds().max(0)) / SECONDS_PER_DAY
}

/// Fixed per-kind title
pub fn title(matched: &TriggeredMatch) -> String {
    let name = stock_label(matched);
    match matched.kind {
        RuleKind::PriceChange => format!("{} price anomaly", name),
        RuleKind::VolumeSpike => format!("{} volume spike", name),
        RuleKind::PriceLevel => format!("{} price level breach", name),
        RuleKind::NewsImpact => format!("{} significant news", name),
        RuleKind::System => "Subscription expiring soon".to_string(),
    }
}

/// Human message: two decimals for prices and percentages, integers for volumes
pub fn message(matched: &TriggeredMatch, subscription: &Subscription) -> String {
    match (&matched.trigger, matched.kind) {
        (Trigger::Quote(q), RuleKind::PriceChange) => format!(
            "{} changed {:.2}% today, beyond the {:.2}% threshold. Current price {:.2}.",
            q.symbol, q.change_percent, matched.threshold, q.price
        ),
        (Trigger::Quote(q), RuleKind::VolumeSpike) => format!(
            "{} traded {:.0} shares, above the {:.0} volume threshold.",
            q.symbol, q.volume, matched.threshold
        ),
        (Trigger::Quote(q), _) => format!(
            "{} is trading at {:.2}, at or above the {:.2} price level.",
            q.symbol, q.price, matched.threshold
        ),
        (Trigger::News(n), _) => {
            let scope = if n.is_general() {
                "Market-wide news"
            } else {
                "News"
            };
            format!(
                "{}: {} (impact {:.2}, sentiment {}).",
                scope, n.title, n.impact, n.sentiment
            )
        }
        (Trigger::Expiry { remaining, .. }, _) => format!(
            "Subscription {} expires in {:.1} days. Renew it to keep receiving alerts.",
            subscription_label(subscription),
            remaining_days(*remaining)
        ),
    }
}

/// Deterministic stand-in used when enrichment is unavailable or fails
pub fn fallback_analysis(matched: &TriggeredMatch) -> String {
    let name = stock_label(matched);
    match matched.kind {
        RuleKind::PriceChange => format!(
            "{} moved {:.2}x beyond its price-change threshold; severity {}. Check for company announcements or sector moves.",
            name, matched.intensity, matched.severity
        ),
        RuleKind::VolumeSpike => format!(
            "{} volume is {:.2}x its threshold; severity {}. Unusual volume often precedes or confirms a price move.",
            name, matched.intensity, matched.severity
        ),
        RuleKind::PriceLevel => format!(
            "{} reached {:.2}x its price level; severity {}. Review whether the level still fits your plan.",
            name, matched.intensity, matched.severity
        ),
        RuleKind::NewsImpact => format!(
            "News with impact score {:.2} may affect {}; severity {}. Read the full article before acting.",
            matched.intensity, name, matched.severity
        ),
        RuleKind::System => format!("System notice; severity {}.", matched.severity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AlertRule, NewsItem, Quote, Sentiment, Severity};
    use chrono::Utc;

    fn quote() -> Quote {
        Quote {
            symbol: "000001.SZ".to_string(),
            name: "Ping An Bank".to_string(),
            price: dec!(12.35),
            open: dec!(11.5),
            high: dec!(12.5),
            low: dec!(11.4),
            volume: dec!(2500000),
            change_percent: dec!(6.5),
            timestamp: Utc::now(),
        }
    }

    fn matched(kind: RuleKind, trigger: Trigger, threshold: Decimal) -> TriggeredMatch {
        TriggeredMatch {
            rule_id: Some("r1".to_string()),
            kind,
            trigger,
            threshold,
            intensity: dec!(1.3),
            severity: Severity::Low,
        }
    }

    fn subscription() -> Subscription {
        Subscription::new(
            "user-1",
            vec!["000001.SZ".to_string()],
            vec![AlertRule::new(RuleKind::PriceChange, dec!(5))],
        )
        .with_id("sub-1")
    }

    #[test]
    fn test_price_change_text() {
        let m = matched(RuleKind::PriceChange, Trigger::Quote(quote()), dec!(5));
        assert_eq!(title(&m), "Ping An Bank price anomaly");
        assert_eq!(
            message(&m, &subscription()),
            "000001.SZ changed 6.50% today, beyond the 5.00% threshold. Current price 12.35."
        );
    }

    #[test]
    fn test_volume_formatted_as_integer() {
        let m = matched(RuleKind::VolumeSpike, Trigger::Quote(quote()), dec!(1000000));
        assert_eq!(
            message(&m, &subscription()),
            "000001.SZ traded 2500000 shares, above the 1000000 volume threshold."
        );
    }

    #[test]
    fn test_general_news_text() {
        let news = NewsItem {
            id: "n1".to_string(),
            symbol: String::new(),
            title: "Rate cut announced".to_string(),
            content: String::new(),
            sentiment: Sentiment::Negative,
            impact: dec!(0.8),
            published_at: Utc::now(),
        };
        let m = matched(RuleKind::NewsImpact, Trigger::News(news), dec!(0.5));
        assert_eq!(title(&m), "Market significant news");
        assert_eq!(
            message(&m, &subscription()),
            "Market-wide news: Rate cut announced (impact 0.80, sentiment negative)."
        );
    }

    #[test]
    fn test_expiry_text_uses_subscription_name() {
        let now = Utc::now();
        let m = matched(
            RuleKind::System,
            Trigger::Expiry {
                expires_at: now + chrono::Duration::days(2),
                remaining: chrono::Duration::hours(60),
            },
            dec!(7),
        );
        let mut sub = subscription();
        sub.name = "Banks".to_string();
        assert_eq!(title(&m), "Subscription expiring soon");
        assert_eq!(
            message(&m, &sub),
            "Subscription Banks expires in 2.5 days. Renew it to keep receiving alerts."
        );
    }

    #[test]
    fn test_fallback_is_deterministic() {
        let m = matched(RuleKind::PriceChange, Trigger::Quote(quote()), dec!(5));
        assert_eq!(fallback_analysis(&m), fallback_analysis(&m));
        assert!(fallback_analysis(&m).contains("1.30x"));
    }
}
