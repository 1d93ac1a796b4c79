//! Rule evaluation
//!
//! Pure functions from (event, subscription) to triggered matches. Nothing
//! here fails or performs I/O: a rule with a non-positive threshold simply
//! never fires, and a subscription that is not active never matches.

use super::{RuleKind, Trigger, TriggeredMatch};
use crate::model::{AlertRule, NewsItem, Quote, Sentiment, Severity, Subscription};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// News with impact strictly above this is significant regardless of sentiment
pub const SIGNIFICANT_IMPACT: Decimal = dec!(0.7);

/// Map an intensity (observed / threshold) to a severity
pub fn severity_for_intensity(intensity: Decimal) -> Severity {
    if intensity >= dec!(3.0) {
        Severity::Critical
    } else if intensity >= dec!(2.0) {
        Severity::High
    } else if intensity >= dec!(1.5) {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Map a news impact score in [0, 1] to a severity
pub fn severity_for_news_impact(impact: Decimal) -> Severity {
    if impact >= dec!(0.9) {
        Severity::Critical
    } else if impact >= dec!(0.7) {
        Severity::High
    } else if impact >= dec!(0.5) {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// High impact or negative sentiment
pub fn is_significant(news: &NewsItem) -> bool {
    news.impact > SIGNIFICANT_IMPACT || news.sentiment == Sentiment::Negative
}

/// Evaluate a quote against every enabled quote-driven rule of a subscription.
///
/// All matching rules are returned; nothing is coalesced.
pub fn evaluate_quote(quote: &Quote, subscription: &Subscription) -> Vec<TriggeredMatch> {
    if !subscription.is_active() {
        return Vec::new();
    }

    subscription
        .enabled_rules()
        .filter_map(|rule| {
            let observed = match rule.kind {
                RuleKind::PriceChange => quote.change_percent.abs(),
                RuleKind::VolumeSpike => quote.volume,
                RuleKind::PriceLevel => quote.price,
                RuleKind::NewsImpact | RuleKind::System => return None,
            };
            let intensity = ratio_if_reached(observed, rule.threshold)?;
            Some(quote_match(rule, quote, intensity))
        })
        .collect()
}

/// Evaluate a news item against a subscription.
///
/// Fires at most once per subscription, when it has an enabled news-impact
/// rule, the news is general or about a subscribed symbol, and the news is
/// significant.
pub fn evaluate_news(news: &NewsItem, subscription: &Subscription) -> Vec<TriggeredMatch> {
    if !subscription.is_active() {
        return Vec::new();
    }

    let Some(rule) = subscription.enabled_rule(RuleKind::NewsImpact) else {
        return Vec::new();
    };

    if !news.is_general() && !subscription.contains_symbol(&news.symbol) {
        return Vec::new();
    }

    if !is_significant(news) {
        return Vec::new();
    }

    let intensity = news.impact.max(Decimal::ZERO);
    vec![TriggeredMatch {
        rule_id: Some(rule.id.clone()),
        kind: RuleKind::NewsImpact,
        trigger: Trigger::News(news.clone()),
        threshold: rule.threshold,
        intensity,
        severity: severity_for_news_impact(intensity),
    }]
}

/// Expiry warning for an active subscription expiring within `window`.
///
/// Intensity is `window / remaining`, so the closer the expiry the higher
/// the severity. Already-expired subscriptions produce nothing.
pub fn evaluate_expiry(
    subscription: &Subscription,
    now: DateTime<Utc>,
    window: Duration,
) -> Option<TriggeredMatch> {
    if !subscription.is_active() {
        return None;
    }

    let expires_at = subscription.expires_at?;
    let remaining = expires_at - now;
    if remaining <= Duration::zero() || remaining > window {
        return None;
    }

    let window_secs = Decimal::from(window.num_seconds());
    let remaining_secs = Decimal::from(remaining.num_seconds().max(1));
    let intensity = window_secs.checked_div(remaining_secs)?.round_dp(4);

    Some(TriggeredMatch {
        rule_id: None,
        kind: RuleKind::System,
        trigger: Trigger::Expiry {
            expires_at,
            remaining,
        },
        threshold: Decimal::from(window.num_days()),
        intensity,
        severity: severity_for_intensity(intensity),
    })
}

/// `observed / threshold` when `observed >= threshold > 0`
fn ratio_if_reached(observed: Decimal, threshold: Decimal) -> Option<Decimal> {
    if threshold <= Decimal::ZERO || observed < threshold {
        return None;
    }
    observed.checked_div(threshold)
}

fn quote_match(rule: &AlertRule, quote: &Quote, intensity: Decimal) -> TriggeredMatch {
    TriggeredMatch {
        rule_id: Some(rule.id.clone()),
        kind: rule.kind,
        trigger: Trigger::Quote(quote.clone()),
        threshold: rule.threshold,
        intensity,
        severity: severity_for_intensity(intensity),
    }
}
