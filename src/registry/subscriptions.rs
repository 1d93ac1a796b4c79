//! Subscription registry

use super::{RegistryError, RegistryStats, ValidationError};
use crate::model::{AlertRule, Subscription, SubscriptionStatus};
use crate::rules::RuleUpdate;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

#[derive(Default)]
struct RegistryState {
    /// Canonical subscriptions by id
    subscriptions: HashMap<String, Subscription>,
    /// symbol -> ids of subscriptions holding that symbol
    by_symbol: HashMap<String, HashSet<String>>,
}

impl RegistryState {
    fn index(&mut self, subscription: &Subscription) {
        for symbol in &subscription.symbols {
            self.by_symbol
                .entry(symbol.clone())
                .or_default()
                .insert(subscription.id.clone());
        }
    }

    fn unindex(&mut self, subscription: &Subscription) {
        for symbol in &subscription.symbols {
            if let Some(ids) = self.by_symbol.get_mut(symbol) {
                ids.remove(&subscription.id);
                if ids.is_empty() {
                    self.by_symbol.remove(symbol);
                }
            }
        }
    }

    /// Live (not cancelled) subscription, mutable
    fn live_mut(&mut self, id: &str) -> Result<&mut Subscription, RegistryError> {
        self.subscriptions
            .get_mut(id)
            .filter(|s| s.status != SubscriptionStatus::Cancelled)
            .ok_or_else(|| RegistryError::SubscriptionNotFound(id.to_string()))
    }
}

/// Owns every subscription the engine knows about, indexed by symbol.
///
/// All mutation goes through a single lock. Readers receive owned copies, so a
/// sweep iterating a snapshot never observes concurrent changes.
#[derive(Default)]
pub struct SubscriptionRegistry {
    state: RwLock<RegistryState>,
}

impl SubscriptionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store a subscription. Re-adding an existing id overwrites it.
    pub async fn add(&self, subscription: Subscription) -> Result<(), RegistryError> {
        if subscription.id.trim().is_empty() {
            return Err(ValidationError::EmptyId.into());
        }
        subscription.validate()?;

        let mut state = self.state.write().await;
        if let Some(previous) = state.subscriptions.remove(&subscription.id) {
            state.unindex(&previous);
        }
        if subscription.status != SubscriptionStatus::Cancelled {
            state.index(&subscription);
        }
        state
            .subscriptions
            .insert(subscription.id.clone(), subscription);
        Ok(())
    }

    /// Replace an existing subscription under the same id, keeping its
    /// creation time. Returns the stored value.
    pub async fn update(&self, subscription: Subscription) -> Result<Subscription, RegistryError> {
        subscription.validate()?;

        let mut state = self.state.write().await;
        let previous = state.live_mut(&subscription.id)?.clone();
        state.unindex(&previous);

        let mut updated = subscription;
        updated.created_at = previous.created_at;
        updated.updated_at = Utc::now();
        if updated.status != SubscriptionStatus::Cancelled {
            state.index(&updated);
        }
        state
            .subscriptions
            .insert(updated.id.clone(), updated.clone());
        Ok(updated)
    }

    /// Logically delete a subscription: mark it cancelled and drop it from the
    /// symbol index. It stays readable through `get` until evicted.
    pub async fn remove(&self, id: &str) -> Result<(), RegistryError> {
        let mut state = self.state.write().await;
        let subscription = state.live_mut(id)?;
        subscription.status = SubscriptionStatus::Cancelled;
        subscription.updated_at = Utc::now();
        let removed = subscription.clone();
        state.unindex(&removed);
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Option<Subscription> {
        self.state.read().await.subscriptions.get(id).cloned()
    }

    /// Snapshot of all active subscriptions
    pub async fn all_active(&self) -> Vec<Subscription> {
        self.state
            .read()
            .await
            .subscriptions
            .values()
            .filter(|s| s.is_active())
            .cloned()
            .collect()
    }

    /// Every indexed subscription holding `symbol`, whatever its status
    pub async fn by_symbol(&self, symbol: &str) -> Vec<Subscription> {
        let state = self.state.read().await;
        state
            .by_symbol
            .get(symbol)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.subscriptions.get(id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Transition a subscription to a new status
    pub async fn set_status(&self, id: &str, status: SubscriptionStatus) -> Result<(), RegistryError> {
        if status == SubscriptionStatus::Cancelled {
            return self.remove(id).await;
        }
        let mut state = self.state.write().await;
        let subscription = state.live_mut(id)?;
        subscription.status = status;
        subscription.updated_at = Utc::now();
        Ok(())
    }

    /// Record a completed check, returning the previous check time
    pub async fn mark_checked(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, RegistryError> {
        let mut state = self.state.write().await;
        let subscription = state.live_mut(id)?;
        Ok(subscription.last_checked_at.replace(at))
    }

    /// Record that an alert was published for this subscription
    pub async fn mark_alerted(&self, id: &str, at: DateTime<Utc>) -> Result<(), RegistryError> {
        let mut state = self.state.write().await;
        let subscription = state.live_mut(id)?;
        subscription.last_alert_at = Some(at);
        Ok(())
    }

    /// Apply a typed patch to one rule. The subscription must still have an
    /// enabled rule afterwards.
    pub async fn update_rule(
        &self,
        subscription_id: &str,
        rule_id: &str,
        update: RuleUpdate,
    ) -> Result<AlertRule, RegistryError> {
        update.validate()?;

        let mut state = self.state.write().await;
        let subscription = state.live_mut(subscription_id)?;

        let mut patched = subscription.clone();
        let rule = patched
            .rules
            .iter_mut()
            .find(|r| r.id == rule_id)
            .ok_or_else(|| RegistryError::RuleNotFound {
                subscription_id: subscription_id.to_string(),
                rule_id: rule_id.to_string(),
            })?;
        update.apply_to(rule);
        let rule = rule.clone();
        patched.validate()?;

        patched.updated_at = Utc::now();
        *subscription = patched;
        Ok(rule)
    }

    /// Physically drop cancelled subscriptions, returning how many went
    pub async fn evict_cancelled(&self) -> usize {
        let mut state = self.state.write().await;
        let before = state.subscriptions.len();
        state
            .subscriptions
            .retain(|_, s| s.status != SubscriptionStatus::Cancelled);
        before - state.subscriptions.len()
    }

    /// Number of stored subscriptions, including cancelled ones not yet evicted
    pub async fn len(&self) -> usize {
        self.state.read().await.subscriptions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn stats(&self) -> RegistryStats {
        let state = self.state.read().await;
        let mut stats = RegistryStats {
            total: state.subscriptions.len(),
            indexed_symbols: state.by_symbol.len(),
            ..Default::default()
        };

        for subscription in state.subscriptions.values() {
            match subscription.status {
                SubscriptionStatus::Active => stats.active += 1,
                SubscriptionStatus::Paused => stats.paused += 1,
                SubscriptionStatus::Cancelled => stats.cancelled += 1,
                SubscriptionStatus::Expired => stats.expired += 1,
            }
            stats.total_rules += subscription.rules.len();
            for rule in subscription.enabled_rules() {
                stats.enabled_rules += 1;
                *stats.rules_by_kind.entry(rule.kind).or_default() += 1;
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleKind;
    use rust_decimal_macros::dec;

    fn subscription(id: &str, symbols: &[&str]) -> Subscription {
        Subscription::new(
            "user-1",
            symbols.iter().map(|s| s.to_string()).collect(),
            vec![AlertRule::new(RuleKind::PriceChange, dec!(5))],
        )
        .with_id(id)
    }

    #[tokio::test]
    async fn test_add_and_get() {
        let registry = SubscriptionRegistry::new();
        registry.add(subscription("sub-1", &["000001.SZ"])).await.unwrap();

        let stored = registry.get("sub-1").await.unwrap();
        assert_eq!(stored.user_id, "user-1");
        assert!(registry.get("missing").await.is_none());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_add_rejects_invalid() {
        let registry = SubscriptionRegistry::new();

        let mut no_user = subscription("sub-1", &["000001.SZ"]);
        no_user.user_id.clear();
        assert_eq!(
            registry.add(no_user).await,
            Err(RegistryError::Validation(ValidationError::EmptyUserId))
        );

        let no_symbols = subscription("sub-2", &[]);
        assert_eq!(
            registry.add(no_symbols).await,
            Err(RegistryError::Validation(ValidationError::NoSymbols))
        );

        let mut no_rules = subscription("sub-3", &["000001.SZ"]);
        no_rules.rules[0].enabled = false;
        assert_eq!(
            registry.add(no_rules).await,
            Err(RegistryError::Validation(ValidationError::NoEnabledRule))
        );

        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_by_symbol_index() {
        let registry = SubscriptionRegistry::new();
        registry
            .add(subscription("sub-1", &["000001.SZ", "600000.SH"]))
            .await
            .unwrap();
        registry.add(subscription("sub-2", &["600000.SH"])).await.unwrap();

        assert_eq!(registry.by_symbol("000001.SZ").await.len(), 1);
        assert_eq!(registry.by_symbol("600000.SH").await.len(), 2);
        assert!(registry.by_symbol("300750.SZ").await.is_empty());
    }

    #[tokio::test]
    async fn test_readd_overwrites_and_reindexes() {
        let registry = SubscriptionRegistry::new();
        registry.add(subscription("sub-1", &["000001.SZ"])).await.unwrap();
        registry.add(subscription("sub-1", &["600000.SH"])).await.unwrap();

        assert_eq!(registry.len().await, 1);
        assert!(registry.by_symbol("000001.SZ").await.is_empty());
        assert_eq!(registry.by_symbol("600000.SH").await.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_marks_cancelled_and_unindexes() {
        let registry = SubscriptionRegistry::new();
        registry
            .add(subscription("sub-1", &["000001.SZ", "600000.SH"]))
            .await
            .unwrap();

        registry.remove("sub-1").await.unwrap();

        assert!(registry.by_symbol("000001.SZ").await.is_empty());
        assert!(registry.by_symbol("600000.SH").await.is_empty());
        assert!(registry.all_active().await.is_empty());
        assert_eq!(
            registry.get("sub-1").await.unwrap().status,
            SubscriptionStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_remove_unknown_is_not_found() {
        let registry = SubscriptionRegistry::new();
        assert_eq!(
            registry.remove("ghost").await,
            Err(RegistryError::SubscriptionNotFound("ghost".to_string()))
        );

        registry.add(subscription("sub-1", &["000001.SZ"])).await.unwrap();
        registry.remove("sub-1").await.unwrap();
        assert!(registry.remove("sub-1").await.is_err());
    }

    #[tokio::test]
    async fn test_update_preserves_created_at() {
        let registry = SubscriptionRegistry::new();
        let original = subscription("sub-1", &["000001.SZ"]);
        let created_at = original.created_at;
        registry.add(original).await.unwrap();

        let mut replacement = subscription("sub-1", &["600000.SH"]);
        replacement.created_at = created_at + chrono::Duration::days(1);
        let stored = registry.update(replacement).await.unwrap();

        assert_eq!(stored.created_at, created_at);
        assert_eq!(stored.symbols, vec!["600000.SH".to_string()]);
        assert!(registry.by_symbol("000001.SZ").await.is_empty());
        assert_eq!(registry.by_symbol("600000.SH").await.len(), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_is_not_found() {
        let registry = SubscriptionRegistry::new();
        let result = registry.update(subscription("sub-9", &["000001.SZ"])).await;
        assert_eq!(
            result,
            Err(RegistryError::SubscriptionNotFound("sub-9".to_string()))
        );
    }

    #[tokio::test]
    async fn test_all_active_filters_status() {
        let registry = SubscriptionRegistry::new();
        registry.add(subscription("sub-1", &["000001.SZ"])).await.unwrap();
        registry
            .add(subscription("sub-2", &["000001.SZ"]).with_status(SubscriptionStatus::Paused))
            .await
            .unwrap();

        let active = registry.all_active().await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "sub-1");

        // by_symbol returns inactive subscriptions too
        assert_eq!(registry.by_symbol("000001.SZ").await.len(), 2);
    }

    #[tokio::test]
    async fn test_set_status_expired() {
        let registry = SubscriptionRegistry::new();
        registry.add(subscription("sub-1", &["000001.SZ"])).await.unwrap();
        registry
            .set_status("sub-1", SubscriptionStatus::Expired)
            .await
            .unwrap();

        assert!(registry.all_active().await.is_empty());
        assert_eq!(
            registry.get("sub-1").await.unwrap().status,
            SubscriptionStatus::Expired
        );
    }

    #[tokio::test]
    async fn test_mark_checked_returns_previous() {
        let registry = SubscriptionRegistry::new();
        registry.add(subscription("sub-1", &["000001.SZ"])).await.unwrap();

        let first = Utc::now();
        assert_eq!(registry.mark_checked("sub-1", first).await.unwrap(), None);

        let second = first + chrono::Duration::seconds(5);
        assert_eq!(
            registry.mark_checked("sub-1", second).await.unwrap(),
            Some(first)
        );
        assert_eq!(
            registry.get("sub-1").await.unwrap().last_checked_at,
            Some(second)
        );
    }

    #[tokio::test]
    async fn test_update_rule_patch() {
        let registry = SubscriptionRegistry::new();
        let sub = subscription("sub-1", &["000001.SZ"]);
        let rule_id = sub.rules[0].id.clone();
        registry.add(sub).await.unwrap();

        let rule = registry
            .update_rule("sub-1", &rule_id, RuleUpdate::threshold(dec!(3)))
            .await
            .unwrap();
        assert_eq!(rule.threshold, dec!(3));
        assert_eq!(
            registry.get("sub-1").await.unwrap().rules[0].threshold,
            dec!(3)
        );
    }

    #[tokio::test]
    async fn test_update_rule_cannot_disable_last_rule() {
        let registry = SubscriptionRegistry::new();
        let sub = subscription("sub-1", &["000001.SZ"]);
        let rule_id = sub.rules[0].id.clone();
        registry.add(sub).await.unwrap();

        let result = registry
            .update_rule("sub-1", &rule_id, RuleUpdate::enabled(false))
            .await;
        assert_eq!(
            result,
            Err(RegistryError::Validation(ValidationError::NoEnabledRule))
        );
        assert!(registry.get("sub-1").await.unwrap().rules[0].enabled);
    }

    #[tokio::test]
    async fn test_update_rule_unknown_rule() {
        let registry = SubscriptionRegistry::new();
        registry.add(subscription("sub-1", &["000001.SZ"])).await.unwrap();

        let result = registry
            .update_rule("sub-1", "nope", RuleUpdate::threshold(dec!(1)))
            .await;
        assert!(matches!(result, Err(RegistryError::RuleNotFound { .. })));
    }

    #[tokio::test]
    async fn test_evict_cancelled() {
        let registry = SubscriptionRegistry::new();
        registry.add(subscription("sub-1", &["000001.SZ"])).await.unwrap();
        registry.add(subscription("sub-2", &["000001.SZ"])).await.unwrap();
        registry.remove("sub-1").await.unwrap();

        assert_eq!(registry.evict_cancelled().await, 1);
        assert!(registry.get("sub-1").await.is_none());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_stats() {
        let registry = SubscriptionRegistry::new();
        let mut sub = subscription("sub-1", &["000001.SZ", "600000.SH"]);
        sub.rules
            .push(AlertRule::new(RuleKind::NewsImpact, dec!(0.5)).enabled(false));
        registry.add(sub).await.unwrap();
        registry
            .add(subscription("sub-2", &["000001.SZ"]).with_status(SubscriptionStatus::Paused))
            .await
            .unwrap();

        let stats = registry.stats().await;
        assert_eq!(stats.total, 2);
        assert_eq!(stats.active, 1);
        assert_eq!(stats.paused, 1);
        assert_eq!(stats.total_rules, 3);
        assert_eq!(stats.enabled_rules, 2);
        assert_eq!(stats.rules_by_kind.get(&RuleKind::PriceChange), Some(&2));
        assert_eq!(stats.indexed_symbols, 2);
    }
}
