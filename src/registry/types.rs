//! Registry errors and statistics

use crate::rules::RuleKind;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Malformed subscription input, rejected before it reaches the registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Subscription id must not be empty")]
    EmptyId,
    #[error("User id must not be empty")]
    EmptyUserId,
    #[error("Subscription must contain at least one symbol")]
    NoSymbols,
    #[error("Subscription must contain at least one enabled rule")]
    NoEnabledRule,
    #[error("Rule threshold must be positive, got {0}")]
    InvalidThreshold(Decimal),
}

/// Registry operation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Invalid subscription: {0}")]
    Validation(#[from] ValidationError),
    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(String),
    #[error("Rule {rule_id} not found in subscription {subscription_id}")]
    RuleNotFound {
        subscription_id: String,
        rule_id: String,
    },
}

/// Point-in-time registry statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegistryStats {
    pub total: usize,
    pub active: usize,
    pub paused: usize,
    pub cancelled: usize,
    pub expired: usize,
    pub total_rules: usize,
    pub enabled_rules: usize,
    /// Enabled rules per kind
    pub rules_by_kind: BTreeMap<RuleKind, usize>,
    /// Distinct symbols with at least one indexed subscription
    pub indexed_symbols: usize,
}
