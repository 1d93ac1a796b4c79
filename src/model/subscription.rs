//! Subscriptions and the rules they own

use crate::registry::ValidationError;
use crate::rules::RuleKind;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Paused,
    Cancelled,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }
}

/// A typed threshold condition. Owned by exactly one subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: RuleKind,
    pub threshold: Decimal,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub description: String,
}

fn default_enabled() -> bool {
    true
}

impl AlertRule {
    /// Create an enabled rule with a fresh id
    pub fn new(kind: RuleKind, threshold: Decimal) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            threshold,
            enabled: true,
            description: String::new(),
        }
    }

    /// Builder: set the enabled flag
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Builder: set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A user's standing request to be alerted about a set of symbols
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    /// Ordered symbol set; duplicates are harmless
    pub symbols: Vec<String>,
    #[serde(alias = "alert_rules")]
    pub rules: Vec<AlertRule>,
    #[serde(default)]
    pub status: SubscriptionStatus,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_alert_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl Subscription {
    /// Create an active subscription with a fresh id
    pub fn new(user_id: impl Into<String>, symbols: Vec<String>, rules: Vec<AlertRule>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            name: String::new(),
            symbols,
            rules,
            status: SubscriptionStatus::Active,
            created_at: now,
            updated_at: now,
            expires_at: None,
            last_alert_at: None,
            last_checked_at: None,
        }
    }

    /// Builder: set the id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Builder: set the expiry time
    pub fn expiring_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Builder: set the status
    pub fn with_status(mut self, status: SubscriptionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }

    pub fn contains_symbol(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s == symbol)
    }

    /// Enabled rules in declaration order
    pub fn enabled_rules(&self) -> impl Iterator<Item = &AlertRule> {
        self.rules.iter().filter(|r| r.enabled)
    }

    /// First enabled rule of the given kind
    pub fn enabled_rule(&self, kind: RuleKind) -> Option<&AlertRule> {
        self.enabled_rules().find(|r| r.kind == kind)
    }

    /// Whether `expires_at` is set and not after `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires) if expires <= now)
    }

    /// Boundary validation applied on add and update
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.user_id.trim().is_empty() {
            return Err(ValidationError::EmptyUserId);
        }
        if self.symbols.is_empty() {
            return Err(ValidationError::NoSymbols);
        }
        if self.enabled_rules().next().is_none() {
            return Err(ValidationError::NoEnabledRule);
        }
        Ok(())
    }
}
