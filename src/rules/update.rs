//! Typed rule patches

use crate::model::AlertRule;
use crate::registry::ValidationError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A partial update to one rule. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleUpdate {
    #[serde(default)]
    pub threshold: Option<Decimal>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub description: Option<String>,
}

impl RuleUpdate {
    pub fn threshold(threshold: Decimal) -> Self {
        Self {
            threshold: Some(threshold),
            ..Default::default()
        }
    }

    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Default::default()
        }
    }

    /// Reject patches that could never describe a working rule
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.threshold {
            Some(t) if t <= Decimal::ZERO => Err(ValidationError::InvalidThreshold(t)),
            _ => Ok(()),
        }
    }

    /// Apply the patch in place
    pub fn apply_to(&self, rule: &mut AlertRule) {
        if let Some(threshold) = self.threshold {
            rule.threshold = threshold;
        }
        if let Some(enabled) = self.enabled {
            rule.enabled = enabled;
        }
        if let Some(description) = &self.description {
            rule.description = description.clone();
        }
    }
}
