//! Rule kinds

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The canonical set of detection rule kinds.
///
/// Legacy string names are accepted on input (both through serde aliases and
/// `FromStr`) and always written back in canonical kebab-case form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    /// abs(change_percent) >= threshold
    #[serde(alias = "price_change", alias = "price_volatility")]
    PriceChange,
    /// volume >= threshold (absolute volume)
    #[serde(alias = "volume_spike")]
    VolumeSpike,
    /// price >= threshold
    #[serde(alias = "price_level")]
    PriceLevel,
    /// significant news touching a subscribed symbol
    #[serde(alias = "news_alert", alias = "news_impact")]
    NewsImpact,
    /// lifecycle events raised by the monitor itself
    #[serde(alias = "system_alert")]
    System,
}

impl RuleKind {
    /// All kinds, in declaration order
    pub const ALL: [RuleKind; 5] = [
        RuleKind::PriceChange,
        RuleKind::VolumeSpike,
        RuleKind::PriceLevel,
        RuleKind::NewsImpact,
        RuleKind::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PriceChange => "price-change",
            Self::VolumeSpike => "volume-spike",
            Self::PriceLevel => "price-level",
            Self::NewsImpact => "news-impact",
            Self::System => "system",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown rule kind name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown rule kind: {0}")]
pub struct UnknownRuleKind(pub String);

impl FromStr for RuleKind {
    type Err = UnknownRuleKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "price-change" | "price_change" | "price_volatility" => Ok(Self::PriceChange),
            "volume-spike" | "volume_spike" => Ok(Self::VolumeSpike),
            "price-level" | "price_level" => Ok(Self::PriceLevel),
            "news-impact" | "news_impact" | "news_alert" => Ok(Self::NewsImpact),
            "system" | "system_alert" => Ok(Self::System),
            other => Err(UnknownRuleKind(other.to_string())),
        }
    }
}
