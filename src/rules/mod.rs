//! Rule catalog and evaluator
//!
//! Typed rule kinds, typed rule patches, and the pure evaluation functions
//! that turn quotes, news and subscription lifecycle into triggered matches.

mod evaluator;
mod kind;
mod types;
mod update;

pub use evaluator::{
    evaluate_expiry, evaluate_news, evaluate_quote, is_significant, severity_for_intensity,
    severity_for_news_impact, SIGNIFICANT_IMPACT,
};
pub use kind::{RuleKind, UnknownRuleKind};
pub use types::{Trigger, TriggeredMatch};
pub use update::RuleUpdate;
