//! Enrichment contract

use crate::model::Severity;
use crate::rules::RuleKind;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;

/// What the analyzer gets to see about an alert
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisContext {
    pub symbol: String,
    pub stock_name: String,
    pub kind: RuleKind,
    pub severity: Severity,
    pub intensity: Decimal,
    pub threshold: Decimal,
    /// Human message already rendered for the alert
    pub message: String,
    /// News headline for news-impact alerts
    pub headline: Option<String>,
}

impl AnalysisContext {
    /// Name to show in prompts, falling back to the symbol
    pub fn display_name(&self) -> &str {
        if self.stock_name.is_empty() {
            &self.symbol
        } else {
            &self.stock_name
        }
    }
}

/// Enrichment failures. Never surfaced to alert consumers.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Analysis API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Analysis API returned no content")]
    Empty,
    #[error("Analysis timed out after {0:?}")]
    Timeout(Duration),
}

/// Produces free-text analysis for an alert
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, context: &AnalysisContext) -> Result<String, AnalysisError>;
}
