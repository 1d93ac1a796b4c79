//! Optional AI enrichment of alerts
//!
//! The dispatcher calls an [`Analyzer`] with a bounded timeout and falls back
//! to templated text when it fails or is absent.

mod llm;
mod types;

pub use llm::{LlmClient, LlmConfig};
pub use types::{AnalysisContext, AnalysisError, Analyzer};
