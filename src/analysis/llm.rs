//! OpenAI-compatible chat-completions analyzer

use super::{AnalysisContext, AnalysisError, Analyzer};
use crate::rules::RuleKind;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default chat-completions endpoint
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

const SYSTEM_PROMPT: &str =
    "You are a professional equity analyst. Explain stock alerts briefly, in at most three sentences.";

/// Configuration for the LLM client
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    /// Transport timeout; the dispatcher applies its own tighter bound
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Analyzer backed by a chat-completions API
pub struct LlmClient {
    config: LlmConfig,
    client: Client,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, AnalysisError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    /// Send one system+user exchange and return the first choice's content
    pub async fn chat(&self, user_prompt: String) -> Result<String, AnalysisError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt,
                },
            ],
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Status { status, body });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(AnalysisError::Empty)
    }
}

/// Per-kind user prompt
pub(crate) fn build_prompt(context: &AnalysisContext) -> String {
    let name = context.display_name();
    match context.kind {
        RuleKind::PriceChange | RuleKind::PriceLevel | RuleKind::VolumeSpike => format!(
            "Stock {} ({}) triggered a {} alert: {} Briefly analyse the likely causes.",
            context.symbol, name, context.kind, context.message
        ),
        RuleKind::NewsImpact => format!(
            "The following news may affect {} ({}): \"{}\". {} Briefly assess the likely market impact.",
            context.symbol,
            name,
            context.headline.as_deref().unwrap_or_default(),
            context.message
        ),
        RuleKind::System => format!("Summarise this notice for the user: {}", context.message),
    }
}

#[async_trait]
impl Analyzer for LlmClient {
    async fn analyze(&self, context: &AnalysisContext) -> Result<String, AnalysisError> {
        tracing::debug!(symbol = %context.symbol, kind = %context.kind, "Requesting alert analysis");
        self.chat(build_prompt(context)).await
    }
}
