/// Inference Gateway — the single point of entry for all Claude API calls.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// All clone replies MUST go through this module.
///
/// The gateway is a single request/response exchange: no streaming, no retry.
/// A failed call ends the current chat exchange; retry is a new user action.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all clone replies.
/// This is intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 1024;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("model returned empty content")]
    EmptyContent,
}

/// One conversational turn handed to the gateway, together with the clone
/// metadata the persona prompt is built from.
#[derive(Debug)]
pub struct InferenceRequest<'a> {
    pub clone_id: Uuid,
    pub message: &'a str,
    pub clone_name: &'a str,
    pub personality_description: Option<&'a str>,
}

/// The inference seam of the chat exchange pipeline. Carried in `AppState`
/// as `Arc<dyn InferenceGateway>` so tests can substitute an in-memory fake.
#[async_trait]
pub trait InferenceGateway: Send + Sync {
    async fn reply(&self, request: InferenceRequest<'_>) -> Result<String, InferenceError>;
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

impl AnthropicResponse {
    /// Extracts the text content from the first text block.
    fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Claude-backed inference gateway used in production.
#[derive(Clone)]
pub struct ClaudeInference {
    client: Client,
    api_key: String,
}

impl ClaudeInference {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }
}

#[async_trait]
impl InferenceGateway for ClaudeInference {
    async fn reply(&self, request: InferenceRequest<'_>) -> Result<String, InferenceError> {
        let system = prompts::build_persona_system(
            request.clone_name,
            request.personality_description,
        );
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system: &system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: request.message,
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Try to parse a structured error message
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(InferenceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: AnthropicResponse = response.json().await?;

        debug!(
            "Clone {} reply generated: input_tokens={}, output_tokens={}",
            request.clone_id, parsed.usage.input_tokens, parsed.usage.output_tokens
        );

        parsed
            .text()
            .map(str::to_string)
            .ok_or(InferenceError::EmptyContent)
    }
}
