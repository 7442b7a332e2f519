//! Script rephraser backed by an OpenAI-compatible chat completion API
//! (Groq by default).

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{build_client, ensure_success, GatewayError, Service};
use crate::metrics;

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Instruction prepended to every rephrase request.
pub const SCRIPT_INSTRUCTIONS: &str = "Rephrase the following news text into a concise, \
engaging 30-second script (3-4 sentences) as if a news anchor is reporting it on air. \
Output ONLY the text to be spoken: no placeholders for music or narrators, no stage \
directions, and no preamble such as \"Here is your segment\". Talk about the news directly.";

/// Script rephraser configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptConfig {
    /// API key sent as a bearer token.
    #[serde(default)]
    pub api_key: String,
    /// Base URL of the OpenAI-compatible API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// Completion token cap.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_model() -> String {
    "llama3-8b-8192".to_string()
}

fn default_max_tokens() -> u32 {
    100
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl ScriptConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

/// Chat completion client used for script generation.
pub struct ScriptClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl ScriptClient {
    pub fn new(config: &ScriptConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            client: build_client(Service::Script)?,
            base_url: config.base_url().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the single user prompt for a topic.
    pub fn build_prompt(topic: &str, source_text: &str) -> String {
        format!(
            "{} Topic: {}\n\nText: {}",
            SCRIPT_INSTRUCTIONS, topic, source_text
        )
    }

    /// Send one completion request and return the trimmed script.
    pub async fn rephrase(&self, topic: &str, source_text: &str) -> Result<String, GatewayError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Self::build_prompt(topic, source_text),
            }],
            max_tokens: self.max_tokens,
        };

        debug!("Script completion: model={}, topic='{}'", self.model, topic);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::transport(Service::Script, e))?;

        let response = ensure_success(Service::Script, response).await?;

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::parse(Service::Script, e))?;

        if let Some(usage) = &chat.usage {
            metrics::SCRIPT_TOKENS
                .with_label_values(&["input"])
                .inc_by(usage.prompt_tokens);
            metrics::SCRIPT_TOKENS
                .with_label_values(&["output"])
                .inc_by(usage.completion_tokens);
        }

        let text = chat
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(GatewayError::parse(
                Service::Script,
                "completion contained no text",
            ));
        }

        Ok(text)
    }
}
