//! HTTP text-generation provider.
//!
//! Implements [`TextGenerator`] against any OpenAI-compatible
//! `/v1/chat/completions` endpoint (Ollama, OpenAI, LiteLLM, vLLM — just
//! set the URL).
//!
//! Configuration via environment variables:
//! - `LLM_URL` (default: `http://localhost:11434/v1/chat/completions`)
//! - `LLM_MODEL` (default: `llama3.1`)
//! - `LLM_API_KEY` (optional, for hosted providers)

use super::traits::{GenerationOptions, TextGenerator};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_URL: &str = "http://localhost:11434/v1/chat/completions";
const DEFAULT_MODEL: &str = "llama3.1";

/// HTTP-based text generator using the OpenAI chat-completions format.
///
/// Thread-safe and cheaply cloneable (shares the reqwest client internally).
#[derive(Clone)]
pub struct HttpTextGenerator {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

impl HttpTextGenerator {
    pub fn new(url: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            model: model.into(),
            api_key,
        }
    }

    /// Build from `LLM_URL` / `LLM_MODEL` / `LLM_API_KEY` env vars.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var("LLM_URL").unwrap_or_else(|_| DEFAULT_URL.to_string()),
            std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            std::env::var("LLM_API_KEY").ok(),
        )
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.to_string(),
            }],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .with_context(|| format!("text generation request to {} failed", self.url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("text generation returned {status}: {body}"));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("failed to parse chat completion response")?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow!("chat completion response contained no choices"))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
