//! LLM client: the single point of entry for all structured-extraction calls.
//!
//! ARCHITECTURAL RULE: No other module may call a model API directly.
//! Parsers and scorers depend on the `CompletionService` trait so tests can
//! substitute a scripted service.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const OLLAMA_API_URL: &str = "http://localhost:11434";
/// Default model for the Anthropic provider.
pub const ANTHROPIC_MODEL: &str = "claude-sonnet-4-5";
/// Default model for the Ollama provider.
pub const OLLAMA_MODEL: &str = "gemma3:4b";
const MAX_TOKENS: u32 = 4096;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Gave up after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// The structured-extraction service boundary: a prompt goes in, text comes out.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &str, system: &str) -> Result<String, LlmError>;
}

/// Which model API the client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    Anthropic { api_key: String },
    Ollama,
}

/// Transport-level retry policy. Retries 429, 5xx and network errors with
/// exponential backoff: `base_delay`, `2 * base_delay`, `4 * base_delay`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt number `attempt` (0-based). Attempt 0 has no delay.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        self.base_delay
            .saturating_mul(1u32 << (attempt - 1).min(16))
    }
}

/// Settings needed to build an `LlmClient`.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: Provider,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

// ── Anthropic wire types ────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct AnthropicResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl AnthropicResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
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

// ── Ollama wire types ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaMessage,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaError {
    error: String,
}

/// Outcome of one HTTP attempt.
enum Attempt {
    Done(String),
    Retry(LlmError),
}

/// The single LLM client used by all services.
/// Wraps the provider API with an explicit retry policy.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    provider: Provider,
    base_url: String,
    model: String,
    retry: RetryPolicy,
}

impl LlmClient {
    pub fn new(settings: LlmSettings) -> Self {
        let (default_url, default_model) = match settings.provider {
            Provider::Anthropic { .. } => (ANTHROPIC_API_URL, ANTHROPIC_MODEL),
            Provider::Ollama => (OLLAMA_API_URL, OLLAMA_MODEL),
        };
        Self {
            client: Client::builder()
                .timeout(settings.timeout)
                .build()
                .expect("Failed to build HTTP client"),
            base_url: settings
                .base_url
                .unwrap_or_else(|| default_url.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: settings.model.unwrap_or_else(|| default_model.to_string()),
            provider: settings.provider,
            retry: settings.retry,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Calls the model and returns its text. Retries on 429, 5xx and network
    /// errors according to the configured `RetryPolicy`.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        let attempts = self.retry.max_attempts.max(1);
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.retry.delay_for(attempt);
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let outcome = match &self.provider {
                Provider::Anthropic { api_key } => {
                    self.attempt_anthropic(api_key, prompt, system).await?
                }
                Provider::Ollama => self.attempt_ollama(prompt, system).await?,
            };

            match outcome {
                Attempt::Done(text) => return Ok(text),
                Attempt::Retry(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or(LlmError::RetriesExhausted { attempts }))
    }

    async fn attempt_anthropic(
        &self,
        api_key: &str,
        prompt: &str,
        system: &str,
    ) -> Result<Attempt, LlmError> {
        let request_body = AnthropicRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => return Ok(Attempt::Retry(LlmError::Http(e))),
        };

        let status = response.status();

        if status.as_u16() == 429 || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            warn!("LLM API returned {}: {}", status, body);
            return Ok(Attempt::Retry(LlmError::Api {
                status: status.as_u16(),
                message: body,
            }));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let llm_response: AnthropicResponse = response.json().await?;

        debug!(
            "LLM call succeeded: input_tokens={}, output_tokens={}",
            llm_response.usage.input_tokens, llm_response.usage.output_tokens
        );

        let text = llm_response.text().ok_or(LlmError::EmptyContent)?;
        Ok(Attempt::Done(text.to_string()))
    }

    async fn attempt_ollama(&self, prompt: &str, system: &str) -> Result<Attempt, LlmError> {
        let request_body = OllamaRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request_body)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => return Ok(Attempt::Retry(LlmError::Http(e))),
        };

        let status = response.status();

        if status.as_u16() == 429 || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            warn!("Ollama returned {}: {}", status, body);
            return Ok(Attempt::Retry(LlmError::Api {
                status: status.as_u16(),
                message: body,
            }));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OllamaError>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let ollama_response: OllamaResponse = response.json().await?;

        debug!(
            "Ollama call succeeded: prompt_tokens={:?}, output_tokens={:?}",
            ollama_response.prompt_eval_count, ollama_response.eval_count
        );

        if ollama_response.message.content.trim().is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(Attempt::Done(ollama_response.message.content))
    }
}

#[async_trait]
impl CompletionService for LlmClient {
    async fn complete(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        self.call(prompt, system).await
    }
}
