/// LLM Client: the single point of entry for all Claude API calls.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// Classifier, handlers and markup conversion all go through `StructuredLlm`,
/// which is backed by any `CompletionBackend` (the real client in production,
/// a scripted backend in tests).
///
/// Model: claude-sonnet-4-5 (hardcoded; not configurable)
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;
pub mod search;

pub const DEFAULT_API_BASE: &str = "https://api.anthropic.com";
const MESSAGES_PATH: &str = "/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all LLM calls.
/// This is intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 4096;
const MAX_RETRIES: u32 = 3;
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("LLM call timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("LLM output failed schema validation: {0}")]
    Validation(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Backend abstraction
// ────────────────────────────────────────────────────────────────────────────

/// The fixed output schemas a structured completion can be constrained to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSchema {
    Intent,
    JobMatching,
    Enhancement,
    Research,
    Translation,
    MarkupConversion,
}

#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub schema: ResponseSchema,
    pub system: &'a str,
    pub prompt: &'a str,
}

/// A generative backend returning the raw text of one completion.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, LlmError>;
}

/// A typed response that a structured completion deserializes into.
///
/// `validate` runs after deserialization; a rejection surfaces as
/// `LlmError::Validation` so callers treat it like any other bad output.
pub trait StructuredOutput: DeserializeOwned + Send {
    const SCHEMA: ResponseSchema;

    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Backend handle shared by every component that needs a structured completion.
/// Every call is bounded by `timeout`; a timed-out call is dropped (cancelled).
#[derive(Clone)]
pub struct StructuredLlm {
    backend: Arc<dyn CompletionBackend>,
    timeout: Duration,
}

impl StructuredLlm {
    pub fn new(backend: Arc<dyn CompletionBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub async fn complete<T: StructuredOutput>(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<T, LlmError> {
        let request = CompletionRequest {
            schema: T::SCHEMA,
            system,
            prompt,
        };

        let text = tokio::time::timeout(self.timeout, self.backend.complete(request))
            .await
            .map_err(|_| LlmError::Timeout(self.timeout))??;

        let parsed: T = serde_json::from_str(strip_json_fences(&text))?;
        parsed.validate().map_err(LlmError::Validation)?;

        debug!("Structured completion validated for schema {:?}", T::SCHEMA);
        Ok(parsed)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Anthropic Messages API
// ────────────────────────────────────────────────────────────────────────────

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
pub struct LlmResponse {
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

impl LlmResponse {
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

/// Wraps the Anthropic Messages API with retry logic.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl LlmClient {
    pub fn new(api_key: String, api_base: &str) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(HTTP_TIMEOUT).build()?,
            api_key,
            endpoint: format!("{}{}", api_base.trim_end_matches('/'), MESSAGES_PATH),
        })
    }

    /// Makes a raw call to the Claude API, returning the full response object.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<LlmResponse, LlmError> {
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.endpoint)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
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

            let llm_response: LlmResponse = response.json().await?;

            debug!(
                "LLM call succeeded: input_tokens={}, output_tokens={}",
                llm_response.usage.input_tokens, llm_response.usage.output_tokens
            );

            return Ok(llm_response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl CompletionBackend for LlmClient {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, LlmError> {
        debug!("Requesting {:?} completion", request.schema);
        let response = self.call(request.prompt, request.system).await?;
        let text = response.text().ok_or(LlmError::EmptyContent)?;
        if text.trim().is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(text.to_string())
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted backend used by workflow, service and route tests.

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    #[derive(Debug, Clone)]
    pub enum Reply {
        Json(String),
        Delay(Duration, String),
        Fail(String),
        /// One reply per call in order; the last repeats once exhausted.
        Sequence(Vec<String>),
    }

    /// Replays a fixed reply per schema and records every prompt it receives.
    #[derive(Default)]
    pub struct ScriptedBackend {
        replies: HashMap<ResponseSchema, Reply>,
        prompts: Mutex<Vec<(ResponseSchema, String)>>,
    }

    impl ScriptedBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(mut self, schema: ResponseSchema, json: serde_json::Value) -> Self {
            self.replies.insert(schema, Reply::Json(json.to_string()));
            self
        }

        pub fn reply_raw(mut self, schema: ResponseSchema, reply: Reply) -> Self {
            self.replies.insert(schema, reply);
            self
        }

        pub fn prompts_for(&self, schema: ResponseSchema) -> Vec<String> {
            self.prompts
                .lock()
                .unwrap()
                .iter()
                .filter(|(s, _)| *s == schema)
                .map(|(_, p)| p.clone())
                .collect()
        }

        pub fn into_llm(self) -> StructuredLlm {
            StructuredLlm::new(Arc::new(self), Duration::from_secs(5))
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, LlmError> {
            let call = {
                let mut prompts = self.prompts.lock().unwrap();
                let call = prompts.iter().filter(|(s, _)| *s == request.schema).count();
                prompts.push((request.schema, request.prompt.to_string()));
                call
            };
            match self.replies.get(&request.schema) {
                Some(Reply::Json(text)) => Ok(text.clone()),
                Some(Reply::Delay(delay, text)) => {
                    tokio::time::sleep(*delay).await;
                    Ok(text.clone())
                }
                Some(Reply::Fail(message)) => Err(LlmError::Api {
                    status: 500,
                    message: message.clone(),
                }),
                Some(Reply::Sequence(texts)) => texts
                    .get(call.min(texts.len().saturating_sub(1)))
                    .cloned()
                    .ok_or(LlmError::EmptyContent),
                None => Err(LlmError::EmptyContent),
            }
        }
    }
}
