//! HTTP client for external LLM services (OpenAI-compatible)

use crate::config::LlmServiceConfig;
use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

/// Chat message for completion requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Per-call sampling parameters.
///
/// Values outside the provider's accepted ranges are clamped at config load;
/// callers only narrow them further (e.g. the title generator's small budget).
#[derive(Debug, Clone, Copy)]
pub struct CompletionParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionParams {
    pub fn from_config(config: &LlmServiceConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Trait for LLM service clients
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a chat completion and return the full text
    async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        params: CompletionParams,
    ) -> Result<String>;

    /// Generate a streaming chat completion.
    ///
    /// Text deltas are pushed into `chunks` as they arrive; the accumulated
    /// full text is the return value. A closed receiver means the caller
    /// abandoned the turn: the stream is dropped (closing the connection)
    /// and `Cancelled` is returned so partial output is never mistaken for
    /// a completed answer.
    async fn chat_stream(
        &self,
        messages: Vec<ChatMessage>,
        params: CompletionParams,
        chunks: mpsc::Sender<String>,
    ) -> Result<String>;

    /// Get model name
    fn model_name(&self) -> &str;
}

#[derive(Serialize)]
struct ChatRequest {
    /// Omitted entirely when unset so the provider picks its default model
    #[serde(skip_serializing_if = "String::is_empty")]
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct StreamResponse {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

/// OpenAI-compatible HTTP client
pub struct HttpLlmClient {
    http_client: reqwest::Client,
    config: LlmServiceConfig,
}

impl HttpLlmClient {
    pub fn new(config: LlmServiceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(AssistantError::from)?;

        Ok(Self {
            http_client,
            config,
        })
    }

    fn request(&self, messages: Vec<ChatMessage>, params: CompletionParams, stream: bool) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            stream,
        }
    }

    async fn send(&self, body: &ChatRequest) -> Result<reqwest::Response> {
        let url = format!("{}/v1/chat/completions", self.config.url);

        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(body)
            .send()
            .await
            .map_err(AssistantError::from)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        tracing::warn!("chat_completions failed: HTTP {} {}", status, message);
        Err(map_status(status.as_u16(), message))
    }
}

enum Delivery {
    Open,
    Finished,
}

/// Apply one SSE line: forward any text delta, report terminal markers.
///
/// A failed send means the receiver is gone, i.e. the caller abandoned the
/// turn; that surfaces as `Cancelled` so the partial text is never treated
/// as a completed answer.
async fn deliver(
    line: &str,
    full_content: &mut String,
    chunks: &mpsc::Sender<String>,
) -> Result<Delivery> {
    let Some(data) = line.strip_prefix("data: ") else {
        return Ok(Delivery::Open);
    };
    if data == "[DONE]" {
        return Ok(Delivery::Finished);
    }

    let Ok(parsed) = serde_json::from_str::<StreamResponse>(data) else {
        return Ok(Delivery::Open);
    };
    let Some(choice) = parsed.choices.first() else {
        return Ok(Delivery::Open);
    };

    if let Some(content) = &choice.delta.content {
        full_content.push_str(content);
        if chunks.send(content.clone()).await.is_err() {
            tracing::debug!("chat stream abandoned by caller");
            return Err(AssistantError::Cancelled(
                "answer stream receiver dropped".to_string(),
            ));
        }
    }
    if choice.finish_reason.is_some() {
        return Ok(Delivery::Finished);
    }
    Ok(Delivery::Open)
}

/// Map an HTTP status onto the error taxonomy
fn map_status(status: u16, message: String) -> AssistantError {
    match status {
        401 | 403 => AssistantError::Authentication(message),
        429 => AssistantError::RateLimit(message),
        500..=599 => AssistantError::ServiceUnavailable { status, message },
        _ => AssistantError::Llm(format!("HTTP {}: {}", status, message)),
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        params: CompletionParams,
    ) -> Result<String> {
        let body = self.request(messages, params, false);
        let response = self.send(&body).await?;

        let chat_response: ChatResponse = response.json().await.map_err(AssistantError::from)?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AssistantError::Llm("No response from LLM".to_string()))
    }

    async fn chat_stream(
        &self,
        messages: Vec<ChatMessage>,
        params: CompletionParams,
        chunks: mpsc::Sender<String>,
    ) -> Result<String> {
        let body = self.request(messages, params, true);
        let response = self.send(&body).await?;

        let mut full_content = String::new();
        let mut bytes_received = 0usize;
        let mut stream = response.bytes_stream();
        let mut lines = super::sse::LineBuffer::new();

        while let Some(chunk) = stream.next().await {
            // Request already accepted: transport failures here are terminal,
            // never retried, since partial output may already be delivered.
            let chunk = chunk.map_err(|e| {
                tracing::warn!("chat stream dropped after {} bytes: {}", bytes_received, e);
                AssistantError::StreamInterrupted {
                    bytes_received,
                    message: e.to_string(),
                }
            })?;
            bytes_received += chunk.len();

            for line in lines.push(&chunk) {
                match deliver(&line, &mut full_content, &chunks).await? {
                    Delivery::Open => {}
                    Delivery::Finished => return Ok(full_content),
                }
            }
        }

        // Streams may end without a trailing newline; the last buffered
        // line still counts.
        if let Some(line) = lines.finish() {
            let _ = deliver(&line, &mut full_content, &chunks).await?;
        }

        Ok(full_content)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
