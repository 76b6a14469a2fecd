//! Streaming response generation
//!
//! Orchestrates prompt delivery to the LLM through the backoff controller
//! and relays the token stream to the caller. The turn moves through
//! Requesting (retryable failures re-attempted), Streaming (failures are
//! terminal `StreamInterrupted`), and Completed. Persistence is left to the
//! caller so a storage failure cannot corrupt generation and vice versa.

use super::retry::{execute_with_retry, RetryPolicy};
use crate::articles::{ArticleSource, RetrievedArticle};
use crate::error::Result;
use crate::llm::{ChatMessage, CompletionParams, LlmClient};
use tokio::sync::mpsc;

/// Final result of a streamed turn.
///
/// `sources` is derived from the retrieval set before streaming starts; it
/// does not depend on what the model generated.
#[derive(Debug, Clone)]
pub struct CompletedAnswer {
    pub content: String,
    pub sources: Vec<ArticleSource>,
}

/// Streams one answer per call
pub struct ResponseGenerator<'a> {
    client: &'a dyn LlmClient,
    policy: RetryPolicy,
}

impl<'a> ResponseGenerator<'a> {
    pub fn new(client: &'a dyn LlmClient, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Stream an answer grounded in `retrieved`.
    ///
    /// `conversation` is the message history including the current user
    /// question; `instructions` becomes the system message. Text deltas go
    /// out through `chunks`; dropping the receiver cancels the stream
    /// without a retry.
    ///
    /// Retry only applies while the request is being opened: the client
    /// reports every post-acceptance failure as `StreamInterrupted`, which
    /// the retry predicate rejects, so partial output is never replayed.
    pub async fn generate(
        &self,
        instructions: &str,
        conversation: &[ChatMessage],
        retrieved: &[RetrievedArticle],
        params: CompletionParams,
        chunks: mpsc::Sender<String>,
    ) -> Result<CompletedAnswer> {
        let sources: Vec<ArticleSource> = retrieved.iter().map(|r| r.citation()).collect();

        let mut messages = Vec::with_capacity(conversation.len() + 1);
        messages.push(ChatMessage::system(instructions));
        messages.extend_from_slice(conversation);

        tracing::debug!(
            "requesting answer stream: {} messages, {} sources",
            messages.len(),
            sources.len()
        );

        let content = execute_with_retry(
            &self.policy,
            "chat_stream",
            |e| e.is_retryable(),
            || {
                self.client
                    .chat_stream(messages.clone(), params, chunks.clone())
            },
        )
        .await?;

        tracing::debug!("answer stream completed: {} chars", content.len());
        Ok(CompletedAnswer { content, sources })
    }
}
