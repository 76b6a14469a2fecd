//! Session title generation
//!
//! One small non-streaming LLM call on the first turn. Failure is never
//! fatal: any error or empty result falls back to a truncation of the
//! user's message.

use crate::llm::{ChatMessage, CompletionParams, LlmClient};

/// Character budget for the fallback title
const FALLBACK_MAX_CHARS: usize = 50;

/// Small token budget; a title never needs more
const TITLE_MAX_TOKENS: u32 = 24;

/// Derive a short session title from the first user message.
///
/// Returns at most ~6 words on the happy path; the fallback is the first 50
/// characters of the message with a trailing ellipsis when truncated.
pub async fn generate_title(client: &dyn LlmClient, first_message: &str) -> String {
    let messages = vec![
        ChatMessage::system(
            "Produce a title of at most 6 words for a conversation that starts \
             with the user message below. Reply with the title only: no quotes, \
             no punctuation at the end.",
        ),
        ChatMessage::user(first_message),
    ];
    let params = CompletionParams {
        temperature: 0.3,
        max_tokens: TITLE_MAX_TOKENS,
    };

    match client.chat_completion(messages, params).await {
        Ok(raw) => {
            let title = raw.trim().trim_matches('"').trim().to_string();
            if title.is_empty() {
                tracing::debug!("title generation returned empty result, using fallback");
                fallback_title(first_message)
            } else {
                title
            }
        }
        Err(e) => {
            tracing::warn!("title generation failed, using fallback: {}", e);
            fallback_title(first_message)
        }
    }
}

/// First 50 characters of the message, ellipsis appended when truncated
pub fn fallback_title(first_message: &str) -> String {
    let trimmed = first_message.trim();
    let mut title: String = trimmed.chars().take(FALLBACK_MAX_CHARS).collect();
    if trimmed.chars().count() > FALLBACK_MAX_CHARS {
        title.push('…');
    }
    title
}
