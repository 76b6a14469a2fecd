//! Error types for the wiki assistant pipeline

use thiserror::Error;

/// Result type alias using AssistantError
pub type Result<T> = std::result::Result<T, AssistantError>;

/// Error type alias for convenience
pub type Error = AssistantError;

/// Main error type for the assistant pipeline
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limited by LLM provider: {0}")]
    RateLimit(String),

    #[error("LLM service unavailable (HTTP {status}): {message}")]
    ServiceUnavailable { status: u16, message: String },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Stream interrupted after {bytes_received} bytes: {message}")]
    StreamInterrupted { bytes_received: usize, message: String },

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AssistantError {
    /// Whether the backoff controller may retry after this error.
    ///
    /// Only transient remote failures qualify; everything else propagates
    /// on first occurrence.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimit(_)
                | Self::ServiceUnavailable { .. }
                | Self::Timeout(_)
                | Self::Connection(_)
        )
    }

    /// Friendly description safe to show to an end user.
    ///
    /// Never includes status codes, provider responses, or retry mechanics.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Authentication(_) => {
                "The assistant is not configured correctly. Please contact an administrator."
            }
            Self::RateLimit(_) => "The assistant is busy right now. Please try again shortly.",
            Self::ServiceUnavailable { .. } | Self::Timeout(_) | Self::Connection(_) => {
                "The assistant is temporarily unavailable. Please try again in a moment."
            }
            Self::StreamInterrupted { .. } => {
                "The answer was cut off. Please send your question again."
            }
            Self::Cancelled(_) => "The request was cancelled.",
            Self::NotFound(_) => "That conversation could not be found.",
            Self::Forbidden(_) => "You do not have access to that conversation.",
            Self::Validation(_) => "Your message could not be processed. Please check it and retry.",
            _ => "Something went wrong. Please try again.",
        }
    }
}

/// Map a reqwest transport error onto the retry taxonomy.
///
/// Called before any response body exists; status-based mapping happens at
/// the call site once a response arrives.
impl From<reqwest::Error> for AssistantError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_connect() {
            Self::Connection(e.to_string())
        } else {
            Self::Llm(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_retryable() {
        assert!(AssistantError::RateLimit("429".into()).is_retryable());
        assert!(AssistantError::ServiceUnavailable {
            status: 503,
            message: "down".into()
        }
        .is_retryable());
        assert!(AssistantError::Timeout("30s".into()).is_retryable());
        assert!(AssistantError::Connection("reset".into()).is_retryable());
    }

    #[test]
    fn terminal_errors_are_not_retryable() {
        assert!(!AssistantError::Authentication("bad key".into()).is_retryable());
        assert!(!AssistantError::StreamInterrupted {
            bytes_received: 128,
            message: "eof".into()
        }
        .is_retryable());
        assert!(!AssistantError::Cancelled("receiver dropped".into()).is_retryable());
        assert!(!AssistantError::NotFound("session".into()).is_retryable());
        assert!(!AssistantError::Validation("empty".into()).is_retryable());
    }

    #[test]
    fn user_messages_do_not_leak_detail() {
        let err = AssistantError::ServiceUnavailable {
            status: 502,
            message: "upstream gateway exploded at 10.0.0.3".into(),
        };
        assert!(!err.user_message().contains("502"));
        assert!(!err.user_message().contains("10.0.0.3"));
    }
}
