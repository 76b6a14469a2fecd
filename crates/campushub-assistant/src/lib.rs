//! CampusHub Wiki Assistant
//!
//! Retrieval-augmented chat pipeline behind the wiki assistant: conversation
//! sessions, knowledge retrieval with citation tracking, grounded prompt
//! composition, and streamed LLM answers with retry/backoff.
//!
//! # Features
//! - Owner-scoped sessions with an append-only message log (SQLite)
//! - Deterministic keyword retrieval over the wiki knowledge base
//! - Query intent classification (recommendation / ambiguous / out-of-scope)
//! - Streaming answers with a citation set fixed before generation
//! - Exponential backoff with jitter around the LLM call

pub mod articles;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod retrieval;

pub use articles::{Article, ArticleSource, RetrievalSource, RetrievedArticle};
pub use config::LlmServiceConfig;
pub use db::{ChatMessageRecord, ChatSession, Database, MessageRole, NewMessage};
pub use error::{AssistantError, Error, Result};
pub use llm::{ChatMessage, CompletionParams, HttpLlmClient, LlmClient};
pub use pipeline::{
    classify, compose, execute_with_retry, fallback_title, generate_title, ChatPipeline,
    ClassificationFlags, CompletedAnswer, ResponseGenerator, RetryPolicy, TurnOutcome,
};
pub use retrieval::{extract_excerpt, KeywordRetriever, KnowledgeRetriever};

/// Default data directory name
pub const DATA_DIR_NAME: &str = "campushub";
