//! LLM integration
//!
//! Provides the client trait and the HTTP implementation for
//! OpenAI-compatible chat completion endpoints, in both synchronous
//! (title generation) and streaming (answers) forms.

mod client;
mod sse;

pub use client::{ChatMessage, CompletionParams, HttpLlmClient, LlmClient};
