//! End-to-end tests for the chat pipeline with a scripted LLM client

use async_trait::async_trait;
use campushub_assistant::{
    Article, AssistantError, ChatMessage, ChatPipeline, CompletionParams, Database,
    KeywordRetriever, LlmClient, LlmServiceConfig, MessageRole, RetryPolicy,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn wiki_corpus() -> Vec<Article> {
    let mk = |id: i64, title: &str, slug: &str, category: &str, content: &str| Article {
        id,
        title: title.to_string(),
        slug: slug.to_string(),
        category: category.to_string(),
        content: content.to_string(),
        created_at: "2026-01-01T00:00:00Z".to_string(),
        updated_at: "2026-01-01T00:00:00Z".to_string(),
    };
    vec![
        mk(
            1,
            "Exam Regulations",
            "exam-regulations",
            "academics",
            "Exams are scheduled at the end of each semester. Students must register \
             for each exam at least two weeks in advance.",
        ),
        mk(
            2,
            "Exam Retake Policy",
            "exam-retakes",
            "academics",
            "A failed exam may be retaken twice. Retake exams happen in the first \
             week of the following semester.",
        ),
        mk(
            3,
            "Dormitory Quiet Hours",
            "dorm-quiet-hours",
            "housing",
            "Quiet hours in all dormitories run from 22:00 to 07:00 on weekdays.",
        ),
    ]
}

/// LLM double that fails the first `stream_failures` stream attempts and
/// optionally refuses non-streaming completion calls.
struct ScriptedClient {
    answer: String,
    stream_failures: u32,
    stream_error: fn() -> AssistantError,
    completion_fails: bool,
    stream_calls: Arc<AtomicU32>,
}

impl ScriptedClient {
    fn happy(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            stream_failures: 0,
            stream_error: || AssistantError::Llm("unused".into()),
            completion_fails: false,
            stream_calls: Arc::new(AtomicU32::new(0)),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn chat_completion(
        &self,
        _messages: Vec<ChatMessage>,
        _params: CompletionParams,
    ) -> campushub_assistant::Result<String> {
        if self.completion_fails {
            return Err(AssistantError::ServiceUnavailable {
                status: 503,
                message: "down".into(),
            });
        }
        Ok("Exam Questions".to_string())
    }

    async fn chat_stream(
        &self,
        _messages: Vec<ChatMessage>,
        _params: CompletionParams,
        chunks: mpsc::Sender<String>,
    ) -> campushub_assistant::Result<String> {
        let n = self.stream_calls.fetch_add(1, Ordering::SeqCst);
        if n < self.stream_failures {
            return Err((self.stream_error)());
        }
        for word in self.answer.split_inclusive(' ') {
            if chunks.send(word.to_string()).await.is_err() {
                return Err(AssistantError::Cancelled(
                    "answer stream receiver dropped".to_string(),
                ));
            }
        }
        Ok(self.answer.clone())
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn test_config() -> LlmServiceConfig {
    let vars = HashMap::from([(
        "ASSISTANT_LLM_API_KEY".to_string(),
        "sk-test".to_string(),
    )]);
    LlmServiceConfig::from_vars(&vars).unwrap()
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 4,
        base_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        max_jitter: Duration::ZERO,
    }
}

fn pipeline(client: ScriptedClient) -> ChatPipeline {
    init_tracing();
    let db = Database::open_in_memory().unwrap();
    db.initialize().unwrap();
    let retriever = KeywordRetriever::new(wiki_corpus());
    let categories = retriever.categories();
    ChatPipeline::new(
        db,
        Box::new(retriever),
        Box::new(client),
        &test_config(),
        categories,
    )
    .with_retry_policy(fast_policy())
}

#[tokio::test]
async fn full_turn_persists_both_messages_with_citations() {
    let pipeline = pipeline(ScriptedClient::happy(
        "Register two weeks ahead, see [Exam Regulations](wiki:exam-regulations). ",
    ));
    let session = pipeline.create_session("alice").unwrap();
    let (tx, mut rx) = mpsc::channel(64);

    let outcome = pipeline
        .handle_turn(&session.id, "alice", "how do exam registrations work", tx)
        .await
        .unwrap();

    // Both sides of the turn are persisted, in order
    let messages = pipeline.messages(&session.id, "alice").unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, MessageRole::User);
    assert_eq!(messages[1].role, MessageRole::Assistant);
    assert!(messages[0].created_at <= messages[1].created_at);
    assert_eq!(messages[1].id, outcome.assistant_message.id);

    // Citations are a subset (by slug) of what retrieval produced
    let sources = outcome.assistant_message.sources.as_deref().unwrap();
    let known_slugs = ["exam-regulations", "exam-retakes", "dorm-quiet-hours"];
    assert!(!sources.is_empty());
    for source in sources {
        assert!(known_slugs.contains(&source.slug.as_str()));
    }

    // Session recency covers the newest message
    let refreshed = pipeline.get_session(&session.id, "alice").unwrap();
    assert!(refreshed.updated_at >= messages[1].created_at);

    // The streamed text equals the persisted assistant content
    let mut streamed = String::new();
    while let Some(chunk) = rx.recv().await {
        streamed.push_str(&chunk);
    }
    assert_eq!(streamed, outcome.assistant_message.content);
}

#[tokio::test]
async fn first_turn_mints_a_title_and_later_turns_do_not() {
    let pipeline = pipeline(ScriptedClient::happy("Answer one. "));
    let session = pipeline.create_session("alice").unwrap();

    let (tx, _rx) = mpsc::channel(64);
    let first = pipeline
        .handle_turn(&session.id, "alice", "when are exams", tx)
        .await
        .unwrap();
    assert_eq!(first.title.as_deref(), Some("Exam Questions"));
    assert_eq!(
        pipeline.get_session(&session.id, "alice").unwrap().title,
        "Exam Questions"
    );

    let (tx, _rx) = mpsc::channel(64);
    let second = pipeline
        .handle_turn(&session.id, "alice", "and exam retakes?", tx)
        .await
        .unwrap();
    assert!(second.title.is_none());
}

#[tokio::test]
async fn title_falls_back_to_truncated_message_when_llm_fails() {
    let client = ScriptedClient {
        completion_fails: true,
        ..ScriptedClient::happy("Answer. ")
    };
    let pipeline = pipeline(client);
    let session = pipeline.create_session("alice").unwrap();

    let long_question = format!("{} and what about the library", "exam rules ".repeat(10));
    let (tx, _rx) = mpsc::channel(64);
    let outcome = pipeline
        .handle_turn(&session.id, "alice", &long_question, tx)
        .await
        .unwrap();

    let expected: String = long_question.trim().chars().take(50).collect();
    assert_eq!(outcome.title.unwrap(), format!("{}…", expected));
}

#[tokio::test]
async fn authentication_failure_aborts_turn_without_retries() {
    let client = ScriptedClient {
        stream_failures: u32::MAX,
        stream_error: || AssistantError::Authentication("invalid key".into()),
        ..ScriptedClient::happy("unused")
    };
    let pipeline = pipeline(client);
    let session = pipeline.create_session("alice").unwrap();

    let (tx, _rx) = mpsc::channel(64);
    let result = pipeline
        .handle_turn(&session.id, "alice", "when are exams", tx)
        .await;

    assert!(matches!(result, Err(AssistantError::Authentication(_))));

    // The user message was persisted before the failure; no assistant reply
    let messages = pipeline.messages(&session.id, "alice").unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, MessageRole::User);
}

#[tokio::test]
async fn two_outages_then_success_still_streams() {
    let client = ScriptedClient {
        stream_failures: 2,
        stream_error: || AssistantError::ServiceUnavailable {
            status: 503,
            message: "down".into(),
        },
        ..ScriptedClient::happy("Recovered answer. ")
    };
    let pipeline = pipeline(client);
    let session = pipeline.create_session("alice").unwrap();

    let (tx, _rx) = mpsc::channel(64);
    let outcome = pipeline
        .handle_turn(&session.id, "alice", "when are exams", tx)
        .await
        .unwrap();

    assert_eq!(outcome.assistant_message.content, "Recovered answer. ");
}

#[tokio::test]
async fn unrelated_query_is_flagged_and_carries_no_citations() {
    let pipeline = pipeline(ScriptedClient::happy(
        "I can only help with the campus wiki. ",
    ));
    let session = pipeline.create_session("alice").unwrap();

    let (tx, _rx) = mpsc::channel(64);
    let outcome = pipeline
        .handle_turn(&session.id, "alice", "best pizza in town tonight", tx)
        .await
        .unwrap();

    assert!(outcome.flags.is_out_of_scope);
    assert!(outcome.assistant_message.sources.is_none());
}

#[tokio::test]
async fn abandoned_turn_cancels_without_retry_or_persistence() {
    let client = ScriptedClient::happy("an answer in many words that keeps streaming ");
    let stream_calls = client.stream_calls.clone();
    let pipeline = pipeline(client);
    let session = pipeline.create_session("alice").unwrap();

    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let result = pipeline
        .handle_turn(&session.id, "alice", "when are exams", tx)
        .await;

    assert!(matches!(result, Err(AssistantError::Cancelled(_))));
    // The stream was opened once and never re-attempted
    assert_eq!(stream_calls.load(Ordering::SeqCst), 1);

    // Only the user message is in the log; no truncated assistant answer
    let messages = pipeline.messages(&session.id, "alice").unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, MessageRole::User);
}

#[tokio::test]
async fn turn_on_foreign_session_is_forbidden() {
    let pipeline = pipeline(ScriptedClient::happy("unused"));
    let session = pipeline.create_session("alice").unwrap();

    let (tx, _rx) = mpsc::channel(64);
    let result = pipeline
        .handle_turn(&session.id, "mallory", "when are exams", tx)
        .await;

    assert!(matches!(result, Err(AssistantError::Forbidden(_))));
    assert!(pipeline.messages(&session.id, "alice").unwrap().is_empty());
}

#[tokio::test]
async fn history_accumulates_across_turns() {
    let pipeline = pipeline(ScriptedClient::happy("Answer. "));
    let session = pipeline.create_session("alice").unwrap();

    for question in ["when are exams", "what about retakes", "and quiet hours"] {
        let (tx, _rx) = mpsc::channel(64);
        pipeline
            .handle_turn(&session.id, "alice", question, tx)
            .await
            .unwrap();
    }

    let messages = pipeline.messages(&session.id, "alice").unwrap();
    assert_eq!(messages.len(), 6);
    for pair in messages.windows(2) {
        assert!(pair[0].created_at <= pair[1].created_at);
    }
    // Roles strictly alternate user/assistant
    for (i, message) in messages.iter().enumerate() {
        let expected = if i % 2 == 0 {
            MessageRole::User
        } else {
            MessageRole::Assistant
        };
        assert_eq!(message.role, expected);
    }
}
