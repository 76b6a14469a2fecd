//! The retrieval-augmented chat pipeline
//!
//! One user turn runs sequentially through: session validation → user
//! message persistence → retrieval → classification → prompt composition →
//! streamed generation (behind retry) → assistant message persistence →
//! session touch, plus title generation on the first turn. Stages never
//! overlap within a turn; separate sessions can run turns concurrently on
//! their own pipeline instances.

pub mod classifier;
pub mod generator;
pub mod prompt;
pub mod retry;
pub mod title;

pub use classifier::{classify, ClassificationFlags};
pub use generator::{CompletedAnswer, ResponseGenerator};
pub use prompt::compose;
pub use retry::{execute_with_retry, RetryPolicy};
pub use title::{fallback_title, generate_title};

use crate::config::LlmServiceConfig;
use crate::db::{ChatMessageRecord, ChatSession, Database, MessageRole};
use crate::error::Result;
use crate::llm::{ChatMessage, CompletionParams, LlmClient};
use crate::retrieval::KnowledgeRetriever;
use tokio::sync::mpsc;

/// Messages of history carried into each prompt
const HISTORY_WINDOW: usize = 12;

/// Everything the caller gets back from one completed turn
#[derive(Debug)]
pub struct TurnOutcome {
    pub user_message: ChatMessageRecord,
    pub assistant_message: ChatMessageRecord,
    pub flags: ClassificationFlags,
    /// Set when this turn minted a session title
    pub title: Option<String>,
}

/// Programmatic entry point for the wiki assistant.
///
/// Owns its database handle; the surrounding application creates one
/// pipeline per worker (the handle is `Send` but not `Sync`).
pub struct ChatPipeline {
    db: Database,
    retriever: Box<dyn KnowledgeRetriever>,
    client: Box<dyn LlmClient>,
    policy: RetryPolicy,
    params: CompletionParams,
    available_categories: Vec<String>,
}

impl ChatPipeline {
    pub fn new(
        db: Database,
        retriever: Box<dyn KnowledgeRetriever>,
        client: Box<dyn LlmClient>,
        config: &LlmServiceConfig,
        available_categories: Vec<String>,
    ) -> Self {
        Self {
            db,
            retriever,
            client,
            policy: RetryPolicy::default(),
            params: CompletionParams::from_config(config),
            available_categories,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    // Session surface, delegated to the store

    pub fn create_session(&self, owner_id: &str) -> Result<ChatSession> {
        self.db.create_session(owner_id)
    }

    pub fn get_session(&self, session_id: &str, owner_id: &str) -> Result<ChatSession> {
        self.db.get_session(session_id, owner_id)
    }

    pub fn list_sessions(&self, owner_id: &str) -> Result<Vec<ChatSession>> {
        self.db.list_sessions(owner_id)
    }

    pub fn rename_session(&self, session_id: &str, owner_id: &str, title: &str) -> Result<()> {
        self.db.rename_session(session_id, owner_id, title)
    }

    pub fn delete_session(&self, session_id: &str, owner_id: &str) -> Result<()> {
        self.db.delete_session(session_id, owner_id)
    }

    pub fn messages(&self, session_id: &str, owner_id: &str) -> Result<Vec<ChatMessageRecord>> {
        self.db.get_session(session_id, owner_id)?;
        self.db.list_messages(session_id)
    }

    /// Run one full turn for a session.
    ///
    /// Streams answer text through `chunks` while it is generated; the
    /// persisted records and the citation set come back in the outcome.
    /// Failures are logged with their operation before returning; callers
    /// show `AssistantError::user_message` to the end user.
    pub async fn handle_turn(
        &self,
        session_id: &str,
        owner_id: &str,
        text: &str,
        chunks: mpsc::Sender<String>,
    ) -> Result<TurnOutcome> {
        self.db.get_session(session_id, owner_id)?;
        let first_turn = self.db.count_messages(session_id)? == 0;

        let history = self.history(session_id)?;
        let user_message = self
            .db
            .save_message(session_id, owner_id, MessageRole::User, text, None)?;

        let retrieved = self.retriever.retrieve(text).await.map_err(|e| {
            tracing::error!("retrieve failed for session {}: {}", session_id, e);
            e
        })?;
        let flags = classify(text, &retrieved);
        let instructions = compose(&retrieved, flags, &self.available_categories);

        let mut conversation = history;
        conversation.push(ChatMessage::user(text));

        let generator = ResponseGenerator::new(self.client.as_ref(), self.policy);
        let answer = generator
            .generate(&instructions, &conversation, &retrieved, self.params, chunks)
            .await
            .map_err(|e| {
                tracing::error!("generate failed for session {}: {}", session_id, e);
                e
            })?;

        let assistant_message = self.db.save_message(
            session_id,
            owner_id,
            MessageRole::Assistant,
            &answer.content,
            Some(&answer.sources),
        )?;

        let title = if first_turn {
            Some(self.set_title(session_id, owner_id, text).await)
        } else {
            None
        };

        Ok(TurnOutcome {
            user_message,
            assistant_message,
            flags,
            title,
        })
    }

    /// Recent history as LLM messages, oldest first
    fn history(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        let records = self.db.list_messages(session_id)?;
        let skip = records.len().saturating_sub(HISTORY_WINDOW);
        Ok(records
            .into_iter()
            .skip(skip)
            .map(|r| ChatMessage {
                role: r.role.as_str().to_string(),
                content: r.content,
            })
            .collect())
    }

    /// Title the session from its first message. Best-effort throughout:
    /// generation falls back internally and a failed rename only logs.
    async fn set_title(&self, session_id: &str, owner_id: &str, first_message: &str) -> String {
        let title = generate_title(self.client.as_ref(), first_message).await;
        if let Err(e) = self.db.rename_session(session_id, owner_id, &title) {
            tracing::warn!("failed to store title for session {}: {}", session_id, e);
        }
        title
    }
}
