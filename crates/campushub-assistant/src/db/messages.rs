//! Append-only message persistence
//!
//! Messages are immutable once written; there is no update path. Ordering
//! within a session is by `created_at` with the insertion rowid as a
//! tiebreaker, so batch writes in the same instant keep their order.

use super::schema::generate_uuid;
use super::Database;
use crate::articles::ArticleSource;
use crate::error::{AssistantError, Result};
use chrono::Utc;
use rusqlite::params;

/// Message author role
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    fn parse(raw: &str) -> Result<Self> {
        match raw {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(AssistantError::Validation(format!(
                "unknown message role: {}",
                other
            ))),
        }
    }
}

/// A persisted chat message
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChatMessageRecord {
    pub id: String,
    pub session_id: String,
    pub role: MessageRole,
    pub content: String,
    pub sources: Option<Vec<ArticleSource>>,
    pub created_at: String,
}

/// Input for a batch write
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub role: MessageRole,
    pub content: String,
    pub sources: Option<Vec<ArticleSource>>,
}

impl Database {
    /// Persist a message, then bump the session's recency.
    ///
    /// The touch is best-effort; a failure there is logged by
    /// `touch_session` and never surfaces here.
    pub fn save_message(
        &self,
        session_id: &str,
        owner_id: &str,
        role: MessageRole,
        content: &str,
        sources: Option<&[ArticleSource]>,
    ) -> Result<ChatMessageRecord> {
        self.get_session(session_id, owner_id)?;
        let record = self.insert_message(session_id, role, content, sources)?;
        self.touch_session(session_id, owner_id);
        Ok(record)
    }

    /// Atomically persist several messages in order, then touch once
    pub fn save_messages(
        &self,
        session_id: &str,
        owner_id: &str,
        messages: &[NewMessage],
    ) -> Result<Vec<ChatMessageRecord>> {
        self.get_session(session_id, owner_id)?;

        let tx = self.conn.unchecked_transaction()?;
        let mut records = Vec::with_capacity(messages.len());
        for message in messages {
            records.push(self.insert_message(
                session_id,
                message.role,
                &message.content,
                message.sources.as_deref(),
            )?);
        }
        tx.commit()?;

        self.touch_session(session_id, owner_id);
        Ok(records)
    }

    fn insert_message(
        &self,
        session_id: &str,
        role: MessageRole,
        content: &str,
        sources: Option<&[ArticleSource]>,
    ) -> Result<ChatMessageRecord> {
        if content.trim().is_empty() {
            return Err(AssistantError::Validation(
                "message content must not be empty".to_string(),
            ));
        }

        let id = generate_uuid();
        let now = Utc::now().to_rfc3339();
        let sources_json = sources
            .filter(|s| !s.is_empty())
            .map(serde_json::to_string)
            .transpose()?;

        self.conn.execute(
            "INSERT INTO chat_messages (id, session_id, role, content, sources, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, session_id, role.as_str(), content, sources_json, now],
        )?;

        Ok(ChatMessageRecord {
            id,
            session_id: session_id.to_string(),
            role,
            content: content.to_string(),
            sources: sources.filter(|s| !s.is_empty()).map(|s| s.to_vec()),
            created_at: now,
        })
    }

    /// All messages in a session, oldest first
    pub fn list_messages(&self, session_id: &str) -> Result<Vec<ChatMessageRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, role, content, sources, created_at
             FROM chat_messages WHERE session_id = ?1
             ORDER BY created_at, rowid",
        )?;

        let rows = stmt
            .query_map(params![session_id], row_to_parts)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(parts_to_record).collect()
    }

    /// Most recent message in a session, if any
    pub fn latest_message(&self, session_id: &str) -> Result<Option<ChatMessageRecord>> {
        let result = self.conn.query_row(
            "SELECT id, session_id, role, content, sources, created_at
             FROM chat_messages WHERE session_id = ?1
             ORDER BY created_at DESC, rowid DESC LIMIT 1",
            params![session_id],
            row_to_parts,
        );

        match result {
            Ok(parts) => Ok(Some(parts_to_record(parts)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn count_messages(&self, session_id: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM chat_messages WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn delete_message(&self, message_id: &str) -> Result<()> {
        let deleted = self.conn.execute(
            "DELETE FROM chat_messages WHERE id = ?1",
            params![message_id],
        )?;
        if deleted == 0 {
            return Err(AssistantError::NotFound(format!(
                "message {}",
                message_id
            )));
        }
        Ok(())
    }
}

type MessageParts = (String, String, String, String, Option<String>, String);

fn row_to_parts(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageParts> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn parts_to_record(parts: MessageParts) -> Result<ChatMessageRecord> {
    let (id, session_id, role, content, sources_json, created_at) = parts;
    let sources = sources_json
        .map(|j| serde_json::from_str::<Vec<ArticleSource>>(&j))
        .transpose()?;
    Ok(ChatMessageRecord {
        id,
        session_id,
        role: MessageRole::parse(&role)?,
        content,
        sources,
        created_at,
    })
}
