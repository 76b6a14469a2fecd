//! Conversation session management
//!
//! Sessions are owned by exactly one user and ordered by recency. Every
//! message exchange refreshes `updated_at` through [`Database::touch_session`],
//! which is deliberately infallible: a failed touch must never block message
//! delivery, so it logs and returns nothing.

use super::schema::generate_uuid;
use super::Database;
use crate::error::{AssistantError, Result};
use chrono::Utc;
use rusqlite::params;

/// A user-owned conversation thread
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChatSession {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
}

const DEFAULT_TITLE: &str = "New conversation";

impl Database {
    pub fn create_session(&self, owner_id: &str) -> Result<ChatSession> {
        if owner_id.trim().is_empty() {
            return Err(AssistantError::Validation(
                "owner_id must not be empty".to_string(),
            ));
        }

        let id = generate_uuid();
        let now = Utc::now().to_rfc3339();

        self.conn.execute(
            "INSERT INTO chat_sessions (id, owner_id, title, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![id, owner_id, DEFAULT_TITLE, now],
        )?;

        Ok(ChatSession {
            id,
            owner_id: owner_id.to_string(),
            title: DEFAULT_TITLE.to_string(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Fetch a session, enforcing ownership.
    ///
    /// `NotFound` if the id is absent, `Forbidden` if it belongs to someone
    /// else. The two are distinct so callers can avoid leaking existence.
    pub fn get_session(&self, session_id: &str, owner_id: &str) -> Result<ChatSession> {
        let result = self.conn.query_row(
            "SELECT id, owner_id, title, created_at, updated_at
             FROM chat_sessions WHERE id = ?1",
            params![session_id],
            |row| {
                Ok(ChatSession {
                    id: row.get(0)?,
                    owner_id: row.get(1)?,
                    title: row.get(2)?,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            },
        );

        let session = match result {
            Ok(session) => session,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(AssistantError::NotFound(format!(
                    "session {}",
                    session_id
                )))
            }
            Err(e) => return Err(e.into()),
        };

        if session.owner_id != owner_id {
            return Err(AssistantError::Forbidden(format!(
                "session {} is not owned by requester",
                session_id
            )));
        }

        Ok(session)
    }

    /// List a user's sessions, most recently active first
    pub fn list_sessions(&self, owner_id: &str) -> Result<Vec<ChatSession>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner_id, title, created_at, updated_at
             FROM chat_sessions WHERE owner_id = ?1
             ORDER BY updated_at DESC, id",
        )?;

        let sessions = stmt
            .query_map(params![owner_id], |row| {
                Ok(ChatSession {
                    id: row.get(0)?,
                    owner_id: row.get(1)?,
                    title: row.get(2)?,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(sessions)
    }

    pub fn rename_session(&self, session_id: &str, owner_id: &str, title: &str) -> Result<()> {
        if title.trim().is_empty() {
            return Err(AssistantError::Validation(
                "title must not be empty".to_string(),
            ));
        }
        self.get_session(session_id, owner_id)?;

        self.conn.execute(
            "UPDATE chat_sessions SET title = ?2 WHERE id = ?1",
            params![session_id, title],
        )?;
        Ok(())
    }

    pub fn delete_session(&self, session_id: &str, owner_id: &str) -> Result<()> {
        self.get_session(session_id, owner_id)?;

        self.conn.execute(
            "DELETE FROM chat_sessions WHERE id = ?1",
            params![session_id],
        )?;
        Ok(())
    }

    /// Best-effort recency bump.
    ///
    /// Returns nothing: the contract is that touch failures are logged and
    /// swallowed. `updated_at` is last-writer-wins under concurrent turns.
    pub fn touch_session(&self, session_id: &str, owner_id: &str) {
        let now = Utc::now().to_rfc3339();
        let result = self.conn.execute(
            "UPDATE chat_sessions SET updated_at = ?3 WHERE id = ?1 AND owner_id = ?2",
            params![session_id, owner_id, now],
        );
        match result {
            Ok(0) => tracing::warn!("touch_session: no such session {}", session_id),
            Ok(_) => {}
            Err(e) => tracing::warn!("touch_session failed for {}: {}", session_id, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    #[test]
    fn test_session_lifecycle() {
        let db = test_db();

        let session = db.create_session("alice").unwrap();
        assert!(!session.id.is_empty());
        assert_eq!(session.title, "New conversation");
        assert_eq!(session.created_at, session.updated_at);

        let fetched = db.get_session(&session.id, "alice").unwrap();
        assert_eq!(fetched.id, session.id);

        db.delete_session(&session.id, "alice").unwrap();
        assert!(matches!(
            db.get_session(&session.id, "alice"),
            Err(AssistantError::NotFound(_))
        ));
    }

    #[test]
    fn test_ownership_enforced() {
        let db = test_db();
        let session = db.create_session("alice").unwrap();

        assert!(matches!(
            db.get_session(&session.id, "mallory"),
            Err(AssistantError::Forbidden(_))
        ));
        assert!(matches!(
            db.delete_session(&session.id, "mallory"),
            Err(AssistantError::Forbidden(_))
        ));
        // Alice can still get at it
        assert!(db.get_session(&session.id, "alice").is_ok());
    }

    #[test]
    fn test_list_ordered_by_recency() {
        let db = test_db();
        let first = db.create_session("alice").unwrap();
        let second = db.create_session("alice").unwrap();
        db.create_session("bob").unwrap();

        // Bump the older session to the top
        std::thread::sleep(std::time::Duration::from_millis(5));
        db.touch_session(&first.id, "alice");

        let sessions = db.list_sessions("alice").unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, first.id);
        assert_eq!(sessions[1].id, second.id);
    }

    #[test]
    fn test_touch_never_errors() {
        let db = test_db();
        // Unknown session and wrong owner both just log
        db.touch_session("no-such-id", "alice");
        let session = db.create_session("alice").unwrap();
        db.touch_session(&session.id, "mallory");

        let unchanged = db.get_session(&session.id, "alice").unwrap();
        assert_eq!(unchanged.updated_at, session.updated_at);
    }

    #[test]
    fn test_rename() {
        let db = test_db();
        let session = db.create_session("alice").unwrap();

        db.rename_session(&session.id, "alice", "Exam questions")
            .unwrap();
        let fetched = db.get_session(&session.id, "alice").unwrap();
        assert_eq!(fetched.title, "Exam questions");

        assert!(matches!(
            db.rename_session(&session.id, "alice", "   "),
            Err(AssistantError::Validation(_))
        ));
    }

    #[test]
    fn test_create_rejects_blank_owner() {
        let db = test_db();
        assert!(matches!(
            db.create_session(""),
            Err(AssistantError::Validation(_))
        ));
    }
}
