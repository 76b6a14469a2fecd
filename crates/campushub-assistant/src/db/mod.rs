//! Database layer
//!
//! SQLite-backed storage for conversation sessions and their append-only
//! message logs. Two tables, both narrow contracts: `chat_sessions`
//! (owner-scoped, recency-ordered) and `chat_messages` (immutable rows,
//! citation sources as a JSON column).

mod schema;
mod sessions;
mod messages;

pub use messages::{ChatMessageRecord, MessageRole, NewMessage};
pub use schema::Database;
pub use sessions::ChatSession;

use std::path::PathBuf;

impl Database {
    /// Get the default database path
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::DATA_DIR_NAME)
            .join("assistant.sqlite")
    }
}
