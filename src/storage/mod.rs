//! # Storage Module
//!
//! Document store for conversations and messages.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         STORAGE BACKENDS                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  DocumentStore (trait)                                                  │
//! │  ├── MemoryStore  - DashMap per collection, default, used in tests     │
//! │  └── SqliteStore  - rusqlite, file or in-memory                        │
//! │                                                                         │
//! │  Collections:                                                           │
//! │  • conversations - participants + ordered message references           │
//! │  • messages      - independent records keyed by id                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Writes are per-document. Nothing here spans a conversation save and a
//! message save; callers that write both accept that one may land without
//! the other.

mod memory;
mod schema;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Conversation, Message, ParticipantQuery};

/// Persistence for conversation and message records.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// First conversation matching the query, if any.
    async fn find_conversation(&self, query: &ParticipantQuery) -> Result<Option<Conversation>>;

    /// Insert a new conversation.
    async fn create_conversation(&self, conversation: &Conversation) -> Result<()>;

    /// Replace a stored conversation with this version.
    async fn save_conversation(&self, conversation: &Conversation) -> Result<()>;

    /// Insert or replace a message.
    async fn save_message(&self, message: &Message) -> Result<()>;

    async fn find_message(&self, id: &str) -> Result<Option<Message>>;

    /// Resolve message references in the given order. Ids without a stored
    /// record are skipped.
    async fn populate_messages(&self, ids: &[String]) -> Result<Vec<Message>>;
}
