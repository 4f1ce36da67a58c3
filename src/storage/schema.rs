//! # Database Schema
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         DATABASE SCHEMA                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐   ┌───────────────────────────┐                    │
//! │  │  conversations  │   │ conversation_participants │                    │
//! │  ├─────────────────┤   ├───────────────────────────┤                    │
//! │  │ id              │◄──│ conversation_id           │                    │
//! │  │ created_at      │   │ position                  │                    │
//! │  │ updated_at      │   │ user_id                   │                    │
//! │  └─────────────────┘   └───────────────────────────┘                    │
//! │           ▲                                                             │
//! │           │            ┌───────────────────────────┐  ┌──────────────┐  │
//! │           │            │   conversation_messages   │  │   messages   │  │
//! │           │            ├───────────────────────────┤  ├──────────────┤  │
//! │           └────────────│ conversation_id           │  │ id           │  │
//! │                        │ position                  │  │ sender_id    │  │
//! │                        │ message_id                │─►│ receiver_id  │  │
//! │                        └───────────────────────────┘  │ body         │  │
//! │                                                       │ status       │  │
//! │                                                       │ created_at   │  │
//! │                                                       │ updated_at   │  │
//! │                                                       └──────────────┘  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Timestamps are Unix milliseconds.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL to create all tables
pub const CREATE_TABLES: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Conversations table
CREATE TABLE IF NOT EXISTS conversations (
    id TEXT PRIMARY KEY,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- Conversation membership, ordered as the participants were given
-- Not unique per pair: two simultaneous first sends can each create one
CREATE TABLE IF NOT EXISTS conversation_participants (
    conversation_id TEXT NOT NULL REFERENCES conversations(id),
    position INTEGER NOT NULL,
    user_id TEXT NOT NULL,
    PRIMARY KEY (conversation_id, position)
);
CREATE INDEX IF NOT EXISTS idx_participants_user ON conversation_participants(user_id);

-- Ordered message references (send order)
CREATE TABLE IF NOT EXISTS conversation_messages (
    conversation_id TEXT NOT NULL REFERENCES conversations(id),
    position INTEGER NOT NULL,
    message_id TEXT NOT NULL,
    PRIMARY KEY (conversation_id, position)
);

-- Messages table
CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    sender_id TEXT NOT NULL,
    receiver_id TEXT NOT NULL,
    body TEXT NOT NULL,
    -- 'sent', 'delivered' or 'read'
    status TEXT NOT NULL DEFAULT 'sent',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
"#;
