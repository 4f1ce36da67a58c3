//! # SQLite Store
//!
//! `rusqlite` backend for the document store. A single connection behind a
//! mutex; every method takes the lock for one short synchronous section.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use super::schema;
use super::DocumentStore;
use crate::error::{Error, Result};
use crate::model::{Conversation, Message, MessageStatus, ParticipantQuery};

/// SQLite-backed store.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create a database.
    ///
    /// If path is None, creates an in-memory database (useful for testing).
    pub fn open(path: Option<&str>) -> Result<Self> {
        let conn = match path {
            Some(p) => Connection::open(p)
                .map_err(|e| Error::Database(format!("Failed to open database: {}", e)))?,
            None => Connection::open_in_memory().map_err(|e| {
                Error::Database(format!("Failed to create in-memory database: {}", e))
            })?,
        };

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        let version: Option<i32> = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .ok();

        match version {
            None => {
                conn.execute_batch(schema::CREATE_TABLES)
                    .map_err(|e| Error::Database(format!("Failed to create tables: {}", e)))?;
                conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?)",
                    params![schema::SCHEMA_VERSION],
                )
                .map_err(|e| Error::Database(format!("Failed to set schema version: {}", e)))?;

                tracing::info!("Database schema created (version {})", schema::SCHEMA_VERSION);
            }
            Some(v) => {
                tracing::debug!("Database schema version: {}", v);
            }
        }

        Ok(())
    }
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| Error::Storage(format!("Timestamp out of range: {}", ms)))
}

fn load_conversation(
    conn: &Connection,
    id: String,
    created_at: i64,
    updated_at: i64,
) -> Result<Conversation> {
    let mut stmt = conn
        .prepare(
            "SELECT user_id FROM conversation_participants
             WHERE conversation_id = ? ORDER BY position",
        )
        .map_err(|e| Error::Database(format!("Failed to prepare query: {}", e)))?;
    let participants = stmt
        .query_map(params![id], |row| row.get::<_, String>(0))
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
        .map_err(|e| Error::Database(format!("Failed to read participants: {}", e)))?;

    let mut stmt = conn
        .prepare(
            "SELECT message_id FROM conversation_messages
             WHERE conversation_id = ? ORDER BY position",
        )
        .map_err(|e| Error::Database(format!("Failed to prepare query: {}", e)))?;
    let messages = stmt
        .query_map(params![id], |row| row.get::<_, String>(0))
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
        .map_err(|e| Error::Database(format!("Failed to read message references: {}", e)))?;

    Ok(Conversation {
        id,
        participants,
        messages,
        created_at: from_millis(created_at)?,
        updated_at: from_millis(updated_at)?,
    })
}

type MessageRow = (String, String, String, String, String, i64, i64);

fn message_from_row(row: MessageRow) -> Result<Message> {
    let (id, sender_id, receiver_id, body, status, created_at, updated_at) = row;
    let status = MessageStatus::parse(&status)
        .ok_or_else(|| Error::Storage(format!("Unknown status '{}' on message {}", status, id)))?;
    Ok(Message {
        id,
        sender_id,
        receiver_id,
        body,
        status,
        created_at: from_millis(created_at)?,
        updated_at: from_millis(updated_at)?,
    })
}

fn read_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn write_conversation(conn: &Connection, conversation: &Conversation) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO conversations (id, created_at, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET updated_at = excluded.updated_at",
        params![
            conversation.id,
            conversation.created_at.timestamp_millis(),
            conversation.updated_at.timestamp_millis(),
        ],
    )?;

    conn.execute(
        "DELETE FROM conversation_participants WHERE conversation_id = ?",
        params![conversation.id],
    )?;
    for (position, user_id) in conversation.participants.iter().enumerate() {
        conn.execute(
            "INSERT INTO conversation_participants (conversation_id, position, user_id)
             VALUES (?, ?, ?)",
            params![conversation.id, position as i64, user_id],
        )?;
    }

    conn.execute(
        "DELETE FROM conversation_messages WHERE conversation_id = ?",
        params![conversation.id],
    )?;
    for (position, message_id) in conversation.messages.iter().enumerate() {
        conn.execute(
            "INSERT INTO conversation_messages (conversation_id, position, message_id)
             VALUES (?, ?, ?)",
            params![conversation.id, position as i64, message_id],
        )?;
    }

    Ok(())
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn find_conversation(&self, query: &ParticipantQuery) -> Result<Option<Conversation>> {
        let users: BTreeSet<&str> = query.members.iter().map(String::as_str).collect();
        let n = users.len();

        let mut values: Vec<Value> = users.iter().map(|u| Value::Text(u.to_string())).collect();
        values.push(Value::Integer(n as i64));
        values.push(match query.size {
            Some(size) => Value::Integer(size as i64),
            None => Value::Null,
        });

        // Every member present, and nobody outside the member set.
        let membership = if n == 0 {
            "NOT EXISTS (SELECT 1 FROM conversation_participants p
                         WHERE p.conversation_id = c.id)"
                .to_string()
        } else {
            let placeholders: Vec<String> = (1..=n).map(|i| format!("?{}", i)).collect();
            let placeholders = placeholders.join(", ");
            format!(
                "(SELECT COUNT(DISTINCT p.user_id) FROM conversation_participants p
                  WHERE p.conversation_id = c.id AND p.user_id IN ({list})) = ?{count}
                 AND NOT EXISTS (SELECT 1 FROM conversation_participants p
                  WHERE p.conversation_id = c.id AND p.user_id NOT IN ({list}))",
                list = placeholders,
                count = n + 1
            )
        };
        let sql = format!(
            "SELECT c.id, c.created_at, c.updated_at FROM conversations c
             WHERE {membership}
               AND (?{size} IS NULL OR
                    (SELECT COUNT(*) FROM conversation_participants p
                     WHERE p.conversation_id = c.id) = ?{size})
             ORDER BY c.created_at, c.rowid LIMIT 1",
            membership = membership,
            size = n + 2,
        );

        let conn = self.conn.lock();
        let row: Option<(String, i64, i64)> = conn
            .query_row(&sql, params_from_iter(values), |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .optional()
            .map_err(|e| Error::Database(format!("Failed to find conversation: {}", e)))?;

        match row {
            Some((id, created_at, updated_at)) => {
                Ok(Some(load_conversation(&conn, id, created_at, updated_at)?))
            }
            None => Ok(None),
        }
    }

    async fn create_conversation(&self, conversation: &Conversation) -> Result<()> {
        self.save_conversation(conversation).await
    }

    async fn save_conversation(&self, conversation: &Conversation) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| Error::Database(format!("Failed to begin transaction: {}", e)))?;
        write_conversation(&tx, conversation)
            .map_err(|e| Error::Database(format!("Failed to save conversation: {}", e)))?;
        tx.commit()
            .map_err(|e| Error::Database(format!("Failed to commit conversation: {}", e)))?;
        Ok(())
    }

    async fn save_message(&self, message: &Message) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO messages (id, sender_id, receiver_id, body, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET status = excluded.status, updated_at = excluded.updated_at",
            params![
                message.id,
                message.sender_id,
                message.receiver_id,
                message.body,
                message.status.as_str(),
                message.created_at.timestamp_millis(),
                message.updated_at.timestamp_millis(),
            ],
        )
        .map_err(|e| Error::Database(format!("Failed to save message: {}", e)))?;
        Ok(())
    }

    async fn find_message(&self, id: &str) -> Result<Option<Message>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT id, sender_id, receiver_id, body, status, created_at, updated_at
                 FROM messages WHERE id = ?",
                params![id],
                read_message_row,
            )
            .optional()
            .map_err(|e| Error::Database(format!("Failed to get message: {}", e)))?;

        row.map(message_from_row).transpose()
    }

    async fn populate_messages(&self, ids: &[String]) -> Result<Vec<Message>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, sender_id, receiver_id, body, status, created_at, updated_at
                 FROM messages WHERE id = ?",
            )
            .map_err(|e| Error::Database(format!("Failed to prepare query: {}", e)))?;

        let mut messages = Vec::with_capacity(ids.len());
        for id in ids {
            let row = stmt
                .query_row(params![id], read_message_row)
                .optional()
                .map_err(|e| Error::Database(format!("Failed to read message: {}", e)))?;
            if let Some(row) = row {
                messages.push(message_from_row(row)?);
            }
        }
        Ok(messages)
    }
}
