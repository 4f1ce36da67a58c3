//! In-memory document store.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use super::DocumentStore;
use crate::error::Result;
use crate::model::{Conversation, Message, ParticipantQuery};

/// DashMap-backed store. Contents are lost on restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
    /// Conversation id → conversation.
    conversations: Arc<DashMap<String, Conversation>>,
    /// Message id → message.
    messages: Arc<DashMap<String, Message>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_conversation(&self, query: &ParticipantQuery) -> Result<Option<Conversation>> {
        // Oldest match wins when the get-or-create race left duplicates.
        Ok(self
            .conversations
            .iter()
            .filter(|entry| query.matches(entry.value()))
            .min_by_key(|entry| entry.value().created_at)
            .map(|entry| entry.value().clone()))
    }

    async fn create_conversation(&self, conversation: &Conversation) -> Result<()> {
        self.conversations
            .insert(conversation.id.clone(), conversation.clone());
        Ok(())
    }

    async fn save_conversation(&self, conversation: &Conversation) -> Result<()> {
        self.conversations
            .insert(conversation.id.clone(), conversation.clone());
        Ok(())
    }

    async fn save_message(&self, message: &Message) -> Result<()> {
        self.messages.insert(message.id.clone(), message.clone());
        Ok(())
    }

    async fn find_message(&self, id: &str) -> Result<Option<Message>> {
        Ok(self.messages.get(id).map(|m| m.value().clone()))
    }

    async fn populate_messages(&self, ids: &[String]) -> Result<Vec<Message>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.messages.get(id).map(|m| m.value().clone()))
            .collect())
    }
}
