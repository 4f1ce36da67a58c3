//! Conversation directory.
//!
//! Maps an unordered pair of users to their single conversation, creating it
//! on first use.

use std::sync::Arc;

use crate::error::Result;
use crate::model::{Conversation, ParticipantQuery};
use crate::storage::DocumentStore;

#[derive(Clone)]
pub struct ConversationDirectory {
    store: Arc<dyn DocumentStore>,
}

impl ConversationDirectory {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Return the conversation whose participant set is `{user_a, user_b}`,
    /// creating and persisting `[user_a, user_b]` if there is none.
    ///
    /// Check-then-create is not atomic: two first messages racing for the
    /// same pair can each create a conversation.
    pub async fn find_or_create(&self, user_a: &str, user_b: &str) -> Result<Conversation> {
        if let Some(conversation) = self
            .store
            .find_conversation(&ParticipantQuery::members_of(user_a, user_b))
            .await?
        {
            return Ok(conversation);
        }

        let conversation = Conversation::new(user_a, user_b);
        self.store.create_conversation(&conversation).await?;
        tracing::info!(
            conversation_id = conversation.id.as_str(),
            user_a = user_a,
            user_b = user_b,
            "Created conversation"
        );
        Ok(conversation)
    }

    /// The one-on-one conversation between two users, if any. Conversations
    /// with more than two participants never match.
    pub async fn find_pair(&self, user_a: &str, user_b: &str) -> Result<Option<Conversation>> {
        self.store
            .find_conversation(&ParticipantQuery::exact_pair(user_a, user_b))
            .await
    }
}
