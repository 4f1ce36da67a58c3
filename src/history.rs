//! Conversation history queries.

use std::sync::Arc;

use crate::directory::ConversationDirectory;
use crate::error::Result;
use crate::model::Message;
use crate::storage::DocumentStore;

#[derive(Clone)]
pub struct ConversationQuery {
    store: Arc<dyn DocumentStore>,
    directory: ConversationDirectory,
}

impl ConversationQuery {
    pub fn new(store: Arc<dyn DocumentStore>, directory: ConversationDirectory) -> Self {
        Self { store, directory }
    }

    /// Messages exchanged between two users, in send order.
    ///
    /// A pair with no conversation yet has an empty history. The reference
    /// list is only trusted as an index: every resolved message is checked
    /// against the pair before it is returned.
    pub async fn get_history(
        &self,
        requester_id: &str,
        other_user_id: &str,
    ) -> Result<Vec<Message>> {
        let Some(conversation) = self.directory.find_pair(requester_id, other_user_id).await? else {
            return Ok(Vec::new());
        };

        let messages = self.store.populate_messages(&conversation.messages).await?;
        let total = messages.len();

        let messages: Vec<Message> = messages
            .into_iter()
            .filter(|m| m.is_between(requester_id, other_user_id))
            .collect();

        if messages.len() != total {
            tracing::warn!(
                conversation_id = conversation.id.as_str(),
                dropped = total - messages.len(),
                "Conversation referenced messages outside its pair"
            );
        }

        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::MessageService;
    use crate::presence::ConnectionRegistry;
    use crate::storage::MemoryStore;

    fn setup() -> (MemoryStore, MessageService, ConversationQuery) {
        let store = MemoryStore::new();
        let shared: Arc<dyn DocumentStore> = Arc::new(store.clone());
        let directory = ConversationDirectory::new(shared.clone());
        let messages = MessageService::new(
            shared.clone(),
            directory.clone(),
            Arc::new(ConnectionRegistry::new()),
        );
        let query = ConversationQuery::new(shared, directory);
        (store, messages, query)
    }

    #[tokio::test]
    async fn test_empty_history_for_new_pair() {
        let (_, _, query) = setup();
        let history = query.get_history("alice", "bob").await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_history_in_send_order() {
        let (_, messages, query) = setup();
        let m1 = messages.send("alice", "bob", "m1").await.unwrap();
        let m2 = messages.send("bob", "alice", "m2").await.unwrap();

        for (a, b) in [("alice", "bob"), ("bob", "alice")] {
            let history = query.get_history(a, b).await.unwrap();
            let ids: Vec<&str> = history.iter().map(|m| m.id.as_str()).collect();
            assert_eq!(ids, vec![m1.id.as_str(), m2.id.as_str()]);
        }
    }

    #[tokio::test]
    async fn test_history_drops_foreign_references() {
        let (store, messages, query) = setup();
        let m1 = messages.send("alice", "bob", "m1").await.unwrap();

        // A message from another pair, wrongly linked into alice/bob
        let stray = Message::new("alice", "carol", "not for bob");
        store.save_message(&stray).await.unwrap();
        let mut convo = query.directory.find_pair("alice", "bob").await.unwrap().unwrap();
        convo.push_message(&stray.id);
        store.save_conversation(&convo).await.unwrap();

        let history = query.get_history("alice", "bob").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, m1.id);
    }

    #[tokio::test]
    async fn test_history_is_isolated_per_pair() {
        let (_, messages, query) = setup();
        messages.send("alice", "bob", "to bob").await.unwrap();
        messages.send("alice", "carol", "to carol").await.unwrap();

        let history = query.get_history("alice", "carol").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].body, "to carol");
    }
}
