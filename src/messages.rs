//! Message sending and the delivery status machine.
//!
//! ```text
//! send(A, B, body)
//!   │
//!   ├─► find_or_create(A, B)
//!   ├─► Message { status: sent }, append id to conversation
//!   ├─► save conversation ║ save message        (concurrent, no rollback)
//!   └─► B online?
//!         ├── yes ─► status = delivered, save
//!         │          push newMessage → B, messageDelivered → A
//!         └── no ──► stays sent
//! ```

use std::sync::Arc;

use crate::directory::ConversationDirectory;
use crate::error::{Error, Result};
use crate::model::Message;
use crate::presence::PresenceNotifier;
use crate::protocol::ServerEvent;
use crate::storage::DocumentStore;

#[derive(Clone)]
pub struct MessageService {
    store: Arc<dyn DocumentStore>,
    directory: ConversationDirectory,
    presence: Arc<dyn PresenceNotifier>,
}

impl MessageService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        directory: ConversationDirectory,
        presence: Arc<dyn PresenceNotifier>,
    ) -> Self {
        Self {
            store,
            directory,
            presence,
        }
    }

    /// Send a message and return it in its final status: `delivered` if the
    /// receiver was connected, otherwise `sent`.
    pub async fn send(&self, sender_id: &str, receiver_id: &str, body: &str) -> Result<Message> {
        if body.trim().is_empty() {
            return Err(Error::InvalidMessage("Message cannot be empty".to_string()));
        }

        let mut conversation = self.directory.find_or_create(sender_id, receiver_id).await?;

        let mut message = Message::new(sender_id, receiver_id, body);
        conversation.push_message(&message.id);

        tokio::try_join!(
            self.store.save_conversation(&conversation),
            self.store.save_message(&message),
        )?;

        tracing::debug!(
            message_id = message.id.as_str(),
            conversation_id = conversation.id.as_str(),
            sender_id = sender_id,
            receiver_id = receiver_id,
            "Stored message"
        );

        let Some(receiver) = self.presence.lookup_connection(receiver_id).await else {
            tracing::debug!(
                message_id = message.id.as_str(),
                receiver_id = receiver_id,
                "Receiver offline, message left as sent"
            );
            return Ok(message);
        };

        if message.mark_delivered() {
            self.store.save_message(&message).await?;
        }

        self.presence
            .emit(&receiver, ServerEvent::NewMessage(message.clone()))
            .await;

        if let Some(sender) = self.presence.lookup_connection(sender_id).await {
            self.presence
                .emit(
                    &sender,
                    ServerEvent::MessageDelivered {
                        message_id: message.id.clone(),
                    },
                )
                .await;
        }

        Ok(message)
    }

    /// Mark a message read on behalf of its receiver and notify the sender.
    pub async fn mark_read(&self, message_id: &str, acting_user_id: &str) -> Result<Message> {
        let mut message = self
            .store
            .find_message(message_id)
            .await?
            .ok_or_else(|| Error::NotFound(message_id.to_string()))?;

        if message.receiver_id != acting_user_id {
            tracing::warn!(
                message_id = message_id,
                user_id = acting_user_id,
                "Non-receiver attempted to mark message read"
            );
            return Err(Error::Unauthorized);
        }

        message.mark_read();
        self.store.save_message(&message).await?;

        if let Some(sender) = self.presence.lookup_connection(&message.sender_id).await {
            self.presence
                .emit(
                    &sender,
                    ServerEvent::MessageRead {
                        message_id: message.id.clone(),
                    },
                )
                .await;
        }

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Conversation, MessageStatus, ParticipantQuery};
    use crate::presence::ConnectionRegistry;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    fn service(store: MemoryStore, registry: ConnectionRegistry) -> MessageService {
        let store: Arc<dyn DocumentStore> = Arc::new(store);
        MessageService::new(
            store.clone(),
            ConversationDirectory::new(store),
            Arc::new(registry),
        )
    }

    fn connect(registry: &ConnectionRegistry, user_id: &str) -> UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        registry.register(user_id, tx);
        rx
    }

    fn drain(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_send_to_offline_receiver_stays_sent() {
        let store = MemoryStore::new();
        let registry = ConnectionRegistry::new();
        let mut alice = connect(&registry, "alice");
        let service = service(store.clone(), registry);

        let msg = service.send("alice", "bob", "hi").await.unwrap();
        assert_eq!(msg.status, MessageStatus::Sent);
        assert!(drain(&mut alice).is_empty());

        let stored = store.find_message(&msg.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Sent);

        let convo = store
            .find_conversation(&ParticipantQuery::members_of("alice", "bob"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(convo.messages, vec![msg.id]);
    }

    #[tokio::test]
    async fn test_send_to_online_receiver_is_delivered() {
        let store = MemoryStore::new();
        let registry = ConnectionRegistry::new();
        let mut alice = connect(&registry, "alice");
        let mut bob = connect(&registry, "bob");
        let service = service(store.clone(), registry);

        let msg = service.send("alice", "bob", "hi").await.unwrap();
        assert_eq!(msg.status, MessageStatus::Delivered);

        let stored = store.find_message(&msg.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Delivered);

        assert_eq!(drain(&mut bob), vec![ServerEvent::NewMessage(msg.clone())]);
        assert_eq!(
            drain(&mut alice),
            vec![ServerEvent::MessageDelivered { message_id: msg.id }]
        );
    }

    #[tokio::test]
    async fn test_send_appends_in_order() {
        let store = MemoryStore::new();
        let service = service(store.clone(), ConnectionRegistry::new());

        let m1 = service.send("alice", "bob", "m1").await.unwrap();
        let m2 = service.send("bob", "alice", "m2").await.unwrap();

        let convo = store
            .find_conversation(&ParticipantQuery::members_of("alice", "bob"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(convo.messages, vec![m1.id, m2.id]);
        assert_eq!(store.conversation_count(), 1);
    }

    #[tokio::test]
    async fn test_self_message_gets_its_own_conversation() {
        let store = MemoryStore::new();
        let service = service(store.clone(), ConnectionRegistry::new());

        let to_bob = service.send("alice", "bob", "hi bob").await.unwrap();
        let to_self = service.send("alice", "alice", "note to self").await.unwrap();

        let ab = store
            .find_conversation(&ParticipantQuery::exact_pair("alice", "bob"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ab.messages, vec![to_bob.id]);

        let own = store
            .find_conversation(&ParticipantQuery::exact_pair("alice", "alice"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(own.messages, vec![to_self.id]);
        assert_eq!(store.conversation_count(), 2);
    }

    #[tokio::test]
    async fn test_send_rejects_empty_body() {
        let store = MemoryStore::new();
        let service = service(store.clone(), ConnectionRegistry::new());

        let err = service.send("alice", "bob", "   ").await.unwrap_err();
        assert!(matches!(err, Error::InvalidMessage(_)));
        assert_eq!(store.conversation_count(), 0);
        assert_eq!(store.message_count(), 0);
    }

    #[tokio::test]
    async fn test_mark_read_by_receiver() {
        let store = MemoryStore::new();
        let registry = ConnectionRegistry::new();
        let service = service(store.clone(), registry.clone());

        let msg = service.send("alice", "bob", "hi").await.unwrap();
        let mut alice = connect(&registry, "alice");

        let read = service.mark_read(&msg.id, "bob").await.unwrap();
        assert_eq!(read.status, MessageStatus::Read);

        let stored = store.find_message(&msg.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Read);
        assert_eq!(
            drain(&mut alice),
            vec![ServerEvent::MessageRead {
                message_id: msg.id.clone()
            }]
        );

        // Repeating is harmless
        let again = service.mark_read(&msg.id, "bob").await.unwrap();
        assert_eq!(again.status, MessageStatus::Read);
    }

    #[tokio::test]
    async fn test_mark_read_by_non_receiver_is_unauthorized() {
        let store = MemoryStore::new();
        let registry = ConnectionRegistry::new();
        let service = service(store.clone(), registry.clone());

        let msg = service.send("alice", "bob", "hi").await.unwrap();
        let mut alice = connect(&registry, "alice");

        for intruder in ["alice", "carol"] {
            let err = service.mark_read(&msg.id, intruder).await.unwrap_err();
            assert!(matches!(err, Error::Unauthorized));
        }

        let stored = store.find_message(&msg.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Sent);
        assert!(drain(&mut alice).is_empty());
    }

    #[tokio::test]
    async fn test_mark_read_unknown_message() {
        let service = service(MemoryStore::new(), ConnectionRegistry::new());
        let err = service.mark_read("nope", "bob").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    /// Store whose message writes always fail.
    struct FailingMessageStore(MemoryStore);

    #[async_trait]
    impl DocumentStore for FailingMessageStore {
        async fn find_conversation(
            &self,
            query: &ParticipantQuery,
        ) -> Result<Option<Conversation>> {
            self.0.find_conversation(query).await
        }
        async fn create_conversation(&self, conversation: &Conversation) -> Result<()> {
            self.0.create_conversation(conversation).await
        }
        async fn save_conversation(&self, conversation: &Conversation) -> Result<()> {
            self.0.save_conversation(conversation).await
        }
        async fn save_message(&self, _message: &Message) -> Result<()> {
            Err(Error::Database("disk full".to_string()))
        }
        async fn find_message(&self, id: &str) -> Result<Option<Message>> {
            self.0.find_message(id).await
        }
        async fn populate_messages(&self, ids: &[String]) -> Result<Vec<Message>> {
            self.0.populate_messages(ids).await
        }
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_and_pushes_nothing() {
        let registry = ConnectionRegistry::new();
        let mut bob = connect(&registry, "bob");
        let store: Arc<dyn DocumentStore> = Arc::new(FailingMessageStore(MemoryStore::new()));
        let service = MessageService::new(
            store.clone(),
            ConversationDirectory::new(store),
            Arc::new(registry),
        );

        let err = service.send("alice", "bob", "hi").await.unwrap_err();
        assert!(matches!(err, Error::Database(_)));
        assert!(drain(&mut bob).is_empty());
    }
}
