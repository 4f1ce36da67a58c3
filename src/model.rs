//! Conversation and message records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery status of a message.
///
/// ```text
/// sent ──(receiver online)──► delivered ──(receiver reads)──► read
///   └──────────────────(receiver reads)─────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Read,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Read => "read",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sent" => Some(MessageStatus::Sent),
            "delivered" => Some(MessageStatus::Delivered),
            "read" => Some(MessageStatus::Read),
            _ => None,
        }
    }
}

/// A direct message between two users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    #[serde(rename = "message")]
    pub body: String,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    /// Create a new message in the `sent` state.
    pub fn new(sender_id: &str, receiver_id: &str, body: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            body: body.to_string(),
            status: MessageStatus::Sent,
            created_at: now,
            updated_at: now,
        }
    }

    /// Advance `sent` to `delivered`. Returns false if the message was
    /// already delivered or read.
    pub fn mark_delivered(&mut self) -> bool {
        if self.status != MessageStatus::Sent {
            return false;
        }
        self.status = MessageStatus::Delivered;
        self.updated_at = Utc::now();
        true
    }

    /// Set the status to `read`. Reachable from any state.
    pub fn mark_read(&mut self) {
        self.status = MessageStatus::Read;
        self.updated_at = Utc::now();
    }

    /// Whether this message was exchanged between exactly `a` and `b`,
    /// in either direction.
    pub fn is_between(&self, a: &str, b: &str) -> bool {
        (self.sender_id == a && self.receiver_id == b)
            || (self.sender_id == b && self.receiver_id == a)
    }
}

/// A one-to-one conversation and its ordered message references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    /// Participant user ids in creation order.
    pub participants: Vec<String>,
    /// Message ids in send order.
    pub messages: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(user_a: &str, user_b: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            participants: vec![user_a.to_string(), user_b.to_string()],
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn push_message(&mut self, message_id: &str) {
        self.messages.push(message_id.to_string());
        self.updated_at = Utc::now();
    }
}

/// Predicate used to look up conversations by membership.
///
/// A conversation matches when its participants, taken as a set, equal
/// `members` taken as a set. `[alice, alice]` only matches alice's
/// self-conversation, never one she shares with someone else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantQuery {
    pub members: Vec<String>,
    /// If set, the conversation must have exactly this many participants.
    pub size: Option<usize>,
}

impl ParticipantQuery {
    /// Conversations whose participant set is `{user_a, user_b}`.
    pub fn members_of(user_a: &str, user_b: &str) -> Self {
        Self {
            members: vec![user_a.to_string(), user_b.to_string()],
            size: None,
        }
    }

    /// One-on-one conversations between the two users.
    pub fn exact_pair(user_a: &str, user_b: &str) -> Self {
        Self {
            size: Some(2),
            ..Self::members_of(user_a, user_b)
        }
    }

    pub fn matches(&self, conversation: &Conversation) -> bool {
        if let Some(size) = self.size {
            if conversation.participants.len() != size {
                return false;
            }
        }
        self.members
            .iter()
            .all(|user| conversation.participants.contains(user))
            && conversation
                .participants
                .iter()
                .all(|user| self.members.contains(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_message_is_sent() {
        let msg = Message::new("alice", "bob", "hi");
        assert_eq!(msg.status, MessageStatus::Sent);
        assert_eq!(msg.created_at, msg.updated_at);
    }

    #[test]
    fn test_status_never_regresses() {
        let mut msg = Message::new("alice", "bob", "hi");
        assert!(msg.mark_delivered());
        assert!(!msg.mark_delivered());

        msg.mark_read();
        assert!(!msg.mark_delivered());
        assert_eq!(msg.status, MessageStatus::Read);
    }

    #[test]
    fn test_sent_to_read_directly() {
        let mut msg = Message::new("alice", "bob", "hi");
        msg.mark_read();
        assert_eq!(msg.status, MessageStatus::Read);
    }

    #[test]
    fn test_message_wire_shape() {
        let msg = Message::new("alice", "bob", "hello");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["senderId"], "alice");
        assert_eq!(json["receiverId"], "bob");
        assert_eq!(json["message"], "hello");
        assert_eq!(json["status"], "sent");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("body").is_none());
    }

    #[test]
    fn test_is_between() {
        let msg = Message::new("alice", "bob", "hi");
        assert!(msg.is_between("alice", "bob"));
        assert!(msg.is_between("bob", "alice"));
        assert!(!msg.is_between("alice", "carol"));
        assert!(!msg.is_between("alice", "alice"));
    }

    #[test]
    fn test_participant_query() {
        let mut convo = Conversation::new("alice", "bob");
        assert!(ParticipantQuery::members_of("bob", "alice").matches(&convo));
        assert!(ParticipantQuery::exact_pair("bob", "alice").matches(&convo));
        assert!(!ParticipantQuery::members_of("alice", "carol").matches(&convo));

        convo.participants.push("carol".to_string());
        assert!(!ParticipantQuery::members_of("alice", "bob").matches(&convo));
        assert!(!ParticipantQuery::exact_pair("alice", "bob").matches(&convo));
    }

    #[test]
    fn test_self_query_skips_shared_conversation() {
        let shared = Conversation::new("alice", "bob");
        let own = Conversation::new("alice", "alice");

        assert!(!ParticipantQuery::members_of("alice", "alice").matches(&shared));
        assert!(ParticipantQuery::members_of("alice", "alice").matches(&own));
        assert!(ParticipantQuery::exact_pair("alice", "alice").matches(&own));
        assert!(!ParticipantQuery::members_of("alice", "bob").matches(&own));
    }

    #[test]
    fn test_status_parse() {
        for status in [MessageStatus::Sent, MessageStatus::Delivered, MessageStatus::Read] {
            assert_eq!(MessageStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(MessageStatus::parse("seen"), None);
    }
}
