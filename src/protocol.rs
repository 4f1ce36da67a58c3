//! Real-time protocol message definitions.
//!
//! Clients hold a WebSocket open to receive pushed events. Server events are
//! JSON objects of the form `{"event": "<name>", "data": {...}}`.

use serde::{Deserialize, Serialize};

use crate::model::Message;

// ── Client → Server ───────────────────────────────────────────────────────────

/// Messages sent from a client over the socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Associate this connection with a user id.
    /// Must be sent first after connecting.
    Register { user_id: String },

    /// Keep the connection alive.
    Ping,
}

// ── Server → Client ───────────────────────────────────────────────────────────

/// Events pushed from the server to a connected client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// A message addressed to this user.
    NewMessage(Message),

    /// A message this user sent reached an online receiver.
    #[serde(rename_all = "camelCase")]
    MessageDelivered { message_id: String },

    /// A message this user sent was read by its receiver.
    #[serde(rename_all = "camelCase")]
    MessageRead { message_id: String },

    /// Registration acknowledgement.
    #[serde(rename_all = "camelCase")]
    Registered { user_id: String },

    Pong,

    Error { message: String },
}

impl ServerEvent {
    /// Event name as seen on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::NewMessage(_) => "newMessage",
            ServerEvent::MessageDelivered { .. } => "messageDelivered",
            ServerEvent::MessageRead { .. } => "messageRead",
            ServerEvent::Registered { .. } => "registered",
            ServerEvent::Pong => "pong",
            ServerEvent::Error { .. } => "error",
        }
    }
}
