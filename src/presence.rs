//! Presence tracking and real-time push.
//!
//! Tracks which users hold a live socket and delivers events to them. The
//! registry is concurrent (DashMap) and shared by every request.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::protocol::ServerEvent;

/// A connected client's sender channel.
pub type ClientSender = mpsc::UnboundedSender<ServerEvent>;

/// A live connection for one user.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub user_id: String,
    /// Unique per socket, so a reconnect can be told apart from the socket it replaced.
    pub connection_id: String,
    sender: ClientSender,
}

impl ConnectionHandle {
    pub fn new(user_id: &str, sender: ClientSender) -> Self {
        Self {
            user_id: user_id.to_string(),
            connection_id: Uuid::new_v4().to_string(),
            sender,
        }
    }

    /// Queue an event on this connection. Returns false if the socket is gone.
    pub fn send(&self, event: ServerEvent) -> bool {
        self.sender.send(event).is_ok()
    }
}

/// Discovers reachable users and pushes events to them.
#[async_trait]
pub trait PresenceNotifier: Send + Sync {
    /// The user's live connection, if they have one.
    async fn lookup_connection(&self, user_id: &str) -> Option<ConnectionHandle>;

    /// Push an event. Fire-and-forget: returns false if the connection had
    /// already closed.
    async fn emit(&self, connection: &ConnectionHandle, event: ServerEvent) -> bool;
}

/// User id → live connection for locally connected clients.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<DashMap<String, ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for a user. A newer connection replaces any
    /// existing one for the same user.
    pub fn register(&self, user_id: &str, sender: ClientSender) -> ConnectionHandle {
        let handle = ConnectionHandle::new(user_id, sender);
        if let Some(previous) = self.connections.insert(user_id.to_string(), handle.clone()) {
            tracing::debug!(
                user_id = user_id,
                replaced = previous.connection_id.as_str(),
                "Replaced existing connection"
            );
        }
        tracing::info!(
            user_id = user_id,
            connection_id = handle.connection_id.as_str(),
            "Client registered"
        );
        handle
    }

    /// Remove a connection. A no-op if the user has since reconnected on a
    /// different socket.
    pub fn unregister(&self, handle: &ConnectionHandle) {
        let removed = self
            .connections
            .remove_if(&handle.user_id, |_, current| {
                current.connection_id == handle.connection_id
            })
            .is_some();

        if removed {
            tracing::info!(user_id = handle.user_id.as_str(), "Client unregistered");
        }
    }

    pub fn online_count(&self) -> usize {
        self.connections.len()
    }

    /// Connected user ids, sorted.
    pub fn online_users(&self) -> Vec<String> {
        let mut users: Vec<String> = self
            .connections
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        users.sort();
        users
    }
}

#[async_trait]
impl PresenceNotifier for ConnectionRegistry {
    async fn lookup_connection(&self, user_id: &str) -> Option<ConnectionHandle> {
        self.connections.get(user_id).map(|entry| entry.value().clone())
    }

    async fn emit(&self, connection: &ConnectionHandle, event: ServerEvent) -> bool {
        let name = event.name();
        let sent = connection.send(event);
        if !sent {
            tracing::debug!(
                user_id = connection.user_id.as_str(),
                event = name,
                "Connection closed before event could be pushed"
            );
        }
        sent
    }
}
