//! WebSocket connection handler.
//!
//! Holds a client's socket open so events can be pushed to it. The socket is
//! receive-only from the client's point of view apart from registration and
//! keepalive; messages are sent over HTTP.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::protocol::{ClientMessage, ServerEvent};
use crate::state::AppState;

fn encode(event: &ServerEvent) -> Option<String> {
    match serde_json::to_string(event) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::error!("Failed to serialize server event: {}", e);
            None
        }
    }
}

/// Handle a single WebSocket connection.
///
/// This function runs for the lifetime of the connection:
/// 1. Waits for a `Register` message to associate the connection with a user
/// 2. Spawns a sender task to forward pushed events
/// 3. Processes incoming frames until the connection closes
pub async fn handle_websocket(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // ── Step 1: Wait for Registration ─────────────────────────────────────

    let user_id = loop {
        let reply = match ws_receiver.next().await {
            Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Register { user_id }) if !user_id.trim().is_empty() => {
                    break user_id.trim().to_string();
                }
                Ok(ClientMessage::Register { .. }) => ServerEvent::Error {
                    message: "Invalid user id".to_string(),
                },
                Ok(ClientMessage::Ping) => ServerEvent::Pong,
                Err(e) => {
                    tracing::warn!("Failed to parse client message: {}", e);
                    ServerEvent::Error {
                        message: format!("Invalid message format: {}", e),
                    }
                }
            },
            Some(Ok(Message::Ping(data))) => {
                let _ = ws_sender.send(Message::Pong(data)).await;
                continue;
            }
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => {
                return; // Connection closed before registration
            }
            _ => continue,
        };

        if let Some(json) = encode(&reply) {
            if ws_sender.send(Message::Text(json)).await.is_err() {
                return;
            }
        }
    };

    // ── Step 2: Register Client ───────────────────────────────────────────

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    let handle = state.connections.register(&user_id, tx);
    handle.send(ServerEvent::Registered {
        user_id: user_id.clone(),
    });

    // ── Step 3: Spawn Sender Task ─────────────────────────────────────────

    let sender_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Some(json) = encode(&event) {
                if ws_sender.send(Message::Text(json)).await.is_err() {
                    break; // Connection closed
                }
            }
        }
    });

    // ── Step 4: Process Frames ────────────────────────────────────────────

    while let Some(frame) = ws_receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Ping) => {
                    handle.send(ServerEvent::Pong);
                }
                Ok(ClientMessage::Register { .. }) => {
                    handle.send(ServerEvent::Error {
                        message: "Already registered".to_string(),
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        user_id = user_id.as_str(),
                        error = %e,
                        "Failed to parse client message"
                    );
                    handle.send(ServerEvent::Error {
                        message: format!("Invalid message format: {}", e),
                    });
                }
            },
            Ok(Message::Close(_)) => {
                tracing::info!(user_id = user_id.as_str(), "Client sent close frame");
                break;
            }
            Err(e) => {
                tracing::warn!(user_id = user_id.as_str(), error = %e, "WebSocket error");
                break;
            }
            _ => {} // Binary, Ping, Pong
        }
    }

    // ── Step 5: Cleanup ───────────────────────────────────────────────────

    state.connections.unregister(&handle);
    sender_task.abort();
    tracing::info!(user_id = user_id.as_str(), "WebSocket disconnected");
}
