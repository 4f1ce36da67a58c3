//! Message REST API handlers.
//!
//! Mounted under `/api/messages`. Every route requires an authenticated user.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::auth::AuthenticatedUser;
use crate::error::{Error, Result};
use crate::state::AppState;

// ── Request Types ────────────────────────────────────────────────────────────

/// POST /api/messages/send/:id
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
}

// ── Routes ───────────────────────────────────────────────────────────────────

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/:id", get(get_messages))
        .route("/send/:id", post(send_message))
        .route("/read/:message_id", put(mark_message_read))
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /api/messages/:id: History between the caller and user `id`.
///
/// Returns an empty array when the two have never talked.
pub async fn get_messages(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(other_user_id): Path<String>,
) -> Result<impl IntoResponse> {
    let messages = state.history.get_history(&user_id, &other_user_id).await?;
    Ok(Json(messages))
}

/// POST /api/messages/send/:id: Send a message to user `id`.
///
/// A missing or malformed JSON body is an `InvalidMessage`.
pub async fn send_message(
    State(state): State<AppState>,
    AuthenticatedUser(sender_id): AuthenticatedUser,
    Path(receiver_id): Path<String>,
    body: std::result::Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(req) = body.map_err(|rejection| Error::InvalidMessage(rejection.body_text()))?;
    let message = state
        .messages
        .send(&sender_id, &receiver_id, &req.message)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// PUT /api/messages/read/:message_id: Mark a message read.
///
/// Only the message's receiver may do this.
pub async fn mark_message_read(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(message_id): Path<String>,
) -> Result<impl IntoResponse> {
    state.messages.mark_read(&message_id, &user_id).await?;
    Ok(Json(json!({ "message": "Message marked as read" })))
}
