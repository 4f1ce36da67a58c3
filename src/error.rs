//! # Error Handling
//!
//! Error types for the direct messaging service.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error                                      HTTP                        │
//! │  ├── NotFound         - Message id unknown  404                         │
//! │  ├── Unauthorized     - Not the receiver    403                         │
//! │  ├── InvalidMessage   - Empty or bad body   400                         │
//! │  ├── Database         - SQLite failure      500                         │
//! │  └── Storage          - Other store failure 500                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Server-side failures are logged with full detail but reach the client as
//! a generic `"Internal server error"`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for messaging operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the messaging service
#[derive(Error, Debug)]
pub enum Error {
    /// The requested message does not exist
    #[error("Message not found: {0}")]
    NotFound(String),

    /// The acting user may not perform this operation
    #[error("Unauthorized")]
    Unauthorized,

    /// The message payload was rejected before anything was written
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Non-database store failure (poisoned state, corrupt record)
    #[error("Storage error: {0}")]
    Storage(String),
}

impl Error {
    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Unauthorized => StatusCode::FORBIDDEN,
            Error::InvalidMessage(_) => StatusCode::BAD_REQUEST,
            Error::Database(_) | Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the client
    pub fn user_message(&self) -> String {
        match self {
            Error::NotFound(_) => "Message not found".to_string(),
            Error::Unauthorized => "Unauthorized".to_string(),
            Error::InvalidMessage(msg) => msg.clone(),
            Error::Database(_) | Error::Storage(_) => "Internal server error".to_string(),
        }
    }

    /// Log this error at a level matching its status
    pub fn log(&self) {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Server error occurred");
        } else if status == StatusCode::FORBIDDEN {
            tracing::warn!(error = %self, "Request forbidden");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Client error occurred");
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status_code();
        (status, Json(json!({ "error": self.user_message() }))).into_response()
    }
}
