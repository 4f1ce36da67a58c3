//! # Umbra DM
//!
//! Direct messaging between two users:
//!
//! 1. **Send**: a message is stored in the pair's conversation (created on
//!    first use). If the receiver has a live socket it is pushed to them and
//!    marked `delivered`.
//!
//! 2. **Read receipts**: the receiver marks a message `read`; the sender is
//!    notified if connected.
//!
//! 3. **History**: the full, pair-filtered message list for two users.
//!
//! Authentication is handled upstream; see [`auth`].

pub mod api;
pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod history;
pub mod messages;
pub mod model;
pub mod presence;
pub mod protocol;
pub mod server;
pub mod socket;
pub mod state;
pub mod storage;

pub use config::ServiceConfig;
pub use error::{Error, Result};
pub use model::{Conversation, Message, MessageStatus};
pub use server::router;
pub use state::AppState;
