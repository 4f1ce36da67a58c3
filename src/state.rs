//! Server state management.
//!
//! Owns the document store and the connection registry, and the services
//! built on top of them. Cloned into every handler.

use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::directory::ConversationDirectory;
use crate::error::Result;
use crate::history::ConversationQuery;
use crate::messages::MessageService;
use crate::presence::ConnectionRegistry;
use crate::storage::{DocumentStore, MemoryStore, SqliteStore};

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub config: ServiceConfig,
    /// User id → live socket, for presence checks and push.
    pub connections: ConnectionRegistry,
    pub messages: MessageService,
    pub history: ConversationQuery,
}

impl AppState {
    /// Build state around an existing store.
    pub fn new(config: ServiceConfig, store: Arc<dyn DocumentStore>) -> Self {
        let connections = ConnectionRegistry::new();
        let directory = ConversationDirectory::new(store.clone());
        let messages = MessageService::new(
            store.clone(),
            directory.clone(),
            Arc::new(connections.clone()),
        );
        let history = ConversationQuery::new(store, directory);

        Self {
            config,
            connections,
            messages,
            history,
        }
    }

    /// Build state with the store selected by the configuration: SQLite when
    /// a database path is set, in-memory otherwise.
    pub fn open(config: ServiceConfig) -> Result<Self> {
        let store: Arc<dyn DocumentStore> = match config.database_path.as_deref() {
            Some(path) => {
                tracing::info!(path = path, "Using SQLite store");
                Arc::new(SqliteStore::open(Some(path))?)
            }
            None => {
                tracing::info!("No database path configured, running in-memory only");
                Arc::new(MemoryStore::new())
            }
        };
        Ok(Self::new(config, store))
    }
}
