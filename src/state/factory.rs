use crate::config::{StateBackend, StateConfig};
use crate::error::{AppError, Result};
use crate::state::{InMemoryStore, SledStore, TicketStore};
use std::sync::Arc;

/// Create a ticket store based on configuration
pub async fn create_store(config: &StateConfig) -> Result<Arc<dyn TicketStore>> {
    match config.backend {
        StateBackend::Sled => {
            let path = config.path.as_ref().ok_or_else(|| {
                AppError::Configuration("Sled backend requires 'path' configuration".to_string())
            })?;

            tracing::info!(path = ?path, "Initializing Sled storage backend");

            let store = SledStore::new(path)?;
            Ok(Arc::new(store))
        }

        StateBackend::Memory => {
            tracing::info!("Initializing in-memory storage backend");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}
