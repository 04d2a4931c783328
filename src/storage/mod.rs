pub mod file;
pub mod memory;
pub mod sqlite;
pub mod state;
pub mod trait_def;

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};

pub use file::FileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use state::{load_registry, save_registry, CLIENTS_KEY, LEVELS_KEY, SPACES_KEY};
pub use trait_def::{StateStore, StorageError, StorageResult};

/// Open and initialize the configured store.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn StateStore>> {
    let store: Arc<dyn StateStore> = match config.backend {
        StorageBackend::File => {
            tracing::info!("Using file storage: {}", config.state_dir);
            Arc::new(FileStore::new(&config.state_dir))
        }
        StorageBackend::Sqlite => {
            tracing::info!("Using SQLite storage: {}", config.database_url);
            Arc::new(
                SqliteStore::new(&config.database_url, config.max_connections)
                    .await
                    .context("failed to open SQLite store")?,
            )
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, state is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };
    store.init().await?;
    Ok(store)
}
