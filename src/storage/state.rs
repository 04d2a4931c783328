//! Registry persistence as three JSON blobs under fixed keys.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{Client, Level, Space};
use crate::registry::{Registry, RegistrySettings};
use crate::storage::{StateStore, StorageError, StorageResult};

pub const LEVELS_KEY: &str = "alw_subsuelos";
pub const SPACES_KEY: &str = "alw_spaces";
pub const CLIENTS_KEY: &str = "alw_clients";

/// Load the registry. Missing or malformed blobs load as empty collections;
/// an empty registry is seeded with its first level.
pub async fn load_registry(store: &dyn StateStore, settings: RegistrySettings) -> StorageResult<Registry> {
    let levels: Vec<Level> = read_or_default(store, LEVELS_KEY).await?;
    let spaces: BTreeMap<String, Space> = read_or_default(store, SPACES_KEY).await?;
    let clients: BTreeMap<String, Client> = read_or_default(store, CLIENTS_KEY).await?;

    let mut registry = Registry::from_parts(levels, spaces, clients, settings);
    registry.seed_if_empty();
    Ok(registry)
}

/// Write all three collections, one key after the other.
pub async fn save_registry(store: &dyn StateStore, registry: &Registry) -> StorageResult<()> {
    write_json(store, LEVELS_KEY, registry.levels()).await?;
    write_json(store, SPACES_KEY, registry.spaces()).await?;
    write_json(store, CLIENTS_KEY, registry.clients()).await?;
    Ok(())
}

async fn read_or_default<T: DeserializeOwned + Default>(store: &dyn StateStore, key: &str) -> StorageResult<T> {
    let Some(text) = store.get(key).await? else {
        return Ok(T::default());
    };
    match serde_json::from_str(&text) {
        Ok(value) => Ok(value),
        Err(source) => {
            let err = StorageError::Malformed {
                key: key.to_string(),
                source,
            };
            tracing::warn!("Ignoring stored state: {}", err);
            Ok(T::default())
        }
    }
}

async fn write_json<T: Serialize + ?Sized>(store: &dyn StateStore, key: &str, value: &T) -> StorageResult<()> {
    let text = serde_json::to_string(value).map_err(|source| StorageError::Malformed {
        key: key.to_string(),
        source,
    })?;
    store.put(key, &text).await
}
