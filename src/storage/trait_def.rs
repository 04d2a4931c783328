use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("stored value under '{key}' is not valid JSON: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Local key-value store holding the serialized registry collections.
///
/// Writes are last-write-wins per key; there is no transaction spanning
/// several keys.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Initialize the store (create tables, directories, etc.)
    async fn init(&self) -> Result<()>;

    /// Read the raw value under `key`
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Replace the value under `key`
    async fn put(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove `key`; removing a missing key is not an error
    async fn remove(&self, key: &str) -> StorageResult<()>;
}
