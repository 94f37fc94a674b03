//! Key-value persistence layer
//!
//! Stores are persisted as whole JSON values under string keys. The backend
//! is picked once at startup from [`StorageConfig`] and handed to every
//! store as an `Arc<dyn KeyValueStore>`.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::config::{StorageBackend, StorageConfig};

pub mod file;
pub mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Persistence errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// IO error reading or writing the backing files
    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored value is not valid JSON
    #[error("Invalid JSON for key '{key}': {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Key cannot be mapped onto the backend
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// Backend refused the operation
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Asynchronous get/set of named JSON values
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, `None` when absent
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Replace the value stored under `key`
    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;

    /// Backend name, for logs
    fn name(&self) -> &str;
}

/// Open the backend selected by configuration
pub async fn open_backend(config: &StorageConfig) -> Result<Arc<dyn KeyValueStore>, StorageError> {
    let store: Arc<dyn KeyValueStore> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::File => Arc::new(JsonFileStore::open(&config.data_dir).await?),
    };
    info!("Using {} storage backend", store.name());
    Ok(store)
}
