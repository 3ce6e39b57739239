pub mod activity_store;
pub mod file;
pub mod memory;

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;

use crate::error::{Error, Result};

pub use activity_store::ActivityStore;
pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Key/value persistence selected once at startup and injected wherever state
/// is saved.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;

    /// Held across a read-modify-write by every store sharing this backend.
    fn write_lock(&self) -> &Mutex<()>;
}

/// Which backend to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    File(PathBuf),
}

pub fn open_storage(kind: &StorageKind) -> Result<Arc<dyn StorageBackend>> {
    Ok(match kind {
        StorageKind::Memory => Arc::new(MemoryStorage::new()),
        StorageKind::File(dir) => Arc::new(FileStorage::open(dir)?),
    })
}

/// Typed read; an absent key yields `default`. A value of the wrong shape is
/// an error and is left untouched in storage.
pub async fn load_or<T>(storage: &dyn StorageBackend, key: &str, default: T) -> Result<T>
where
    T: DeserializeOwned,
{
    let Some(value) = storage.get(key).await? else {
        return Ok(default);
    };
    serde_json::from_value(value).map_err(|e| {
        tracing::error!(key, error = %e, "stored value has an unexpected shape");
        Error::CorruptState {
            key: key.to_string(),
            reason: e.to_string(),
        }
    })
}

pub async fn save<T>(storage: &dyn StorageBackend, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    storage.set(key, serde_json::to_value(value)?).await
}
