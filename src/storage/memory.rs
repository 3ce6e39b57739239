use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::{error::Result, storage::StorageBackend};

/// Process-local storage; contents are lost on exit.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: Arc<RwLock<HashMap<String, serde_json::Value>>>,
    write_lock: Arc<Mutex<()>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    fn write_lock(&self) -> &Mutex<()> {
        &self.write_lock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_remove() {
        let storage = MemoryStorage::new();
        assert!(storage.is_empty().await);

        storage.set("rag-files", serde_json::json!([1, 2])).await.unwrap();
        assert_eq!(storage.len().await, 1);
        assert_eq!(storage.get("rag-files").await.unwrap(), Some(serde_json::json!([1, 2])));

        let shared = storage.clone();
        shared.remove("rag-files").await.unwrap();
        assert!(storage.get("rag-files").await.unwrap().is_none());
    }
}
