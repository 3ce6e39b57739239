use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    error::{Error, Result},
    storage::StorageBackend,
};

/// One pretty-printed JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileStorage {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(Error::ConfigError(format!("invalid storage key: {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl StorageBackend for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(&value)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(key, path = %path.display(), "stored");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn write_lock(&self) -> &Mutex<()> {
        &self.write_lock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keys_map_to_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join("nested")).unwrap();

        storage
            .set("bncc-activities", serde_json::json!({ "ok": true }))
            .await
            .unwrap();
        assert!(storage.dir().join("bncc-activities.json").is_file());
        assert!(!storage.dir().join("bncc-activities.json.tmp").exists());
        assert_eq!(
            storage.get("bncc-activities").await.unwrap(),
            Some(serde_json::json!({ "ok": true }))
        );

        storage.remove("bncc-activities").await.unwrap();
        storage.remove("bncc-activities").await.unwrap();
        assert!(storage.get("bncc-activities").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn path_like_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        for key in ["", "../escape", "a/b", "dot.key"] {
            assert!(storage.get(key).await.is_err(), "{key:?}");
        }
    }
}
