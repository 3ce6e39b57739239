use std::{path::Path, sync::Arc};

use tracing::{info, warn};

use crate::{
    document::data_url,
    error::{Error, Result},
    models::{
        DocumentStatus, UploadedDocument,
        document::media_type_for_extension,
    },
    storage::{StorageBackend, load_or, save},
};

pub const FILES_KEY: &str = "rag-files";
pub const SELECTION_KEY: &str = "rag-selected-files";

/// Supporting documents and which of them feed the next generation.
pub struct DocumentLibrary {
    storage: Arc<dyn StorageBackend>,
}

impl DocumentLibrary {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    pub async fn list(&self) -> Result<Vec<UploadedDocument>> {
        load_or(self.storage.as_ref(), FILES_KEY, Vec::new()).await
    }

    pub async fn filter_by_status(
        &self,
        status: Option<DocumentStatus>,
    ) -> Result<Vec<UploadedDocument>> {
        let mut documents = self.list().await?;
        if let Some(status) = status {
            documents.retain(|d| d.status == status);
        }
        Ok(documents)
    }

    pub async fn selected_ids(&self) -> Result<Vec<String>> {
        load_or(self.storage.as_ref(), SELECTION_KEY, Vec::new()).await
    }

    /// Add a document from bytes already in memory.
    pub async fn upload(
        &self,
        name: &str,
        media_type: &str,
        bytes: &[u8],
    ) -> Result<UploadedDocument> {
        let document = UploadedDocument::ready(name, media_type, data_url::encode(media_type, bytes));
        self.push(document.clone()).await?;
        info!(document = %document.name, media_type, bytes = bytes.len(), "document uploaded");
        Ok(document)
    }

    /// Add a document read from disk. The entry is stored as pending first and
    /// ends up ready or failed; a read failure is recorded, not returned.
    pub async fn upload_path(
        &self,
        path: &Path,
        media_type: Option<&str>,
    ) -> Result<UploadedDocument> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let media_type = media_type
            .map(str::to_string)
            .or_else(|| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .and_then(media_type_for_extension)
                    .map(str::to_string)
            })
            .unwrap_or_default();

        let mut document = UploadedDocument::pending(name, media_type.clone());
        self.push(document.clone()).await?;

        match tokio::fs::read(path).await {
            Ok(bytes) => document.mark_ready(data_url::encode(&media_type, &bytes)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read document");
                document.mark_failed(format!("Falha ao ler o arquivo: {e}"));
            }
        }
        self.replace(document.clone()).await?;
        Ok(document)
    }

    pub async fn remove(&self, id: &str) -> Result<bool> {
        let _guard = self.storage.write_lock().lock().await;
        let mut documents = self.list().await?;
        let before = documents.len();
        documents.retain(|d| d.id != id);
        let removed = documents.len() != before;
        if removed {
            save(self.storage.as_ref(), FILES_KEY, &documents).await?;
        }
        let mut selected = self.selected_ids().await?;
        selected.retain(|s| s != id);
        save(self.storage.as_ref(), SELECTION_KEY, &selected).await?;
        Ok(removed)
    }

    pub async fn clear(&self) -> Result<()> {
        let _guard = self.storage.write_lock().lock().await;
        self.storage.remove(FILES_KEY).await?;
        self.storage.remove(SELECTION_KEY).await
    }

    /// Flip selection of one document; returns whether it is now selected.
    pub async fn toggle_selection(&self, id: &str) -> Result<bool> {
        let _guard = self.storage.write_lock().lock().await;
        if !self.list().await?.iter().any(|d| d.id == id) {
            return Err(Error::NotFound(format!("document {id}")));
        }
        let mut selected = self.selected_ids().await?;
        let now_selected = match selected.iter().position(|s| s == id) {
            Some(pos) => {
                selected.remove(pos);
                false
            }
            None => {
                selected.push(id.to_string());
                true
            }
        };
        save(self.storage.as_ref(), SELECTION_KEY, &selected).await?;
        Ok(now_selected)
    }

    /// Owned copy of the selected, ready documents in library order. This is
    /// what one generation request reads.
    pub async fn selected_snapshot(&self) -> Result<Vec<UploadedDocument>> {
        let selected = self.selected_ids().await?;
        let mut documents = self.list().await?;
        documents.retain(|d| d.is_ready() && selected.contains(&d.id));
        Ok(documents)
    }

    async fn push(&self, document: UploadedDocument) -> Result<()> {
        let _guard = self.storage.write_lock().lock().await;
        let mut documents = self.list().await?;
        documents.push(document);
        save(self.storage.as_ref(), FILES_KEY, &documents).await
    }

    async fn replace(&self, document: UploadedDocument) -> Result<()> {
        let _guard = self.storage.write_lock().lock().await;
        let mut documents = self.list().await?;
        match documents.iter_mut().find(|d| d.id == document.id) {
            Some(slot) => *slot = document,
            // removed while it was being read
            None => return Ok(()),
        }
        save(self.storage.as_ref(), FILES_KEY, &documents).await
    }
}
