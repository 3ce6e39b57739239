use serde::{Deserialize, Serialize};

pub const MEDIA_TYPE_TEXT: &str = "text/plain";
pub const MEDIA_TYPE_MARKDOWN: &str = "text/markdown";
pub const MEDIA_TYPE_PDF: &str = "application/pdf";
pub const MEDIA_TYPE_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Pending,
    Ready,
    Failed,
}

/// A supporting document uploaded as grounding material.
///
/// `content` is transport-encoded: either a `data:<mime>;base64,<payload>` URL
/// or raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedDocument {
    pub id: String,
    pub name: String,
    pub media_type: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub status: DocumentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl UploadedDocument {
    pub fn pending(name: impl Into<String>, media_type: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: format!("{}-{}", uuid::Uuid::new_v4().simple(), name),
            name,
            media_type: media_type.into(),
            content: String::new(),
            status: DocumentStatus::Pending,
            error_message: None,
        }
    }

    pub fn ready(
        name: impl Into<String>,
        media_type: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let mut document = Self::pending(name, media_type);
        document.mark_ready(content.into());
        document
    }

    pub fn mark_ready(&mut self, content: String) {
        self.content = content;
        self.status = DocumentStatus::Ready;
        self.error_message = None;
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.status = DocumentStatus::Failed;
        self.error_message = Some(reason.into());
    }

    pub fn is_ready(&self) -> bool {
        self.status == DocumentStatus::Ready
    }
}

/// Guess a media type from a file extension, for callers reading from disk.
pub fn media_type_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "txt" => Some(MEDIA_TYPE_TEXT),
        "md" | "markdown" => Some(MEDIA_TYPE_MARKDOWN),
        "pdf" => Some(MEDIA_TYPE_PDF),
        "docx" => Some(MEDIA_TYPE_DOCX),
        _ => None,
    }
}
