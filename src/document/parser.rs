use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::{
    document::data_url,
    error::GenerationError,
    models::document::{
        MEDIA_TYPE_DOCX, MEDIA_TYPE_MARKDOWN, MEDIA_TYPE_PDF, MEDIA_TYPE_TEXT, UploadedDocument,
    },
};

const PAGE_SEPARATOR: &str = "\n\n";

/// Page-level text extraction for PDF files.
#[async_trait]
pub trait PdfTextExtractor: Send + Sync {
    /// Text of every page, in page order.
    async fn page_texts(&self, bytes: &[u8]) -> Result<Vec<String>, GenerationError>;
}

/// Raw text extraction for Word (`.docx`) files.
#[async_trait]
pub trait DocxTextExtractor: Send + Sync {
    async fn raw_text(&self, bytes: &[u8]) -> Result<String, GenerationError>;
}

/// Turns uploaded documents into plain text. Binary formats need their
/// extractor installed; a missing one fails that document only.
#[derive(Clone, Default)]
pub struct DocumentParser {
    pdf: Option<Arc<dyn PdfTextExtractor>>,
    docx: Option<Arc<dyn DocxTextExtractor>>,
}

impl DocumentParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parser with every extractor this build ships with.
    pub fn with_builtin_extractors() -> Self {
        let parser = Self::new();
        #[cfg(feature = "docx")]
        let parser = parser.with_docx(Arc::new(crate::document::docx::ZipDocxExtractor));
        #[cfg(feature = "pdf")]
        let parser = parser.with_pdf(Arc::new(crate::document::pdf::PdfExtractTextExtractor));
        parser
    }

    pub fn with_pdf(mut self, extractor: Arc<dyn PdfTextExtractor>) -> Self {
        self.pdf = Some(extractor);
        self
    }

    pub fn with_docx(mut self, extractor: Arc<dyn DocxTextExtractor>) -> Self {
        self.docx = Some(extractor);
        self
    }

    pub async fn parse(&self, document: &UploadedDocument) -> Result<String, GenerationError> {
        let bytes = data_url::decode(&document.content).map_err(|e| {
            GenerationError::DocumentParse {
                name: document.name.clone(),
                reason: e.to_string(),
            }
        })?;
        let text = self.parse_bytes(&document.media_type, &bytes).await?;
        debug!(
            document = %document.name,
            media_type = %document.media_type,
            chars = text.chars().count(),
            "document parsed"
        );
        Ok(text)
    }

    pub async fn parse_bytes(
        &self,
        media_type: &str,
        bytes: &[u8],
    ) -> Result<String, GenerationError> {
        match essence(media_type) {
            MEDIA_TYPE_TEXT | MEDIA_TYPE_MARKDOWN => Ok(String::from_utf8_lossy(bytes).into_owned()),
            MEDIA_TYPE_PDF => {
                let extractor = self
                    .pdf
                    .as_ref()
                    .ok_or_else(|| GenerationError::ExtractorUnavailable("PDF".into()))?;
                let pages = extractor.page_texts(bytes).await?;
                Ok(pages.join(PAGE_SEPARATOR))
            }
            MEDIA_TYPE_DOCX => {
                let extractor = self
                    .docx
                    .as_ref()
                    .ok_or_else(|| GenerationError::ExtractorUnavailable("DOCX".into()))?;
                extractor.raw_text(bytes).await
            }
            "" => Err(GenerationError::UnsupportedMediaType("unknown".into())),
            other => Err(GenerationError::UnsupportedMediaType(other.to_string())),
        }
    }
}

// "text/plain; charset=utf-8" -> "text/plain"
fn essence(media_type: &str) -> &str {
    media_type.split(';').next().unwrap_or_default().trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPages(Vec<&'static str>);

    #[async_trait]
    impl PdfTextExtractor for FixedPages {
        async fn page_texts(&self, _bytes: &[u8]) -> Result<Vec<String>, GenerationError> {
            Ok(self.0.iter().map(|p| p.to_string()).collect())
        }
    }

    #[tokio::test]
    async fn plain_text_and_markdown_decode_directly() {
        let parser = DocumentParser::new();
        let text = parser.parse_bytes("text/markdown", "# Frações".as_bytes()).await.unwrap();
        assert_eq!(text, "# Frações");
        let text = parser
            .parse_bytes("text/plain; charset=utf-8", b"metade")
            .await
            .unwrap();
        assert_eq!(text, "metade");
    }

    #[tokio::test]
    async fn pdf_pages_are_joined_in_order() {
        let parser = DocumentParser::new().with_pdf(Arc::new(FixedPages(vec!["um", "dois", "três"])));
        let text = parser.parse_bytes(MEDIA_TYPE_PDF, b"%PDF-1.4").await.unwrap();
        assert_eq!(text, "um\n\ndois\n\ntrês");
    }

    #[tokio::test]
    async fn pdf_without_extractor_fails() {
        let err = DocumentParser::new()
            .parse_bytes(MEDIA_TYPE_PDF, b"%PDF-1.4")
            .await
            .unwrap_err();
        assert_eq!(err, GenerationError::ExtractorUnavailable("PDF".into()));
    }

    #[tokio::test]
    async fn unknown_type_names_the_type() {
        let err = DocumentParser::new()
            .parse_bytes("image/png", b"\x89PNG")
            .await
            .unwrap_err();
        assert_eq!(err, GenerationError::UnsupportedMediaType("image/png".into()));
        let err = DocumentParser::new().parse_bytes("", b"").await.unwrap_err();
        assert_eq!(err, GenerationError::UnsupportedMediaType("unknown".into()));
    }

    #[tokio::test]
    async fn stored_data_url_is_decoded_before_parsing() {
        let content = data_url::encode(MEDIA_TYPE_TEXT, "BNCC EF06MA07".as_bytes());
        let document = UploadedDocument::ready("bncc.txt", MEDIA_TYPE_TEXT, content);
        let text = DocumentParser::new().parse(&document).await.unwrap();
        assert_eq!(text, "BNCC EF06MA07");
    }
}
