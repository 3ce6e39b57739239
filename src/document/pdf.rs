use async_trait::async_trait;
use tracing::debug;

use crate::{document::parser::PdfTextExtractor, error::GenerationError};

/// Per-page text through `pdf-extract`. Scanned pages without a text layer
/// come back empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractTextExtractor;

#[async_trait]
impl PdfTextExtractor for PdfExtractTextExtractor {
    async fn page_texts(&self, bytes: &[u8]) -> Result<Vec<String>, GenerationError> {
        let bytes = bytes.to_vec();
        // pdf-extract can panic on damaged files; the join error covers that
        let pages = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem_by_pages(&bytes)
        })
        .await
        .map_err(|e| pdf_error(e.to_string()))?
        .map_err(|e| pdf_error(e.to_string()))?;

        let pages: Vec<String> = pages.into_iter().map(|p| p.trim().to_string()).collect();
        debug!(pages = pages.len(), "pdf text extracted");
        Ok(pages)
    }
}

fn pdf_error(reason: String) -> GenerationError {
    GenerationError::DocumentParse {
        name: "pdf".into(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn non_pdf_input_fails() {
        let err = PdfExtractTextExtractor
            .page_texts(b"definitely not a pdf")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "document_parse");
    }

    #[tokio::test]
    async fn builtin_parser_reads_pdfs() {
        let err = crate::document::DocumentParser::with_builtin_extractors()
            .parse_bytes(crate::models::document::MEDIA_TYPE_PDF, b"%PDF-1.4 truncated")
            .await
            .unwrap_err();
        assert_ne!(err, GenerationError::ExtractorUnavailable("PDF".into()));
        assert!(err.is_document_level());
    }
}
