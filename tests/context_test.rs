#[cfg(test)]
mod context_tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use lesson_forge::{
        GenerationError,
        context::{ContextBudgeter, TRUNCATION_MARKER},
        document::{DocumentParser, PdfTextExtractor, data_url},
        models::{
            UploadedDocument,
            document::{MEDIA_TYPE_PDF, MEDIA_TYPE_TEXT},
        },
    };

    /// Treats the bytes as UTF-8 and splits pages on form feeds.
    struct FormFeedPdf;

    #[async_trait]
    impl PdfTextExtractor for FormFeedPdf {
        async fn page_texts(&self, bytes: &[u8]) -> Result<Vec<String>, GenerationError> {
            let text = std::str::from_utf8(bytes).map_err(|e| GenerationError::DocumentParse {
                name: "pdf".into(),
                reason: e.to_string(),
            })?;
            Ok(text.split('\u{c}').map(str::to_string).collect())
        }
    }

    fn document(name: &str, media_type: &str, body: &[u8]) -> UploadedDocument {
        UploadedDocument::ready(name, media_type, data_url::encode(media_type, body))
    }

    fn budgeter() -> ContextBudgeter {
        ContextBudgeter::new(DocumentParser::new().with_pdf(Arc::new(FormFeedPdf)))
    }

    #[tokio::test]
    async fn test_documents_keep_input_order() {
        let documents = vec![
            document("a.pdf", MEDIA_TYPE_PDF, "página um\u{c}página dois".as_bytes()),
            document("b.txt", MEDIA_TYPE_TEXT, b"texto simples"),
        ];

        let context = budgeter().build(&documents, 10_000).await;

        assert_eq!(context.included, vec!["a.pdf".to_string(), "b.txt".to_string()]);
        assert!(!context.truncated);
        let text = context.as_str();
        assert!(text.contains("página um\n\npágina dois"));
        assert!(text.find("a.pdf").unwrap() < text.find("b.txt").unwrap());
    }

    #[tokio::test]
    async fn test_oversized_document_is_cut_to_budget() {
        let big = "palavra ".repeat(62_500);
        assert_eq!(big.chars().count(), 500_000);
        let documents = vec![document("grande.txt", MEDIA_TYPE_TEXT, big.as_bytes())];

        let context = budgeter().build(&documents, 100_000).await;

        assert!(context.truncated);
        assert!(context.char_len() <= 100_000);
        assert!(context.as_str().ends_with(TRUNCATION_MARKER));
    }

    #[tokio::test]
    async fn test_zero_budget_yields_empty_context() {
        let documents = vec![document("b.txt", MEDIA_TYPE_TEXT, b"texto")];
        let context = budgeter().build(&documents, 0).await;
        assert!(context.is_empty());
        assert!(context.included.is_empty());
    }

    #[tokio::test]
    async fn test_parse_failures_are_reported_not_fatal() {
        let documents = vec![
            document("planilha.xlsx", "application/vnd.ms-excel", b"\x00\x01"),
            document("b.txt", MEDIA_TYPE_TEXT, b"texto"),
        ];

        let context = budgeter().build(&documents, 1_000).await;

        assert_eq!(context.included, vec!["b.txt".to_string()]);
        assert_eq!(context.skipped.len(), 1);
        assert_eq!(context.skipped[0].error.kind(), "unsupported_media_type");
        assert!(context.skipped[0].error.is_document_level());
    }
}
