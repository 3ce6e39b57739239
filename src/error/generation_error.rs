/// Classified failure of one generation request.
///
/// Per-document variants (`DocumentParse`, `UnsupportedMediaType`,
/// `ExtractorUnavailable`) are absorbed while the context is built; every
/// other variant aborts the request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("failed to read document '{name}': {reason}")]
    DocumentParse { name: String, reason: String },

    #[error("unsupported file type: {0}")]
    UnsupportedMediaType(String),

    #[error("no {0} text extractor is installed")]
    ExtractorUnavailable(String),

    #[error("invalid form: {0}")]
    InvalidForm(String),

    #[error("model invocation failed: {0}")]
    ModelInvocation(String),

    #[error("rate limited, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("model did not answer within {0} seconds")]
    Timeout(u64),

    #[error("generation cancelled")]
    Cancelled,

    #[error("no structured payload found in model output: \"{excerpt}\"")]
    NoStructuredPayloadFound { excerpt: String },

    #[error("malformed payload ({reason}): \"{candidate}\"")]
    MalformedPayload { candidate: String, reason: String },

    #[error("unexpected payload shape: {0}")]
    UnexpectedPayloadShape(String),

    #[error("activity '{title}' is missing sections: {}", missing.join(", "))]
    MissingSections { title: String, missing: Vec<String> },
}

impl GenerationError {
    /// Stable classification used by callers and in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::DocumentParse { .. } => "document_parse",
            GenerationError::UnsupportedMediaType(_) => "unsupported_media_type",
            GenerationError::ExtractorUnavailable(_) => "extractor_unavailable",
            GenerationError::InvalidForm(_) => "invalid_form",
            GenerationError::ModelInvocation(_) => "model_invocation",
            GenerationError::RateLimited { .. } => "rate_limited",
            GenerationError::Timeout(_) => "timeout",
            GenerationError::Cancelled => "cancelled",
            GenerationError::NoStructuredPayloadFound { .. } => "no_structured_payload",
            GenerationError::MalformedPayload { .. } => "malformed_payload",
            GenerationError::UnexpectedPayloadShape(_) => "unexpected_payload_shape",
            GenerationError::MissingSections { .. } => "missing_sections",
        }
    }

    /// Per-document failures only exclude the document from the context.
    pub fn is_document_level(&self) -> bool {
        matches!(
            self,
            GenerationError::DocumentParse { .. }
                | GenerationError::UnsupportedMediaType(_)
                | GenerationError::ExtractorUnavailable(_)
        )
    }

    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            GenerationError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// One consolidated message for the person who started the request.
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::RateLimited { retry_after_secs } => format!(
                "Limite de requisições atingido. Por favor, aguarde {retry_after_secs} segundos e tente novamente."
            ),
            GenerationError::Timeout(secs) => {
                format!("A IA não respondeu em {secs} segundos. Tente novamente.")
            }
            GenerationError::Cancelled => "A geração foi cancelada.".to_string(),
            other => format!("Falha ao se comunicar com a IA. {other}."),
        }
    }
}
