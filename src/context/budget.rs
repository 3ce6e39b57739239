use futures::future::join_all;
use tracing::{debug, warn};

use crate::{
    document::DocumentParser,
    error::GenerationError,
    models::UploadedDocument,
    utils::{char_len, truncate_word_safe},
};

pub const TRUNCATION_MARKER: &str = "[... conteúdo truncado ...]";
const DOCUMENT_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    pub name: String,
    pub text: String,
}

impl ParsedDocument {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// A document left out of the context because it could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDocument {
    pub name: String,
    pub error: GenerationError,
}

/// Retrieval context for one request. Its length in characters never exceeds
/// `budget`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledContext {
    text: String,
    pub budget: usize,
    pub included: Vec<String>,
    pub skipped: Vec<SkippedDocument>,
    pub truncated: bool,
}

impl AssembledContext {
    pub fn empty(budget: usize) -> Self {
        Self {
            budget,
            ..Self::default()
        }
    }

    pub fn from_combined(combined: Combined, budget: usize, skipped: Vec<SkippedDocument>) -> Self {
        Self {
            text: combined.text,
            budget,
            included: combined.included,
            skipped,
            truncated: combined.truncated,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn char_len(&self) -> usize {
        char_len(&self.text)
    }
}

/// Result of fitting parsed documents into a budget.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Combined {
    pub text: String,
    pub included: Vec<String>,
    pub truncated: bool,
}

pub struct ContextBudgeter {
    parser: DocumentParser,
}

impl ContextBudgeter {
    pub fn new(parser: DocumentParser) -> Self {
        Self { parser }
    }

    /// Parse the ready documents concurrently and fit them into `budget`
    /// characters. Unreadable documents are skipped, never fatal.
    pub async fn build(&self, documents: &[UploadedDocument], budget: usize) -> AssembledContext {
        if budget == 0 {
            return AssembledContext::empty(budget);
        }
        let (parsed, skipped) = self.parse_ready(documents).await;
        Self::fit(&parsed, skipped, budget)
    }

    /// Fit already parsed documents into `budget`, carrying the skipped ones
    /// along for reporting.
    pub fn fit(
        parsed: &[ParsedDocument],
        skipped: Vec<SkippedDocument>,
        budget: usize,
    ) -> AssembledContext {
        AssembledContext::from_combined(combine(parsed, budget), budget, skipped)
    }

    /// Parse every ready document, in input order. Documents that are not
    /// ready are ignored; failures are logged and returned separately.
    pub async fn parse_ready(
        &self,
        documents: &[UploadedDocument],
    ) -> (Vec<ParsedDocument>, Vec<SkippedDocument>) {
        let eligible: Vec<&UploadedDocument> = documents.iter().filter(|d| d.is_ready()).collect();
        if eligible.len() < documents.len() {
            debug!(
                ignored = documents.len() - eligible.len(),
                "documents not ready are ignored"
            );
        }

        let outcomes = join_all(eligible.iter().map(|d| self.parser.parse(d))).await;

        let mut parsed = Vec::with_capacity(outcomes.len());
        let mut skipped = Vec::new();
        for (document, outcome) in eligible.iter().zip(outcomes) {
            match outcome {
                Ok(text) => parsed.push(ParsedDocument::new(document.name.clone(), text)),
                Err(error) => {
                    warn!(
                        document = %document.name,
                        kind = error.kind(),
                        error = %error,
                        "document skipped"
                    );
                    skipped.push(SkippedDocument {
                        name: document.name.clone(),
                        error,
                    });
                }
            }
        }
        (parsed, skipped)
    }
}

/// Fit documents into `budget` characters, keeping input order.
///
/// When everything fits, each text is wrapped in start/end delimiters and the
/// documents are joined by blank lines. Otherwise the space left after
/// delimiters and truncation markers is split in proportion to each
/// document's length (floored), every text is cut at a word boundary, and a
/// document whose share holds no whole word is dropped.
pub fn combine(documents: &[ParsedDocument], budget: usize) -> Combined {
    let documents: Vec<&ParsedDocument> = documents.iter().filter(|d| !d.text.is_empty()).collect();
    let total: usize = documents.iter().map(|d| char_len(&d.text)).sum();
    if budget == 0 || total == 0 {
        return Combined::default();
    }

    let full = documents
        .iter()
        .map(|d| wrap(&d.name, &d.text))
        .collect::<Vec<_>>()
        .join(DOCUMENT_SEPARATOR);
    if char_len(&full) <= budget {
        return Combined {
            text: full,
            included: documents.iter().map(|d| d.name.clone()).collect(),
            truncated: false,
        };
    }

    let marker_len = 1 + char_len(TRUNCATION_MARKER);
    let reserved: usize = documents
        .iter()
        .map(|d| char_len(&wrap(&d.name, "")) + marker_len)
        .sum::<usize>()
        + char_len(DOCUMENT_SEPARATOR) * (documents.len() - 1);
    let available = budget.saturating_sub(reserved);

    warn!(
        total_chars = total,
        budget,
        available,
        "supporting documents exceed the context budget, truncating proportionally"
    );

    let mut included = Vec::new();
    let mut segments = Vec::new();
    for document in &documents {
        let share = (char_len(&document.text) as u128 * available as u128 / total as u128) as usize;
        let cut = truncate_word_safe(&document.text, share);
        if cut.is_empty() {
            debug!(document = %document.name, share, "document dropped, no room left");
            continue;
        }
        segments.push(format!("{}\n{}", wrap(&document.name, cut), TRUNCATION_MARKER));
        included.push(document.name.clone());
    }

    let text = segments.join(DOCUMENT_SEPARATOR);
    debug_assert!(char_len(&text) <= budget);
    Combined {
        text,
        included,
        truncated: true,
    }
}

fn wrap(name: &str, text: &str) -> String {
    format!("--- start of document {name} ---\n{text}\n--- end of document {name} ---")
}
