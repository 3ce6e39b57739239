use serde_json::Value;
use tracing::debug;

use crate::{
    backend::ModelResponse,
    error::GenerationError,
    models::GeneratedActivity,
    prompt::ACTIVITIES_FIELD,
    utils::{StripCodeBlock, excerpt},
};

/// Longest slice of raw output carried in an error.
pub const EXCERPT_CHARS: usize = 500;

// Openers tried before giving up on a response full of stray brackets.
const MAX_SPAN_ATTEMPTS: usize = 16;

/// Recovers the activity list from whatever the backend returned.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseExtractor;

impl ResponseExtractor {
    pub fn extract(&self, response: ModelResponse) -> Result<Vec<GeneratedActivity>, GenerationError> {
        match response {
            ModelResponse::Text(text) => extract_activities(&text),
            ModelResponse::Structured(value) => activities_from_value(value),
        }
    }
}

/// Find the JSON payload in free-form model output and read the activity list
/// out of it.
///
/// A fenced block is tried first. Otherwise the text is scanned from each
/// `{` or `[` for a balanced span, brackets inside string literals ignored,
/// and the first span holding an activity list wins. Valid JSON of the wrong
/// shape, such as a `[1]` footnote, does not stop the scan.
pub fn extract_activities(raw: &str) -> Result<Vec<GeneratedActivity>, GenerationError> {
    let mut wrong_shape: Option<GenerationError> = None;

    let fenced = raw.fenced_block();
    if let Some(body) = fenced
        && let Ok(value) = serde_json::from_str::<Value>(body)
    {
        match activities_from_value(value) {
            Ok(activities) => {
                debug!("payload found in fenced block");
                return Ok(activities);
            }
            Err(e) => wrong_shape = Some(e),
        }
    }

    let mut first_failure: Option<(&str, serde_json::Error)> = None;
    let openers = raw
        .char_indices()
        .filter(|(_, c)| matches!(c, '{' | '['))
        .map(|(i, _)| i)
        .take(MAX_SPAN_ATTEMPTS);
    for start in openers {
        let Some(span) = balanced_span(raw, start) else {
            continue;
        };
        let value = match serde_json::from_str::<Value>(span) {
            Ok(value) => value,
            Err(e) => {
                first_failure.get_or_insert((span, e));
                continue;
            }
        };
        match activities_from_value(value) {
            Ok(activities) => {
                debug!(start, len = span.len(), "payload found by bracket scan");
                return Ok(activities);
            }
            Err(e) => {
                debug!(start, error = %e, "span is JSON but not an activity list");
                wrong_shape.get_or_insert(e);
            }
        }
    }

    if let Some(e) = wrong_shape {
        return Err(e);
    }
    match (first_failure, fenced) {
        (Some((candidate, e)), _) => Err(GenerationError::MalformedPayload {
            candidate: excerpt(candidate, EXCERPT_CHARS),
            reason: e.to_string(),
        }),
        (None, Some(body)) => Err(GenerationError::MalformedPayload {
            candidate: excerpt(body, EXCERPT_CHARS),
            reason: "fenced block is not valid JSON".to_string(),
        }),
        (None, None) => Err(GenerationError::NoStructuredPayloadFound {
            excerpt: excerpt(raw.trim(), EXCERPT_CHARS),
        }),
    }
}

/// Validate the top-level shape and deserialize the entries. No check is made
/// on the content of each entry beyond its types.
pub fn activities_from_value(value: Value) -> Result<Vec<GeneratedActivity>, GenerationError> {
    let Value::Object(mut object) = value else {
        return Err(GenerationError::UnexpectedPayloadShape(format!(
            "expected an object with an \"{ACTIVITIES_FIELD}\" list"
        )));
    };
    let items = match object.remove(ACTIVITIES_FIELD) {
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(GenerationError::UnexpectedPayloadShape(format!(
                "\"{ACTIVITIES_FIELD}\" is not a list"
            )));
        }
        None => {
            return Err(GenerationError::UnexpectedPayloadShape(format!(
                "missing \"{ACTIVITIES_FIELD}\" key"
            )));
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item).map_err(|e| {
                GenerationError::UnexpectedPayloadShape(format!("entry {index}: {e}"))
            })
        })
        .collect()
}

/// The span from `start` (an opening bracket) to its matching close.
fn balanced_span(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}
