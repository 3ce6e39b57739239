use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    backend::{
        BackendCapability, ModelBackend, ModelRequest, ModelResponse, classify_transport_error,
        retry_after_header,
    },
    error::{GenerationError, Result},
};

pub const DEFAULT_ENDPOINT: &str = "https://apifreellm.com/api/chat";

// Used when a 429 carries no delay at all.
const FALLBACK_RETRY_AFTER_SECS: u64 = 5;

/// Single-message chat endpoint answering with free text.
pub struct FreeLlmBackend {
    endpoint: String,
    timeout: Duration,
    client: Client,
}

impl FreeLlmBackend {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let endpoint = if endpoint.trim().is_empty() {
            DEFAULT_ENDPOINT
        } else {
            endpoint
        };
        Ok(Self {
            endpoint: endpoint.to_string(),
            timeout,
            client,
        })
    }
}

#[async_trait]
impl ModelBackend for FreeLlmBackend {
    fn name(&self) -> &str {
        "free_llm"
    }

    fn capability(&self) -> BackendCapability {
        BackendCapability::FreeText
    }

    async fn invoke(&self, request: &ModelRequest) -> core::result::Result<ModelResponse, GenerationError> {
        let message = request.combined_text();
        debug!(endpoint = %self.endpoint, chars = message.chars().count(), "calling model");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&ChatRequest { message: &message })
            .send()
            .await
            .map_err(|e| classify_transport_error(e, self.timeout))?;

        let status = response.status();
        let header_delay = retry_after_header(&response);
        let body: Option<ChatResponse> = response.json().await.ok();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = body
                .as_ref()
                .and_then(|b| b.retry_after)
                .or(header_delay)
                .unwrap_or(FALLBACK_RETRY_AFTER_SECS);
            return Err(GenerationError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            return Err(GenerationError::ModelInvocation(format!(
                "network error: {}",
                status
            )));
        }

        let body = body.ok_or_else(|| {
            GenerationError::ModelInvocation("response body is not valid JSON".into())
        })?;
        interpret(body, header_delay)
    }
}

fn interpret(body: ChatResponse, header_delay: Option<u64>) -> core::result::Result<ModelResponse, GenerationError> {
    match body.status.as_str() {
        "success" => Ok(ModelResponse::Text(body.response.unwrap_or_default())),
        "rate_limited" => {
            let retry_after_secs = body
                .retry_after
                .or(header_delay)
                .unwrap_or(FALLBACK_RETRY_AFTER_SECS);
            warn!(retry_after_secs, "model endpoint rate limited the request");
            Err(GenerationError::RateLimited { retry_after_secs })
        }
        other => Err(GenerationError::ModelInvocation(format!(
            "API error ({other}): {}",
            body.error.unwrap_or_else(|| "unknown error".to_string())
        ))),
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    status: String,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    retry_after: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(json: serde_json::Value) -> ChatResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn success_returns_text() {
        let out = interpret(body(serde_json::json!({"status": "success", "response": "oi"})), None);
        assert_eq!(out.unwrap(), ModelResponse::Text("oi".into()));
    }

    #[test]
    fn rate_limit_carries_delay_unchanged() {
        let out = interpret(
            body(serde_json::json!({"status": "rate_limited", "retry_after": 12})),
            Some(99),
        );
        assert_eq!(out.unwrap_err(), GenerationError::RateLimited { retry_after_secs: 12 });
    }

    #[test]
    fn other_status_is_invocation_error() {
        let out = interpret(
            body(serde_json::json!({"status": "error", "error": "modelo indisponível"})),
            None,
        );
        let err = out.unwrap_err();
        assert_eq!(err.kind(), "model_invocation");
        assert!(err.to_string().contains("modelo indisponível"));
    }
}
