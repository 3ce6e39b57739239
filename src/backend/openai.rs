use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Client, StatusCode,
    header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::{
    backend::{
        BackendCapability, ModelBackend, ModelRequest, ModelResponse, classify_transport_error,
        retry_after_header,
    },
    error::{Error, GenerationError, Result},
    extract::extractor::EXCERPT_CHARS,
    utils::{StripCodeBlock, excerpt},
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const FALLBACK_RETRY_AFTER_SECS: u64 = 20;

/// OpenAI-compatible chat completions, optionally with a JSON-schema
/// response format.
pub struct OpenAiBackend {
    base_url: String,
    model: String,
    headers: HeaderMap,
    schema_constrained: bool,
    timeout: Duration,
    client: Client,
}

impl OpenAiBackend {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: String,
        schema_constrained: bool,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| Error::ConfigError("invalid OpenAI API key".into()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let base_url = if base_url.trim().is_empty() {
            DEFAULT_BASE_URL
        } else {
            base_url.trim_end_matches('/')
        };
        let model = if model.trim().is_empty() {
            DEFAULT_MODEL
        } else {
            model
        };
        Ok(Self {
            base_url: base_url.to_string(),
            model: model.to_string(),
            headers,
            schema_constrained,
            timeout,
            client,
        })
    }

    fn body<'a>(&'a self, request: &'a ModelRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            response_format: request.schema.as_ref().map(|schema| {
                json!({
                    "type": "json_schema",
                    "json_schema": { "name": "atividades", "schema": schema }
                })
            }),
        }
    }
}

#[async_trait]
impl ModelBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    fn capability(&self) -> BackendCapability {
        if self.schema_constrained {
            BackendCapability::SchemaConstrained
        } else {
            BackendCapability::FreeText
        }
    }

    async fn invoke(&self, request: &ModelRequest) -> core::result::Result<ModelResponse, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(%url, model = %self.model, constrained = request.schema.is_some(), "calling model");

        let response = self
            .client
            .post(&url)
            .headers(self.headers.clone())
            .json(&self.body(request))
            .send()
            .await
            .map_err(|e| classify_transport_error(e, self.timeout))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs =
                retry_after_header(&response).unwrap_or(FALLBACK_RETRY_AFTER_SECS);
            return Err(GenerationError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(GenerationError::ModelInvocation(format!(
                "OpenAI returned {status}: {}",
                excerpt(&text, EXCERPT_CHARS)
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::ModelInvocation(format!("unreadable response: {e}")))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::ModelInvocation("response has no content".into()))?;

        if request.schema.is_none() {
            return Ok(ModelResponse::Text(content));
        }
        // Some compatible servers still fence constrained output.
        serde_json::from_str::<Value>(content.strip_code_block())
            .map(ModelResponse::Structured)
            .map_err(|e| GenerationError::MalformedPayload {
                candidate: excerpt(&content, EXCERPT_CHARS),
                reason: e.to_string(),
            })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}
