pub mod free_llm;
pub mod openai;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{Error, GenerationError, Result},
    prompt::AssembledPrompt,
    shared::config::{BackendKind, GeneratorConfig},
};

pub use free_llm::FreeLlmBackend;
pub use openai::OpenAiBackend;

/// How a backend shapes its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendCapability {
    /// Free text that may embed the payload somewhere
    FreeText,
    /// Output already constrained to the declared JSON schema
    SchemaConstrained,
}

/// One outbound model call.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub system: String,
    pub user: String,
    /// Present only for schema-constrained backends
    pub schema: Option<Value>,
}

impl ModelRequest {
    pub fn from_prompt(prompt: &AssembledPrompt, capability: BackendCapability) -> Self {
        Self {
            system: prompt.system.clone(),
            user: prompt.user.clone(),
            schema: match capability {
                BackendCapability::SchemaConstrained => Some(prompt.schema.clone()),
                BackendCapability::FreeText => None,
            },
        }
    }

    /// System and user parts as a single message.
    pub fn combined_text(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelResponse {
    Text(String),
    Structured(Value),
}

#[async_trait]
pub trait ModelBackend: Send + Sync {
    fn name(&self) -> &str;

    fn capability(&self) -> BackendCapability;

    /// One attempt; rate limits and timeouts are reported, never retried.
    async fn invoke(&self, request: &ModelRequest) -> core::result::Result<ModelResponse, GenerationError>;
}

pub fn build_backend(config: &GeneratorConfig) -> Result<Arc<dyn ModelBackend>> {
    let timeout = Duration::from_secs(config.model_timeout_secs);
    Ok(match config.backend {
        BackendKind::FreeLlm => Arc::new(FreeLlmBackend::new(&config.endpoint, timeout)?),
        BackendKind::OpenAi => {
            let api_key = config
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| Error::ConfigError("the openai backend needs an API key".into()))?;
            Arc::new(OpenAiBackend::new(
                &config.endpoint,
                &config.model,
                api_key,
                config.schema_constrained,
                timeout,
            )?)
        }
    })
}

pub(crate) fn classify_transport_error(e: reqwest::Error, timeout: Duration) -> GenerationError {
    if e.is_timeout() {
        GenerationError::Timeout(timeout.as_secs())
    } else {
        GenerationError::ModelInvocation(e.to_string())
    }
}

pub(crate) fn retry_after_header(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
