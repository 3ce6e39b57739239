use std::{env, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    backend::{free_llm, openai},
    error::{Error, Result},
    storage::StorageKind,
};

/// Ceiling on total prompt characters.
pub const DEFAULT_SAFE_CHAR_LIMIT: usize = 195_000;
pub const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 120;
/// Relative to the working directory.
pub const DEFAULT_STORAGE_DIR: &str = ".lesson-forge";

const ENV_PREFIX: &str = "LESSON_FORGE_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackendKind {
    #[default]
    #[serde(rename = "free_llm", alias = "freellm")]
    FreeLlm,
    #[serde(rename = "openai", alias = "open_ai")]
    OpenAi,
}

impl std::str::FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free_llm" | "freellm" => Ok(Self::FreeLlm),
            "openai" => Ok(Self::OpenAi),
            other => Err(Error::ConfigError(format!("unknown backend: {other}"))),
        }
    }
}

/// Generator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub safe_char_limit: usize,
    pub model_timeout_secs: u64,
    pub backend: BackendKind,
    /// Empty means the backend's own default
    pub endpoint: String,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Ask the backend for schema-constrained output when it supports it
    pub schema_constrained: bool,
    /// Reject activities whose description lacks a mandatory section
    pub strict_sections: bool,
    pub storage_dir: PathBuf,
    /// Keep activities and documents in memory only, ignoring `storage_dir`
    pub in_memory: bool,
    pub log_level: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            safe_char_limit: DEFAULT_SAFE_CHAR_LIMIT,
            model_timeout_secs: DEFAULT_MODEL_TIMEOUT_SECS,
            backend: BackendKind::FreeLlm,
            endpoint: String::new(),
            model: String::new(),
            api_key: None,
            schema_constrained: true,
            strict_sections: false,
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            in_memory: false,
            log_level: "info".to_string(),
        }
    }
}

impl GeneratorConfig {
    /// Defaults, then the JSON file if given, then the environment.
    pub async fn load(path: Option<&std::path::Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = tokio::fs::read_to_string(path).await?;
                serde_json::from_str(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env(|name| env::var(name).ok())?;
        Ok(config)
    }

    /// Overrides from `LESSON_FORGE_*` variables, plus `OPENAI_API_KEY`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| lookup(&format!("{ENV_PREFIX}{suffix}"));

        if let Some(v) = var("SAFE_CHAR_LIMIT") {
            self.safe_char_limit = parse_number("SAFE_CHAR_LIMIT", &v)?;
        }
        if let Some(v) = var("MODEL_TIMEOUT_SECS") {
            self.model_timeout_secs = parse_number("MODEL_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = var("BACKEND") {
            self.backend = v.parse()?;
        }
        if let Some(v) = var("ENDPOINT") {
            self.endpoint = v;
        }
        if let Some(v) = var("MODEL") {
            self.model = v;
        }
        if let Some(v) = var("SCHEMA_CONSTRAINED") {
            self.schema_constrained = parse_flag("SCHEMA_CONSTRAINED", &v)?;
        }
        if let Some(v) = var("STRICT_SECTIONS") {
            self.strict_sections = parse_flag("STRICT_SECTIONS", &v)?;
        }
        if let Some(v) = var("STORAGE_DIR")
            && !v.trim().is_empty()
        {
            self.storage_dir = PathBuf::from(v);
        }
        if let Some(v) = var("IN_MEMORY") {
            self.in_memory = parse_flag("IN_MEMORY", &v)?;
        }
        if let Some(v) = var("LOG_LEVEL") {
            self.log_level = v;
        }
        if let Some(v) = var("API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            self.api_key = Some(v);
        }
        Ok(())
    }

    pub fn storage_kind(&self) -> StorageKind {
        if self.in_memory {
            StorageKind::Memory
        } else {
            StorageKind::File(self.storage_dir.clone())
        }
    }

    /// The URL the configured backend will call.
    pub fn effective_endpoint(&self) -> &str {
        if !self.endpoint.trim().is_empty() {
            return &self.endpoint;
        }
        match self.backend {
            BackendKind::FreeLlm => free_llm::DEFAULT_ENDPOINT,
            BackendKind::OpenAi => openai::DEFAULT_BASE_URL,
        }
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::ConfigError(format!("{ENV_PREFIX}{name} is not a number: {value}")))
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::ConfigError(format!(
            "{ENV_PREFIX}{name} is not a boolean: {value}"
        ))),
    }
}
