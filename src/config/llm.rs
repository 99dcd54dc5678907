use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

use super::helpers::{optional_env, parse_optional_env, require_env};

/// Settings for the OpenAI-compatible chat completion provider.
#[derive(Clone)]
pub struct LlmConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
    pub request_timeout: Duration,
    pub max_retries: u32,
}

impl LlmConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = require_env(
            "OPENAI_API_KEY",
            "set OPENAI_API_KEY to an API key for an OpenAI-compatible endpoint",
        )?;
        let base_url = optional_env("OPENAI_BASE_URL")?
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
        let model = optional_env("OPENAI_MODEL")?.unwrap_or_else(|| "gpt-4o".to_string());
        let timeout_secs: u64 = parse_optional_env("OPENAI_TIMEOUT_SECONDS", 30)?;
        let max_retries = parse_optional_env("OPENAI_MAX_RETRIES", 3)?;
        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            request_timeout: Duration::from_secs(timeout_secs),
            max_retries,
        })
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("request_timeout", &self.request_timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}
