//! Completion provider configuration parsed from environment variables.

use super::types::LlmError;
use crate::config::env_parse;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_LLM_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_LLM_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_LLM_TEMPERATURE: f32 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAiApiMode {
    ChatCompletions,
    Responses,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlmTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub openai_mode: OpenAiApiMode,
    pub openai_base_url: String,
    pub timeouts: LlmTimeouts,
}

impl LlmConfig {
    /// Build typed LLM config from environment variables.
    ///
    /// Optional:
    /// - `LLM_API_KEY_ENV`: names the env var containing the key; defaults to
    ///   `OPENAI_API_KEY`
    /// - `LLM_MODEL`: default `gpt-4o-mini`
    /// - `LLM_TEMPERATURE`: default 0, must be within [0, 2]
    /// - `LLM_OPENAI_MODE`: `chat_completions` (default) or `responses`
    /// - `LLM_OPENAI_BASE_URL`: any OpenAI-compatible endpoint
    /// - `LLM_REQUEST_TIMEOUT_SECS`: default 120
    /// - `LLM_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown API mode, an out-of-range
    /// temperature, or a missing API key.
    pub fn from_env() -> Result<Self, LlmError> {
        let key_var = std::env::var("LLM_API_KEY_ENV").unwrap_or_else(|_| DEFAULT_API_KEY_VAR.to_string());
        let api_key = std::env::var(&key_var).map_err(|_| LlmError::MissingApiKey { var: key_var.clone() })?;

        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string());
        let temperature = env_parse("LLM_TEMPERATURE", DEFAULT_LLM_TEMPERATURE);
        if !(0.0..=2.0).contains(&temperature) {
            return Err(LlmError::ConfigParse(format!("LLM_TEMPERATURE out of range: {temperature}")));
        }
        let openai_mode = parse_openai_mode(std::env::var("LLM_OPENAI_MODE").ok().as_deref())?;
        let openai_base_url = std::env::var("LLM_OPENAI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let timeouts = LlmTimeouts {
            request_secs: env_parse("LLM_REQUEST_TIMEOUT_SECS", DEFAULT_LLM_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse("LLM_CONNECT_TIMEOUT_SECS", DEFAULT_LLM_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { api_key, model, temperature, openai_mode, openai_base_url, timeouts })
    }
}

fn parse_openai_mode(raw: Option<&str>) -> Result<OpenAiApiMode, LlmError> {
    match raw.unwrap_or("chat_completions") {
        "chat_completions" => Ok(OpenAiApiMode::ChatCompletions),
        "responses" => Ok(OpenAiApiMode::Responses),
        other => Err(LlmError::ConfigParse(format!(
            "unsupported openai_api mode '{other}' (expected 'chat_completions' or 'responses')"
        ))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
