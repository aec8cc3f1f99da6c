//! Service configuration parsed from environment variables.
//!
//! Each component reads its own variables (`AdmissionConfig::from_env`,
//! `RetrievalConfig::from_env`, `LlmConfig::from_env`, ...). `AppConfig`
//! gathers them, adds the process-level settings, and validates the
//! combination once at startup.

use std::path::PathBuf;
use std::time::Duration;

use crate::admission::{AdmissionConfig, MAX_BAN_DURATION};
use crate::retrieval::RetrievalConfig;

pub const DEFAULT_APP_HOST: &str = "127.0.0.1";
pub const DEFAULT_APP_PORT: u16 = 8000;
pub const DEFAULT_INDEX_PATH: &str = "index.json";
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_ANSWER_MAX_TOKENS: u32 = 700;
pub const DEFAULT_MAX_QUERY_CHARS: usize = 4000;
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful sales assistant. Use only the provided context to answer. \
     Be concise but friendly. If the context does not contain the answer, say so.";
pub const DEFAULT_NO_ANSWER_MESSAGE: &str = "Sorry, I could not find a relevant answer to your question.";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Parse an env var, falling back to `default` when unset or unparseable.
pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Settings that shape the answer step of a chat request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerConfig {
    /// Bound on retrieval plus completion for one chat request.
    pub upstream_timeout: Duration,
    pub max_tokens: u32,
    pub system_prompt: String,
    /// Fixed reply when retrieval finds no confident grounding.
    pub no_answer_message: String,
    pub max_query_chars: usize,
}

impl AnswerConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            upstream_timeout: Duration::from_secs(env_parse("UPSTREAM_TIMEOUT_SECS", DEFAULT_UPSTREAM_TIMEOUT_SECS)),
            max_tokens: env_parse("ANSWER_MAX_TOKENS", DEFAULT_ANSWER_MAX_TOKENS),
            system_prompt: env_string("ANSWER_SYSTEM_PROMPT", DEFAULT_SYSTEM_PROMPT),
            no_answer_message: env_string("NO_ANSWER_MESSAGE", DEFAULT_NO_ANSWER_MESSAGE),
            max_query_chars: env_parse("MAX_QUERY_CHARS", DEFAULT_MAX_QUERY_CHARS),
        }
    }
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
            max_tokens: DEFAULT_ANSWER_MAX_TOKENS,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            no_answer_message: DEFAULT_NO_ANSWER_MESSAGE.to_string(),
            max_query_chars: DEFAULT_MAX_QUERY_CHARS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Shared secret exchanged for one-time tokens.
    pub token_secret: String,
    /// Take the client identity from `X-Forwarded-For` instead of the peer address.
    pub trust_forwarded_for: bool,
    pub index_path: PathBuf,
    pub admission: AdmissionConfig,
    pub retrieval: RetrievalConfig,
    pub answer: AnswerConfig,
}

impl AppConfig {
    /// Build the service config from environment variables.
    ///
    /// Required:
    /// - `TOKEN_RETRIEVAL_SECRET`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the secret is missing or a limit is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        let token_secret = std::env::var("TOKEN_RETRIEVAL_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("TOKEN_RETRIEVAL_SECRET"))?;

        let config = Self {
            host: env_string("APP_HOST", DEFAULT_APP_HOST),
            port: env_parse("APP_PORT", DEFAULT_APP_PORT),
            token_secret,
            trust_forwarded_for: env_bool("TRUST_FORWARDED_FOR").unwrap_or(false),
            index_path: PathBuf::from(env_string("INDEX_PATH", DEFAULT_INDEX_PATH)),
            admission: AdmissionConfig::from_env(),
            retrieval: RetrievalConfig::from_env(),
            answer: AnswerConfig::from_env(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject combinations the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending variable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.admission.rate_limit == 0 {
            return Err(invalid("RATE_LIMIT", "must be at least 1"));
        }
        if self.admission.window.is_zero() {
            return Err(invalid("TIME_WINDOW", "must be at least 1 second"));
        }
        if self.admission.ban_duration > MAX_BAN_DURATION {
            return Err(invalid("TEMP_BAN_DURATION", "must be at most one year"));
        }
        if !(0.0..=1.0).contains(&self.retrieval.threshold) {
            return Err(invalid("RELEVANCE_THRESHOLD", "must be within [0, 1]"));
        }
        if self.retrieval.k == 0 {
            return Err(invalid("RETRIEVAL_K", "must be at least 1"));
        }
        if self.answer.upstream_timeout.is_zero() {
            return Err(invalid("UPSTREAM_TIMEOUT_SECS", "must be at least 1 second"));
        }
        if self.answer.max_query_chars == 0 {
            return Err(invalid("MAX_QUERY_CHARS", "must be at least 1"));
        }
        Ok(())
    }

    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn invalid(var: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid { var, reason: reason.to_string() }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
