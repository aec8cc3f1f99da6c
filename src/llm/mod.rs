//! LLM — completion adapter for grounded answers.
//!
//! DESIGN
//! ======
//! Configuration comes from environment variables. `LlmClient` talks to any
//! OpenAI-compatible endpoint, in either Chat Completions or Responses mode.
//! Callers that only need a single answer go through [`complete`], which
//! sends one user message and returns cleaned text.
//!
//! TRADE-OFFS
//! ==========
//! Reasoning models served through OpenAI-compatible endpoints inline their
//! chain of thought as `<think>…</think>`. Those sections are removed here so
//! no caller ever forwards them to an end user.

pub mod config;
pub mod openai;
pub mod types;

use config::LlmConfig;
pub use types::LlmChat;
use types::{ChatResponse, LlmError, Message};

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

// =============================================================================
// CLIENT DISPATCH
// =============================================================================

/// Concrete LLM client for an OpenAI-compatible endpoint.
///
/// Configured from environment variables by [`LlmClient::from_env`].
pub struct LlmClient {
    inner: openai::OpenAiClient,
    model: String,
}

impl LlmClient {
    /// Build an LLM client from environment variables. See
    /// [`LlmConfig::from_env`] for the variables read.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid, the API key is missing, or
    /// the HTTP client fails to build.
    pub fn from_env() -> Result<Self, LlmError> {
        let config = LlmConfig::from_env()?;
        Self::from_config(config)
    }

    /// Build an LLM client from a parsed typed config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn from_config(config: LlmConfig) -> Result<Self, LlmError> {
        let inner = openai::OpenAiClient::new(
            config.api_key,
            config.openai_mode,
            config.openai_base_url,
            config.temperature,
            config.timeouts,
        )?;
        Ok(Self { inner, model: config.model })
    }

    /// Return the configured model name (e.g. `"gpt-4o-mini"`).
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait::async_trait]
impl LlmChat for LlmClient {
    async fn chat(&self, max_tokens: u32, system: &str, messages: &[Message]) -> Result<ChatResponse, LlmError> {
        self.inner.chat(&self.model, max_tokens, system, messages).await
    }
}

// =============================================================================
// SINGLE-SHOT COMPLETION
// =============================================================================

/// Send `prompt` as a single user message and return the cleaned answer text.
///
/// # Errors
///
/// Propagates provider errors; returns [`LlmError::EmptyCompletion`] when
/// nothing is left after removing reasoning sections.
pub async fn complete(llm: &dyn LlmChat, max_tokens: u32, system: &str, prompt: &str) -> Result<String, LlmError> {
    let messages = [Message::user(prompt)];
    let response = llm.chat(max_tokens, system, &messages).await?;
    tracing::debug!(
        model = %response.model,
        finish = ?response.finish,
        input_tokens = response.input_tokens,
        output_tokens = response.output_tokens,
        "llm: completion received"
    );
    if response.is_truncated() {
        tracing::warn!(max_tokens, "llm: completion truncated");
    }

    let answer = strip_think_sections(&response.text());
    if answer.is_empty() {
        return Err(LlmError::EmptyCompletion);
    }
    Ok(answer)
}

/// Remove every closed `<think>…</think>` section and trim the result.
///
/// An unclosed `<think>` is left in place.
#[must_use]
pub fn strip_think_sections(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(THINK_OPEN) {
        let after_open = &rest[start + THINK_OPEN.len()..];
        let Some(end) = after_open.find(THINK_CLOSE) else {
            break;
        };
        out.push_str(&rest[..start]);
        rest = &after_open[end + THINK_CLOSE.len()..];
    }
    out.push_str(rest);
    out.trim().to_string()
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
