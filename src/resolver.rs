//! Answer resolver — token exchange and the chat request pipeline.
//!
//! DESIGN
//! ======
//! `AnswerResolver` owns one `AdmissionLedger` and one `TokenAuthority` and
//! runs both endpoints through them, so a client has a single request budget
//! whichever endpoint it hits. A chat request spends its token first; every
//! later failure leaves the token consumed.
//!
//! Retrieval and completion run together under `upstream_timeout`. Neither
//! the ledger lock nor the token lock is held across those awaits.
//!
//! ERRORS
//! ======
//! Component outcomes are translated to `GateError` here. Collaborator
//! failures are logged with their detail and surface as a bare `Internal`.

use std::sync::Arc;
use std::time::Instant;

use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use crate::admission::AdmissionLedger;
use crate::config::AnswerConfig;
use crate::error::{ErrorCode, GateError};
use crate::llm::{self, LlmChat};
use crate::retrieval::{Grounding, RetrievalGate};
use crate::tokens::TokenAuthority;

// =============================================================================
// TYPES
// =============================================================================

/// Successful result of a chat request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    /// Completion text generated from grounded context.
    Answered(String),
    /// Retrieval found nothing relevant enough; carries the fixed apology.
    NoConfidentAnswer(String),
}

impl ChatOutcome {
    /// Text returned to the caller for either outcome.
    #[must_use]
    pub fn into_answer(self) -> String {
        match self {
            Self::Answered(text) | Self::NoConfidentAnswer(text) => text,
        }
    }
}

/// Build the completion prompt from retrieved context and the user question.
#[must_use]
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "Answer the question based only on the following context:\n\n{context}\n\n---\n\n\
         Answer the question based on the above context: {question}"
    )
}

// =============================================================================
// RESOLVER
// =============================================================================

pub struct AnswerResolver {
    ledger: AdmissionLedger,
    tokens: TokenAuthority,
    gate: RetrievalGate,
    llm: Arc<dyn LlmChat>,
    secret_digest: [u8; 32],
    config: AnswerConfig,
}

impl AnswerResolver {
    #[must_use]
    pub fn new(
        ledger: AdmissionLedger,
        gate: RetrievalGate,
        llm: Arc<dyn LlmChat>,
        secret: &str,
        config: AnswerConfig,
    ) -> Self {
        Self {
            ledger,
            tokens: TokenAuthority::new(),
            gate,
            llm,
            secret_digest: digest(secret),
            config,
        }
    }

    /// Tokens issued but not yet spent.
    #[must_use]
    pub fn outstanding_tokens(&self) -> usize {
        self.tokens.outstanding()
    }

    /// Exchange the shared secret for a one-time token.
    ///
    /// # Errors
    ///
    /// `Unauthorized` for an empty secret, `TooManyRequests` when the ledger
    /// rejects the client, `Forbidden` for a wrong secret.
    pub fn handle_token_request(&self, client: &str, secret: &str) -> Result<String, GateError> {
        if secret.is_empty() {
            return Err(GateError::Unauthorized("secret is required"));
        }
        self.ledger.check(client)?;
        if !self.secret_matches(secret) {
            warn!(client = %client, "resolver: token request with wrong secret");
            return Err(GateError::Forbidden("invalid secret"));
        }
        let token = self.tokens.issue();
        info!(client = %client, "resolver: token issued");
        Ok(token)
    }

    /// Spend `token` and answer `query` from the knowledge store.
    ///
    /// # Errors
    ///
    /// `Unauthorized` for a missing token, `Forbidden` for an unknown or spent
    /// token, `TooManyRequests` on admission rejection, `Validation` for an
    /// empty or oversized query, `Internal` when retrieval or completion fails
    /// or exceeds the upstream timeout.
    pub async fn handle_chat_request(&self, client: &str, token: &str, query: &str) -> Result<ChatOutcome, GateError> {
        if token.is_empty() {
            return Err(GateError::Unauthorized("token is required"));
        }
        if self.tokens.consume(token).is_err() {
            warn!(client = %client, "resolver: invalid or reused token");
            return Err(GateError::Forbidden("invalid or expired token"));
        }
        self.ledger.check(client)?;
        let query = self.validate_query(query)?;

        let started = Instant::now();
        let outcome = tokio::time::timeout(self.config.upstream_timeout, self.answer(query))
            .await
            .unwrap_or_else(|_| {
                error!(
                    client = %client,
                    timeout_ms = self.config.upstream_timeout.as_millis(),
                    "resolver: upstream timed out"
                );
                Err(GateError::Internal { retryable: true })
            })?;

        info!(
            client = %client,
            answered = matches!(outcome, ChatOutcome::Answered(_)),
            elapsed_ms = started.elapsed().as_millis(),
            "resolver: chat resolved"
        );
        Ok(outcome)
    }

    async fn answer(&self, query: &str) -> Result<ChatOutcome, GateError> {
        let grounding = self
            .gate
            .resolve_context(query)
            .await
            .map_err(|e| internal("retrieval", &e))?;

        let context = match grounding {
            Grounding::Grounded(context) => context,
            Grounding::Ungrounded => {
                return Ok(ChatOutcome::NoConfidentAnswer(self.config.no_answer_message.clone()));
            }
        };

        let prompt = build_prompt(&context, query);
        debug!(prompt_chars = prompt.len(), "resolver: requesting completion");
        let text = llm::complete(self.llm.as_ref(), self.config.max_tokens, &self.config.system_prompt, &prompt)
            .await
            .map_err(|e| internal("completion", &e))?;
        Ok(ChatOutcome::Answered(text))
    }

    fn validate_query<'q>(&self, query: &'q str) -> Result<&'q str, GateError> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(GateError::Validation("query must not be empty".into()));
        }
        if trimmed.chars().count() > self.config.max_query_chars {
            return Err(GateError::Validation(format!(
                "query exceeds {} characters",
                self.config.max_query_chars
            )));
        }
        Ok(trimmed)
    }

    fn secret_matches(&self, candidate: &str) -> bool {
        // Compare fixed-length digests so timing does not depend on the prefix match.
        let candidate = digest(candidate);
        self.secret_digest
            .iter()
            .zip(candidate.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

fn internal(stage: &'static str, err: &impl ErrorCode) -> GateError {
    error!(stage, code = err.error_code(), error = %err, "resolver: upstream failure");
    GateError::Internal { retryable: err.retryable() }
}

#[cfg(test)]
#[path = "resolver_test.rs"]
mod tests;
