//! Caller-visible error taxonomy.
//!
//! DESIGN
//! ======
//! Every failure in the request pipeline collapses into one of five
//! `GateError` kinds. Component errors (admission, token, retrieval, LLM)
//! are translated at the resolver boundary; only `GateError` reaches the
//! HTTP layer, which owns the status-code mapping.

use crate::admission::Rejection;

/// Stable machine-readable code and retry hint for an error.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// Credential material is missing (empty secret, absent token header).
    #[error("{0}")]
    Unauthorized(&'static str),

    /// Credential is present but wrong, consumed, or unknown.
    #[error("{0}")]
    Forbidden(&'static str),

    /// Admission ledger rejected the client. The reason is kept for logs only.
    #[error("too many requests")]
    TooManyRequests(Rejection),

    /// Request shape or content is unacceptable.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A collaborator failed or timed out. Detail is logged, never returned.
    #[error("internal server error")]
    Internal { retryable: bool },
}

impl ErrorCode for GateError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "E_UNAUTHORIZED",
            Self::Forbidden(_) => "E_FORBIDDEN",
            Self::TooManyRequests(_) => "E_TOO_MANY_REQUESTS",
            Self::Validation(_) => "E_VALIDATION",
            Self::Internal { .. } => "E_INTERNAL",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::TooManyRequests(_) | Self::Internal { retryable: true })
    }
}

impl From<Rejection> for GateError {
    fn from(rejection: Rejection) -> Self {
        Self::TooManyRequests(rejection)
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
