//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the answer resolver, which in turn owns the admission ledger, the
//! live token set and the retrieval/completion collaborators. All of that is
//! in memory and starts empty; a restart forgets every token and ban.

use std::sync::Arc;

use crate::resolver::AnswerResolver;

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; the resolver is Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<AnswerResolver>,
    /// Take the client identity from `X-Forwarded-For` instead of the peer address.
    pub trust_forwarded_for: bool,
}

impl AppState {
    #[must_use]
    pub fn new(resolver: AnswerResolver, trust_forwarded_for: bool) -> Self {
        Self { resolver: Arc::new(resolver), trust_forwarded_for }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
