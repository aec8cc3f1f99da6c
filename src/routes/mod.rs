//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the token exchange, the chat endpoint and a health probe under a
//! single Axum router. Handlers are thin: they pull the client identity and
//! credential material out of the request and hand them to the resolver.
//!
//! ERRORS
//! ======
//! `GateError` is rendered here as `{"detail": {"msg", "code"}}` with the
//! status mapping below. Nothing but the error's own message reaches the
//! body, so collaborator detail stays in the logs.

pub mod chat;
pub mod client;
pub mod token;

use axum::Router;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::{ErrorCode, GateError};
use crate::state::AppState;

/// Build the service router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/get_token/", post(token::get_token))
        .route("/chat", post(chat::chat))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "outstanding_tokens": state.resolver.outstanding_tokens(),
    }))
}

// =============================================================================
// ERROR RESPONSES
// =============================================================================

fn status_for(err: &GateError) -> StatusCode {
    match err {
        GateError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        GateError::Forbidden(_) => StatusCode::FORBIDDEN,
        GateError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
        GateError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        GateError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "detail": { "msg": self.to_string(), "code": self.error_code() }
        });
        (status_for(&self), Json(body)).into_response()
    }
}

/// Body extraction failures are reported like any other invalid input.
pub(crate) fn body_rejection(rejection: &JsonRejection) -> GateError {
    GateError::Validation(rejection.body_text())
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
