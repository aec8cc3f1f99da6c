//! Chat route.
//!
//! The token travels in the `x-api-key` header; the body carries only the
//! query. A malformed body is rejected before the token is looked at, so it
//! does not cost the caller a token.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use super::body_rejection;
use super::client::ClientId;
use crate::error::GateError;
use crate::state::AppState;

pub const TOKEN_HEADER: &str = "x-api-key";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
}

/// `POST /chat` — spend a token and answer the query.
pub async fn chat(
    State(state): State<AppState>,
    ClientId(client): ClientId,
    headers: HeaderMap,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, GateError> {
    let token = headers
        .get(TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .trim();
    if token.is_empty() {
        return Err(GateError::Unauthorized("token is required"));
    }
    let Json(body) = body.map_err(|rejection| body_rejection(&rejection))?;

    let outcome = state
        .resolver
        .handle_chat_request(&client, token, &body.query)
        .await?;
    Ok(Json(ChatResponse { answer: outcome.into_answer() }))
}
