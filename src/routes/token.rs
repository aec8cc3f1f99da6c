//! Token exchange route.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use super::body_rejection;
use super::client::ClientId;
use crate::error::GateError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub secret: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// `POST /get_token/` — exchange the shared secret for a one-time token.
pub async fn get_token(
    State(state): State<AppState>,
    ClientId(client): ClientId,
    body: Result<Json<TokenRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, GateError> {
    let Json(body) = body.map_err(|rejection| body_rejection(&rejection))?;
    let token = state
        .resolver
        .handle_token_request(&client, &body.secret)?;
    Ok(Json(TokenResponse { token }))
}
