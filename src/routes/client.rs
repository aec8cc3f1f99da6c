//! Client identity extractor.
//!
//! The admission ledger keys on this string. By default it is the peer IP
//! from `ConnectInfo`; behind a reverse proxy (`TRUST_FORWARDED_FOR=true`)
//! the last `X-Forwarded-For` entry is used instead. That entry is the one
//! the proxy appended; anything before it is caller-supplied and can be
//! forged. Without either, all such requests share the `"unknown"` bucket.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRef, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;

use crate::state::AppState;

const FORWARDED_FOR: &str = "x-forwarded-for";
const UNKNOWN_CLIENT: &str = "unknown";

/// Identity used for admission accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(pub String);

impl<S> FromRequestParts<S> for ClientId
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        let forwarded = if app_state.trust_forwarded_for { forwarded_client(&parts.headers) } else { None };

        Ok(Self(forwarded.or(peer).unwrap_or_else(|| UNKNOWN_CLIENT.to_string())))
    }
}

/// Last non-empty entry of `X-Forwarded-For`: the peer seen by the proxy.
pub(crate) fn forwarded_client(headers: &HeaderMap) -> Option<String> {
    headers
        .get(FORWARDED_FOR)?
        .to_str()
        .ok()?
        .rsplit(',')
        .map(str::trim)
        .find(|entry| !entry.is_empty())
        .map(str::to_owned)
}
