//! Token authority — single-use chat credentials.
//!
//! ARCHITECTURE
//! ============
//! A token is a random 32-byte hex string held in an in-memory live set.
//! Issuing inserts; consuming removes. Nothing ties a token to a client or
//! a deadline: any holder may redeem it once, for as long as the process
//! lives.
//!
//! TRADE-OFFS
//! ==========
//! Consumption is destructive (`HashSet::remove` under the lock) so a token
//! can never be spent twice, even by racing requests. The set is not
//! persisted; a restart invalidates every outstanding token.

use std::collections::HashSet;
use std::fmt::Write;
use std::sync::Mutex;

use rand::Rng;
use tracing::debug;

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// The token was never issued or has already been spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("token is invalid or already used")]
pub struct InvalidToken;

#[derive(Default)]
pub struct TokenAuthority {
    live: Mutex<HashSet<String>>,
}

impl TokenAuthority {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh token and add it to the live set.
    pub fn issue(&self) -> String {
        let mut live = self.lock();
        // A 256-bit collision is not expected, but the live set must stay a set.
        let token = loop {
            let candidate = generate_token();
            if !live.contains(&candidate) {
                break candidate;
            }
        };
        live.insert(token.clone());
        debug!(outstanding = live.len(), "tokens: issued");
        token
    }

    /// Spend `token`. Exactly one caller can succeed per issued token.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidToken`] if the token is unknown or already consumed.
    pub fn consume(&self, token: &str) -> Result<(), InvalidToken> {
        let mut live = self.lock();
        if live.remove(token) {
            debug!(outstanding = live.len(), "tokens: consumed");
            Ok(())
        } else {
            Err(InvalidToken)
        }
    }

    /// Number of issued, unspent tokens.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.live
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "tokens_test.rs"]
mod tests;
