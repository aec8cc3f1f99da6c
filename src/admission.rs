//! Admission ledger — per-client sliding-window limiting with temporary bans.
//!
//! DESIGN
//! ======
//! Request timestamps per client live in `HashMap<String, VecDeque<Instant>>`;
//! active bans in `HashMap<String, Instant>` keyed the same way. A single
//! mutex guards both maps so that ban lookup, prune, append, evaluate and
//! ban install happen as one critical section per check.
//!
//! TRADE-OFFS
//! ==========
//! The window is recomputed from raw timestamps on every check, so cost is
//! linear in history length. Bans cap that length at `rate_limit + 1`.
//! Stale entries are pruned lazily when their client is checked again;
//! idle clients keep their (bounded) history until then.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::config::env_parse;

const DEFAULT_RATE_LIMIT: usize = 60;
const DEFAULT_TIME_WINDOW_SECS: u64 = 60;
const DEFAULT_TEMP_BAN_DURATION_SECS: u64 = 300;

/// Longest ban the ledger will install; longer configured bans are clamped.
pub const MAX_BAN_DURATION: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionConfig {
    /// Maximum number of requests tolerated inside one window.
    pub rate_limit: usize,
    pub window: Duration,
    pub ban_duration: Duration,
}

impl AdmissionConfig {
    /// Read `RATE_LIMIT`, `TIME_WINDOW` and `TEMP_BAN_DURATION` (seconds).
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            rate_limit: env_parse("RATE_LIMIT", DEFAULT_RATE_LIMIT),
            window: Duration::from_secs(env_parse("TIME_WINDOW", DEFAULT_TIME_WINDOW_SECS)),
            ban_duration: Duration::from_secs(env_parse("TEMP_BAN_DURATION", DEFAULT_TEMP_BAN_DURATION_SECS)),
        }
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            rate_limit: DEFAULT_RATE_LIMIT,
            window: Duration::from_secs(DEFAULT_TIME_WINDOW_SECS),
            ban_duration: Duration::from_secs(DEFAULT_TEMP_BAN_DURATION_SECS),
        }
    }
}

// =============================================================================
// REJECTION
// =============================================================================

/// Why a client was refused admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// This request pushed the client over the limit; a ban was installed.
    #[error("rate limit exceeded")]
    RateLimited,
    /// The client is serving an earlier ban.
    #[error("client is temporarily banned")]
    Banned,
}

// =============================================================================
// LEDGER
// =============================================================================

pub struct AdmissionLedger {
    inner: Mutex<LedgerInner>,
    config: AdmissionConfig,
}

#[derive(Default)]
struct LedgerInner {
    /// Per-client request timestamps inside the trailing window.
    history: HashMap<String, VecDeque<Instant>>,
    /// Per-client ban expiry.
    bans: HashMap<String, Instant>,
}

impl AdmissionLedger {
    #[must_use]
    pub fn new(config: AdmissionConfig) -> Self {
        Self { inner: Mutex::new(LedgerInner::default()), config }
    }

    #[must_use]
    pub fn config(&self) -> AdmissionConfig {
        self.config
    }

    /// Decide whether `client` may proceed, recording the attempt.
    ///
    /// The timestamp is taken after the lock is held so that checks for the
    /// same client observe non-decreasing times.
    ///
    /// # Errors
    ///
    /// Returns [`Rejection::Banned`] while a ban is active and
    /// [`Rejection::RateLimited`] when this request exceeds the limit.
    pub fn check(&self, client: &str) -> Result<(), Rejection> {
        let mut guard = self.lock();
        let now = Instant::now();
        evaluate(&mut guard, self.config, client, now)
    }

    /// Internal: check with an explicit timestamp (for testing).
    #[cfg(test)]
    pub(crate) fn check_at(&self, client: &str, now: Instant) -> Result<(), Rejection> {
        let mut guard = self.lock();
        evaluate(&mut guard, self.config, client, now)
    }

    /// Whether `client` has a ban that is still in force at `now`.
    #[cfg(test)]
    pub(crate) fn is_banned_at(&self, client: &str, now: Instant) -> bool {
        self.lock().bans.get(client).is_some_and(|&expiry| now < expiry)
    }

    /// Number of recorded timestamps for `client` (unpruned).
    #[cfg(test)]
    pub(crate) fn history_len(&self, client: &str) -> usize {
        self.lock().history.get(client).map_or(0, VecDeque::len)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerInner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for AdmissionLedger {
    fn default() -> Self {
        Self::new(AdmissionConfig::default())
    }
}

fn evaluate(inner: &mut LedgerInner, cfg: AdmissionConfig, client: &str, now: Instant) -> Result<(), Rejection> {
    // Active bans short-circuit before history is touched.
    if let Some(&expiry) = inner.bans.get(client) {
        if now < expiry {
            warn!(
                client,
                remaining_secs = expiry.saturating_duration_since(now).as_secs(),
                "admission: banned client rejected"
            );
            return Err(Rejection::Banned);
        }
        inner.bans.remove(client);
        info!(client, "admission: ban expired");
    }

    let history = inner.history.entry(client.to_owned()).or_default();
    prune_window(history, now, cfg.window);
    history.push_back(now);
    let count = history.len();

    if count > cfg.rate_limit {
        inner.bans.insert(client.to_owned(), ban_expiry(now, cfg.ban_duration));
        error!(
            client,
            request_count = count,
            window_secs = cfg.window.as_secs(),
            ban_secs = cfg.ban_duration.as_secs(),
            "admission: rate limit exceeded, client banned"
        );
        return Err(Rejection::RateLimited);
    }

    Ok(())
}

// =============================================================================
// HELPERS
// =============================================================================

fn ban_expiry(now: Instant, ban_duration: Duration) -> Instant {
    now.checked_add(ban_duration.min(MAX_BAN_DURATION)).unwrap_or(now)
}

/// Drop timestamps that are at least `window` old.
fn prune_window(deque: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = deque.front() {
        if now.saturating_duration_since(front) >= window {
            deque.pop_front();
        } else {
            break;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "admission_test.rs"]
mod tests;
