//! Error taxonomy shared across the crate.
//!
//! Authentication failures, classified API failures, and run-fatal errors
//! live in separate enums so callers can match on the category they care
//! about. API responses are classified into [`ApiError`] in exactly one
//! place (`instagram::client`); everything downstream matches on the enum
//! and never inspects provider payloads.

use thiserror::Error;

use crate::types::RunSummary;

/// Failure to establish an authenticated session.
///
/// All variants are run-fatal: the engine reports them and stops without
/// processing any target. `TwoFactorRequired` and `ChallengeRequired` are
/// never retried automatically since both need interactive verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("session token rejected by the platform")]
    InvalidToken,

    #[error("username or password rejected")]
    BadPassword,

    #[error("two-factor verification required; complete it in the app and retry")]
    TwoFactorRequired,

    #[error("account challenge pending; resolve it in the app and retry")]
    ChallengeRequired,

    #[error("authentication failed: {0}")]
    Unknown(String),
}

/// A classified failure from a single API call against the platform.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The session the call was made with is no longer accepted.
    #[error("session no longer valid")]
    SessionInvalid,

    /// The requested account does not exist (or is inaccessible).
    #[error("user not found")]
    NotFound,

    /// The platform asked us to slow down. Carries the provider message.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Transport-level failure (DNS, TLS, timeout, connection reset).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Anything the classifier could not map onto a known category.
    #[error("unexpected API response: {0}")]
    Unexpected(String),
}

impl ApiError {
    /// True for failures that invalidate the session itself rather than
    /// the single call that produced them.
    pub fn is_session_invalid(&self) -> bool {
        matches!(self, ApiError::SessionInvalid)
    }
}

/// A condition that aborts a run as a whole.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("session lost: {0}")]
    SessionLost(String),
}

/// A failed run together with the counters accumulated before the abort.
///
/// The partial summary still satisfies
/// `followed + already_following + failed == total_processed`.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct RunFailure {
    pub error: RunError,
    pub summary: RunSummary,
}

impl RunFailure {
    pub fn new(error: RunError, summary: RunSummary) -> Self {
        RunFailure { error, summary }
    }
}
