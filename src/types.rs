use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Provider session identifier. `Debug` shows a short preview only so the
/// raw value never reaches logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(raw: impl Into<String>) -> Self {
        SessionToken(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Account id embedded in the token prefix (`<id>%3A…` or `<id>:…`),
    /// when present.
    pub fn embedded_account_id(&self) -> Option<String> {
        let prefix = self
            .0
            .split(|c| c == ':' || c == '%')
            .next()
            .unwrap_or_default();
        if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_digit()) {
            Some(prefix.to_string())
        } else {
            None
        }
    }

    pub fn preview(&self) -> String {
        let head: String = self.0.chars().take(6).collect();
        format!("{head}…")
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken({})", self.preview())
    }
}

/// Credential material owned by the session manager. `Debug` redacts the
/// password.
#[derive(Clone, Default)]
pub struct Credentials {
    pub session_token: Option<SessionToken>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("session_token", &self.session_token)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    Token,
    Password,
}

/// The one live session a run operates on. Replaced in place on re-auth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSession {
    pub account_id: String,
    pub token: SessionToken,
    pub auth_method: AuthMethod,
    pub obtained_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub handle: String,
    pub sequence_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMethod {
    ProfileInfo,
    WebProfile,
    Search,
}

impl ResolutionMethod {
    pub fn label(&self) -> &'static str {
        match self {
            ResolutionMethod::ProfileInfo => "profile info",
            ResolutionMethod::WebProfile => "web profile",
            ResolutionMethod::Search => "search",
        }
    }
}

/// Outcome of resolving one handle to an account id. The id exists only in
/// the `Resolved` arm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved {
        account_id: String,
        method: ResolutionMethod,
    },
    NotFound,
    SessionInvalid,
    Exhausted {
        last_error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowOutcome {
    Followed,
    AlreadyFollowing,
    RateLimitedThenFollowed,
    RateLimitedThenFailed { reason: String },
    SessionInvalid,
    Failed { reason: String },
}

/// Status tag attached to each itemized record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeTag {
    Followed,
    AlreadyFollowing,
    FollowedAfterWait,
    RateLimited,
    UserNotFound,
    SessionExpired,
    Failed,
}

impl OutcomeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeTag::Followed => "followed",
            OutcomeTag::AlreadyFollowing => "already_following",
            OutcomeTag::FollowedAfterWait => "followed_after_wait",
            OutcomeTag::RateLimited => "rate_limited",
            OutcomeTag::UserNotFound => "user_not_found",
            OutcomeTag::SessionExpired => "session_expired",
            OutcomeTag::Failed => "failed",
        }
    }

    /// True when the tag counts toward the `failed` summary bucket.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            OutcomeTag::RateLimited
                | OutcomeTag::UserNotFound
                | OutcomeTag::SessionExpired
                | OutcomeTag::Failed
        )
    }
}

impl fmt::Display for OutcomeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRecord {
    pub username: String,
    pub status: OutcomeTag,
    pub timestamp: DateTime<Utc>,
}

impl ItemRecord {
    pub fn now(username: impl Into<String>, status: OutcomeTag) -> Self {
        ItemRecord {
            username: username.into(),
            status,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub session_token: Option<SessionToken>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_delay_min")]
    pub delay_min: u64,
    #[serde(default = "default_delay_max")]
    pub delay_max: u64,
    #[serde(default = "default_max_targets")]
    pub max_targets: usize,
}

fn default_delay_min() -> u64 {
    30
}

fn default_delay_max() -> u64 {
    90
}

fn default_max_targets() -> usize {
    20
}

impl Default for RunRequest {
    fn default() -> Self {
        RunRequest {
            targets: Vec::new(),
            session_token: None,
            username: None,
            password: None,
            delay_min: default_delay_min(),
            delay_max: default_delay_max(),
            max_targets: default_max_targets(),
        }
    }
}

impl RunRequest {
    pub fn credentials(&self) -> Credentials {
        Credentials {
            session_token: self.session_token.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

/// Final (or partial, on abort) counters of a run.
/// `followed + already_following + failed == total_processed` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub followed: u32,
    pub already_following: u32,
    pub failed: u32,
    pub total_processed: u32,
}

#[derive(Tabled)]
pub struct ItemTableRow {
    pub username: String,
    pub status: String,
    pub time: String,
}

/// Session snapshot persisted by the CLI between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub username: Option<String>,
    pub account_id: String,
    pub session_token: SessionToken,
    pub auth_method: AuthMethod,
    pub obtained_at: DateTime<Utc>,
}

// Wire shapes of the provider responses the client deserializes.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireUser {
    pub pk: u64,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub is_private: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub logged_in_user: Option<WireUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUserResponse {
    pub user: WireUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfoResponse {
    pub user: WireUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchUsersResponse {
    #[serde(default)]
    pub users: Vec<WireUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebProfileResponse {
    pub data: WebProfileData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebProfileData {
    #[serde(default)]
    pub user: Option<WebProfileUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebProfileUser {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendshipResponse {
    #[serde(default)]
    pub friendship_status: Option<FriendshipStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendshipStatus {
    #[serde(default)]
    pub following: bool,
    #[serde(default)]
    pub outgoing_request: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowingResponse {
    #[serde(default)]
    pub users: Vec<WireUser>,
    #[serde(default)]
    pub next_max_id: Option<String>,
}

/// Envelope fields every provider payload may carry. The response
/// classifier reads these and nothing else.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error_type: Option<String>,
}
