use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::{Client, RequestBuilder, Response, StatusCode};

use crate::{
    config,
    errors::{ApiError, AuthError},
    instagram::DeviceProfile,
    types::{AccountSession, ApiStatus},
};

/// Browser identity for the web API surface; the mobile user agent is not
/// accepted there.
const WEB_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// HTTP client for the Instagram private and web APIs.
///
/// Owns one `reqwest::Client`, the injected [`DeviceProfile`], and the
/// resolved endpoint configuration. Endpoint methods live in the sibling
/// modules (`auth`, `users`, `friendships`); this type provides the request
/// plumbing they share.
pub struct InstagramClient {
    http: Client,
    device: DeviceProfile,
    api_url: String,
    web_url: String,
    app_id: String,
    timeout: Duration,
}

impl InstagramClient {
    /// Creates a client around the given device identity, reading endpoint
    /// URLs and the request timeout from the configuration.
    pub fn new(device: DeviceProfile) -> Self {
        InstagramClient {
            http: Client::new(),
            device,
            api_url: config::api_url(),
            web_url: config::web_url(),
            app_id: config::app_id(),
            timeout: Duration::from_secs(config::request_timeout_secs()),
        }
    }

    pub fn device(&self) -> &DeviceProfile {
        &self.device
    }

    /// GET against the mobile host with the device identity attached.
    pub(crate) fn mobile_get(&self, path: &str) -> RequestBuilder {
        self.decorate_mobile(self.http.get(format!("{}{}", self.api_url, path)))
    }

    /// POST against the mobile host with the device identity attached.
    pub(crate) fn mobile_post(&self, path: &str) -> RequestBuilder {
        self.decorate_mobile(self.http.post(format!("{}{}", self.api_url, path)))
    }

    /// GET against the web host with a browser identity and the public
    /// application id.
    pub(crate) fn web_get(&self, path: &str) -> RequestBuilder {
        self.http
            .get(format!("{}{}", self.web_url, path))
            .timeout(self.timeout)
            .header("User-Agent", WEB_USER_AGENT)
            .header("X-IG-App-ID", &self.app_id)
    }

    fn decorate_mobile(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .timeout(self.timeout)
            .header("User-Agent", self.device.user_agent())
            .header("X-IG-Device-ID", &self.device.device_uuid)
            .header("X-IG-Android-ID", &self.device.android_id)
    }

    /// Attaches the session cookie and bearer authorization of an
    /// established session to a request.
    pub(crate) fn with_session(
        &self,
        builder: RequestBuilder,
        session: &AccountSession,
    ) -> RequestBuilder {
        builder
            .header("Cookie", format!("sessionid={}", session.token.as_str()))
            .header("Authorization", bearer_authorization(session))
    }
}

/// `Bearer IGT:2:<base64 {ds_user_id, sessionid}>`, the authorization scheme
/// the mobile API expects alongside the session cookie.
pub(crate) fn bearer_authorization(session: &AccountSession) -> String {
    let payload = serde_json::json!({
        "ds_user_id": session.account_id,
        "sessionid": session.token.as_str(),
    });
    format!("Bearer IGT:2:{}", STANDARD.encode(payload.to_string()))
}

/// Passes successful responses through and turns everything else into exactly
/// one [`ApiError`].
///
/// This is the single place provider payloads are inspected. Components
/// upstream match on the enum and never look at `status` / `message` /
/// `error_type` strings themselves.
pub(crate) async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_failure(status, &body))
}

/// Maps an HTTP status plus the provider's error envelope onto the error
/// taxonomy.
///
/// Order matters: a missing user is `NotFound` even when the envelope also
/// carries auth hints, and soft rate limits arrive as HTTP 400 with a
/// "wait a few minutes" message, so the message check runs before the
/// generic fallback.
pub fn classify_failure(status: StatusCode, body: &str) -> ApiError {
    let envelope: ApiStatus = serde_json::from_str(body).unwrap_or_default();
    let message = envelope.message.unwrap_or_default();
    let error_type = envelope.error_type.unwrap_or_default();

    if status == StatusCode::NOT_FOUND || message.eq_ignore_ascii_case("user not found") {
        return ApiError::NotFound;
    }
    if message == "login_required"
        || error_type == "login_required"
        || status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
    {
        return ApiError::SessionInvalid;
    }
    if status == StatusCode::TOO_MANY_REQUESTS
        || error_type == "rate_limit_error"
        || message.to_lowercase().contains("wait a few minutes")
    {
        let reason = if message.is_empty() {
            format!("HTTP {status}")
        } else {
            message
        };
        return ApiError::RateLimited(reason);
    }

    let reason = if message.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {message}")
    };
    ApiError::Unexpected(reason)
}

/// Classifies a failed login attempt. Lives next to [`classify_failure`] so
/// provider strings stay confined to this module.
pub fn classify_login_failure(status: StatusCode, body: &str) -> AuthError {
    let envelope: ApiStatus = serde_json::from_str(body).unwrap_or_default();
    let message = envelope.message.unwrap_or_default();
    let error_type = envelope.error_type.unwrap_or_default();

    if error_type == "bad_password" || message == "bad_password" {
        return AuthError::BadPassword;
    }
    if error_type == "two_factor_required" || message == "two_factor_required" {
        return AuthError::TwoFactorRequired;
    }
    if error_type == "checkpoint_challenge_required" || message == "challenge_required" {
        return AuthError::ChallengeRequired;
    }
    if message == "login_required"
        || status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
    {
        return AuthError::InvalidToken;
    }

    let reason = if message.is_empty() {
        format!("HTTP {status}")
    } else {
        message
    };
    AuthError::Unknown(reason)
}
