use chrono::Utc;
use reqwest::{Response, header::SET_COOKIE};

use crate::{
    errors::{ApiError, AuthError},
    instagram::client::{self, InstagramClient},
    types::{AccountSession, AuthMethod, CurrentUserResponse, LoginResponse, SessionToken},
};

impl InstagramClient {
    /// Performs a username/password login against the mobile API.
    ///
    /// Posts the credential form together with the device identity, so the
    /// platform associates the minted session with a consistent device. On
    /// success the session id arrives as a `Set-Cookie` header and the
    /// logged-in user in the response body.
    ///
    /// # Arguments
    ///
    /// * `username` - Account handle to log in as
    /// * `password` - Account password; never logged
    ///
    /// # Returns
    ///
    /// A fresh [`AccountSession`] with `auth_method = Password`, or the
    /// classified [`AuthError`] (`BadPassword`, `TwoFactorRequired`,
    /// `ChallengeRequired`, or `Unknown`).
    pub async fn login_with_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AccountSession, AuthError> {
        let device = self.device();
        let response = self
            .mobile_post("/accounts/login/")
            .form(&[
                ("username", username),
                ("password", password),
                ("device_id", device.android_id.as_str()),
                ("guid", device.device_uuid.as_str()),
                ("phone_id", device.phone_id.as_str()),
                ("login_attempt_count", "0"),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Unknown(format!("network error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(client::classify_login_failure(status, &body));
        }

        let token = session_cookie(&response)
            .ok_or_else(|| AuthError::Unknown("login succeeded but no session was issued".into()))?;
        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Unknown(format!("malformed login response: {e}")))?;

        let account_id = match body.logged_in_user {
            Some(user) => user.pk.to_string(),
            None => token.embedded_account_id().unwrap_or_default(),
        };
        if account_id.is_empty() {
            return Err(AuthError::Unknown(
                "login response did not identify the account".into(),
            ));
        }

        Ok(AccountSession {
            account_id,
            token,
            auth_method: AuthMethod::Password,
            obtained_at: Utc::now(),
        })
    }

    /// Adopts an existing session token.
    ///
    /// Builds a provisional session from the token (the account id is parsed
    /// from the token prefix when present) and immediately probes
    /// `accounts/current_user/` to prove the token is alive; the probe also
    /// supplies the authoritative account id. A rejected probe maps to
    /// [`AuthError::InvalidToken`] so the caller can fall back to a
    /// credential login.
    pub async fn login_by_token(&self, token: &SessionToken) -> Result<AccountSession, AuthError> {
        let provisional = AccountSession {
            account_id: token.embedded_account_id().unwrap_or_default(),
            token: token.clone(),
            auth_method: AuthMethod::Token,
            obtained_at: Utc::now(),
        };

        match self.current_account(&provisional).await {
            Ok(account_id) => Ok(AccountSession {
                account_id,
                ..provisional
            }),
            Err(err) if err.is_session_invalid() => Err(AuthError::InvalidToken),
            Err(err) => Err(AuthError::Unknown(err.to_string())),
        }
    }

    /// Liveness probe: fetches the session's own account and returns its id.
    pub async fn current_account(&self, session: &AccountSession) -> Result<String, ApiError> {
        let request = self.with_session(self.mobile_get("/accounts/current_user/"), session);
        let response = client::ensure_success(request.send().await?).await?;
        let body: CurrentUserResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Unexpected(format!("malformed response: {e}")))?;
        Ok(body.user.pk.to_string())
    }
}

/// Extracts the `sessionid` cookie from a login response.
fn session_cookie(response: &Response) -> Option<SessionToken> {
    for value in response.headers().get_all(SET_COOKIE) {
        let Ok(raw) = value.to_str() else { continue };
        let Some(rest) = raw.trim_start().strip_prefix("sessionid=") else {
            continue;
        };
        let token = rest.split(';').next().unwrap_or_default().trim_matches('"');
        if !token.is_empty() {
            return Some(SessionToken::new(token));
        }
    }
    None
}
