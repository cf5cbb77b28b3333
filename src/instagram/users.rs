use std::time::Duration;

use reqwest::StatusCode;
use tokio::time::sleep;

use crate::{
    errors::ApiError,
    instagram::client::{self, InstagramClient},
    types::{AccountSession, SearchUsersResponse, UserInfoResponse, WebProfileResponse},
};

impl InstagramClient {
    /// Resolves a handle to its account id via the mobile profile endpoint.
    ///
    /// This is the primary lookup surface (`users/{handle}/usernameinfo/`).
    /// A missing account maps to [`ApiError::NotFound`], a dead session to
    /// [`ApiError::SessionInvalid`]; 502 responses are retried in place with
    /// a 10-second delay.
    ///
    /// # Arguments
    ///
    /// * `session` - Established session the lookup runs under
    /// * `handle` - Normalized account handle, no `@`, no URL parts
    ///
    /// # Returns
    ///
    /// The numeric account id as a string.
    pub async fn user_id_by_username(
        &self,
        session: &AccountSession,
        handle: &str,
    ) -> Result<String, ApiError> {
        loop {
            let request = self.with_session(
                self.mobile_get(&format!("/users/{handle}/usernameinfo/")),
                session,
            );
            let response = request.send().await?;
            if response.status() == StatusCode::BAD_GATEWAY {
                sleep(Duration::from_secs(10)).await;
                continue; // retry
            }

            let response = client::ensure_success(response).await?;
            let body: UserInfoResponse = response
                .json()
                .await
                .map_err(|e| ApiError::Unexpected(format!("malformed response: {e}")))?;
            return Ok(body.user.pk.to_string());
        }
    }

    /// Resolves a handle through the public web profile surface.
    ///
    /// Fallback for accounts the mobile endpoint refuses to serve. Uses a
    /// browser identity plus the public app id; only the session cookie is
    /// forwarded, the bearer authorization belongs to the mobile host.
    pub async fn web_profile_user_id(
        &self,
        session: &AccountSession,
        handle: &str,
    ) -> Result<String, ApiError> {
        loop {
            let request = self
                .web_get("/users/web_profile_info/")
                .query(&[("username", handle)])
                .header("Cookie", format!("sessionid={}", session.token.as_str()));
            let response = request.send().await?;
            if response.status() == StatusCode::BAD_GATEWAY {
                sleep(Duration::from_secs(10)).await;
                continue; // retry
            }

            let response = client::ensure_success(response).await?;
            let body: WebProfileResponse = response
                .json()
                .await
                .map_err(|e| ApiError::Unexpected(format!("malformed response: {e}")))?;
            return match body.data.user {
                Some(user) if !user.id.is_empty() => Ok(user.id),
                _ => Err(ApiError::NotFound),
            };
        }
    }

    /// Resolves a handle through user search, the last-resort method.
    ///
    /// Only an exact case-insensitive username match counts; search returning
    /// lookalikes must not follow the wrong account.
    pub async fn search_user_id(
        &self,
        session: &AccountSession,
        handle: &str,
    ) -> Result<String, ApiError> {
        loop {
            let request = self.with_session(
                self.mobile_get("/users/search/").query(&[("q", handle)]),
                session,
            );
            let response = request.send().await?;
            if response.status() == StatusCode::BAD_GATEWAY {
                sleep(Duration::from_secs(10)).await;
                continue; // retry
            }

            let response = client::ensure_success(response).await?;
            let body: SearchUsersResponse = response
                .json()
                .await
                .map_err(|e| ApiError::Unexpected(format!("malformed response: {e}")))?;
            return body
                .users
                .into_iter()
                .find(|user| user.username.eq_ignore_ascii_case(handle))
                .map(|user| user.pk.to_string())
                .ok_or(ApiError::NotFound);
        }
    }
}
