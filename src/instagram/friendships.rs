use std::{collections::HashSet, time::Duration};

use reqwest::StatusCode;
use tokio::time::sleep;

use crate::{
    errors::ApiError,
    instagram::client::{self, InstagramClient},
    types::{AccountSession, FollowingResponse, FriendshipResponse},
};

impl InstagramClient {
    /// Issues the follow mutation for a resolved account id.
    ///
    /// Returns `true` when the resulting friendship is established or
    /// pending (private accounts answer with an outgoing request instead of
    /// an immediate follow). Soft rate limits surface as
    /// [`ApiError::RateLimited`] through the classifier; the caller owns the
    /// wait-and-retry policy.
    pub async fn follow_user(
        &self,
        session: &AccountSession,
        user_id: &str,
    ) -> Result<bool, ApiError> {
        let device = self.device();
        let response = self
            .with_session(
                self.mobile_post(&format!("/friendships/create/{user_id}/")),
                session,
            )
            .form(&[
                ("user_id", user_id),
                ("device_id", device.android_id.as_str()),
                ("_uuid", device.device_uuid.as_str()),
            ])
            .send()
            .await?;

        let response = client::ensure_success(response).await?;
        let body: FriendshipResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Unexpected(format!("malformed response: {e}")))?;

        Ok(body
            .friendship_status
            .map(|status| status.following || status.outgoing_request)
            .unwrap_or(false))
    }

    /// Fetches the handles the session's account currently follows,
    /// lowercased for case-insensitive membership checks.
    ///
    /// Pages through `friendships/{id}/following/` until the cursor runs out
    /// or `amount` handles are collected; 502 responses retry the same page
    /// after a 10-second delay.
    pub async fn following_usernames(
        &self,
        session: &AccountSession,
        amount: usize,
    ) -> Result<HashSet<String>, ApiError> {
        let path = format!("/friendships/{}/following/", session.account_id);
        let mut usernames = HashSet::new();
        let mut max_id: Option<String> = None;

        loop {
            let mut request = self.with_session(
                self.mobile_get(&path).query(&[("count", "200")]),
                session,
            );
            if let Some(cursor) = &max_id {
                request = request.query(&[("max_id", cursor)]);
            }

            let response = request.send().await?;
            if response.status() == StatusCode::BAD_GATEWAY {
                sleep(Duration::from_secs(10)).await;
                continue; // retry the same page
            }

            let response = client::ensure_success(response).await?;
            let body: FollowingResponse = response
                .json()
                .await
                .map_err(|e| ApiError::Unexpected(format!("malformed response: {e}")))?;

            for user in body.users {
                usernames.insert(user.username.to_lowercase());
            }
            if usernames.len() >= amount {
                break;
            }
            match body.next_max_id {
                Some(next) => max_id = Some(next),
                None => break,
            }
        }

        Ok(usernames)
    }
}
