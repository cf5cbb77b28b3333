use std::{collections::HashSet, sync::Arc, time::Duration};

use crate::{
    engine::{FOLLOW_JITTER_SECS, Pacer, RATE_LIMIT_PENALTY},
    errors::ApiError,
    instagram::InstagramApi,
    types::{AccountSession, FollowOutcome},
    utils, warning,
};

/// Issues follow mutations with the skip path and the single penalty-wait
/// retry.
///
/// The prefetched following set stays optional: without it every target is
/// simply attempted. Re-authentication policy does not live here; a
/// session-invalidity signal is returned as-is for the run controller.
pub struct FollowExecutor {
    api: Arc<dyn InstagramApi>,
    pacer: Arc<dyn Pacer>,
    following: Option<HashSet<String>>,
}

impl FollowExecutor {
    pub fn new(api: Arc<dyn InstagramApi>, pacer: Arc<dyn Pacer>) -> Self {
        FollowExecutor {
            api,
            pacer,
            following: None,
        }
    }

    /// Installs the prefetched set of lowercased handles the account
    /// already follows.
    pub fn set_following(&mut self, following: HashSet<String>) {
        self.following = Some(following);
    }

    /// Membership check against the prefetched set, case-insensitive.
    /// Always `false` when no set was prefetched.
    pub fn is_already_following(&self, handle: &str) -> bool {
        self.following
            .as_ref()
            .map(|set| set.contains(&handle.to_lowercase()))
            .unwrap_or(false)
    }

    /// Follows one resolved account.
    ///
    /// Known targets short-circuit to `AlreadyFollowing` with zero network
    /// calls. A soft rate limit buys the provider's penalty wait and exactly
    /// one more attempt; whatever that attempt says is final for the target.
    pub async fn follow(
        &self,
        session: &AccountSession,
        handle: &str,
        account_id: &str,
    ) -> FollowOutcome {
        if self.is_already_following(handle) {
            return FollowOutcome::AlreadyFollowing;
        }

        // Short jitter so follow mutations never fire back-to-back with the
        // lookup that preceded them.
        let jitter = utils::uniform_secs(FOLLOW_JITTER_SECS.0, FOLLOW_JITTER_SECS.1);
        self.pacer.pause(Duration::from_secs_f64(jitter)).await;

        match self.api.follow_user(session, account_id).await {
            Ok(true) => FollowOutcome::Followed,
            Ok(false) => FollowOutcome::Failed {
                reason: "follow was not confirmed".into(),
            },
            Err(ApiError::RateLimited(reason)) => {
                warning!(
                    "Rate limited ({}); waiting {} seconds before one retry...",
                    reason,
                    RATE_LIMIT_PENALTY.as_secs()
                );
                self.pacer.pause(RATE_LIMIT_PENALTY).await;

                match self.api.follow_user(session, account_id).await {
                    Ok(true) => FollowOutcome::RateLimitedThenFollowed,
                    Ok(false) => FollowOutcome::RateLimitedThenFailed {
                        reason: "follow was not confirmed after waiting".into(),
                    },
                    Err(err) if err.is_session_invalid() => FollowOutcome::SessionInvalid,
                    // A second rate limit lands here as well; no third attempt.
                    Err(err) => FollowOutcome::RateLimitedThenFailed {
                        reason: err.to_string(),
                    },
                }
            }
            Err(err) if err.is_session_invalid() => FollowOutcome::SessionInvalid,
            Err(err) => FollowOutcome::Failed {
                reason: err.to_string(),
            },
        }
    }
}
