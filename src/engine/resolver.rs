use std::sync::Arc;

use crate::{
    engine::{METHOD_RETRY_DELAY, Pacer},
    errors::ApiError,
    instagram::InstagramApi,
    types::{AccountSession, Resolution, ResolutionMethod},
};

const METHOD_ORDER: [ResolutionMethod; 3] = [
    ResolutionMethod::ProfileInfo,
    ResolutionMethod::WebProfile,
    ResolutionMethod::Search,
];

const TRIES_PER_METHOD: usize = 2;

/// Resolves handles to account ids through an ordered ladder of lookup
/// methods.
///
/// The lookup endpoints are unreliable and version-sensitive, so each method
/// gets up to two tries (short fixed delay in between) before the next one
/// is attempted. Two answers short-circuit the ladder: a definitive
/// not-found (the account genuinely does not exist, asking another endpoint
/// will not change that) and a session-invalidity signal (every further call
/// would fail identically, the run controller owns recovery).
pub struct IdentifierResolver {
    api: Arc<dyn InstagramApi>,
    pacer: Arc<dyn Pacer>,
}

impl IdentifierResolver {
    pub fn new(api: Arc<dyn InstagramApi>, pacer: Arc<dyn Pacer>) -> Self {
        IdentifierResolver { api, pacer }
    }

    pub async fn resolve(&self, session: &AccountSession, handle: &str) -> Resolution {
        let mut last_error: Option<String> = None;

        for method in METHOD_ORDER {
            for attempt in 1..=TRIES_PER_METHOD {
                let result = match method {
                    ResolutionMethod::ProfileInfo => {
                        self.api.user_id_by_username(session, handle).await
                    }
                    ResolutionMethod::WebProfile => {
                        self.api.web_profile_user_id(session, handle).await
                    }
                    ResolutionMethod::Search => self.api.search_user_id(session, handle).await,
                };

                match result {
                    Ok(account_id) => return Resolution::Resolved { account_id, method },
                    Err(err) if err.is_session_invalid() => return Resolution::SessionInvalid,
                    Err(ApiError::NotFound) => return Resolution::NotFound,
                    Err(err) => {
                        last_error = Some(format!("{} ({})", err, method.label()));
                        if attempt < TRIES_PER_METHOD {
                            self.pacer.pause(METHOD_RETRY_DELAY).await;
                        }
                    }
                }
            }
        }

        Resolution::Exhausted {
            last_error: last_error
                .unwrap_or_else(|| "no resolution method produced an answer".into()),
        }
    }
}
