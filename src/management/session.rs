use std::sync::Arc;

use crate::{
    errors::AuthError,
    instagram::InstagramApi,
    types::{AccountSession, Credentials, SessionToken},
    warning,
};

/// Owns the credential material and the one live session of a run.
///
/// Policy lives here: token authentication is preferred, credential login is
/// the fallback, and re-authentication replaces the session in place. The
/// session object is single-owner for the duration of a run; callers get
/// clones for making requests.
pub struct SessionManager {
    api: Arc<dyn InstagramApi>,
    credentials: Credentials,
    session: Option<AccountSession>,
    is_live: bool,
    minted_token: Option<SessionToken>,
}

impl SessionManager {
    pub fn new(api: Arc<dyn InstagramApi>, credentials: Credentials) -> Self {
        SessionManager {
            api,
            credentials,
            session: None,
            is_live: false,
            minted_token: None,
        }
    }

    /// Establishes a session from whatever material is available.
    ///
    /// A supplied token is tried first; token adoption includes its own
    /// liveness probe, so a token that authenticates but cannot be used is
    /// reported as a failure here. On any token failure the manager falls
    /// back to a credential login when a username/password pair exists,
    /// otherwise the token's error is propagated. `TwoFactorRequired` and
    /// `ChallengeRequired` from the credential path are never retried.
    pub async fn authenticate(&mut self) -> Result<AccountSession, AuthError> {
        if let Some(token) = self.credentials.session_token.clone() {
            match self.api.login_by_token(&token).await {
                Ok(session) => {
                    self.session = Some(session.clone());
                    self.is_live = true;
                    return Ok(session);
                }
                Err(err) => {
                    if !self.has_credential_pair() {
                        return Err(err);
                    }
                    warning!("Session token rejected ({}); falling back to credential login", err);
                }
            }
        }

        self.credential_login().await
    }

    /// Liveness probe against the provider. Returns `false` instead of
    /// erroring when the session is dead or missing; the result also updates
    /// the manager's live flag.
    pub async fn check_live(&mut self) -> bool {
        let live = match &self.session {
            Some(session) => self.api.current_account(session).await.is_ok(),
            None => false,
        };
        self.is_live = live;
        live
    }

    /// Re-establishes the session from the credential pair, replacing it in
    /// place. Returns `false` when no pair is configured or the login fails;
    /// only a token is not enough to recover a dead session.
    pub async fn reauthenticate(&mut self) -> bool {
        if !self.has_credential_pair() {
            return false;
        }
        match self.credential_login().await {
            Ok(_) => true,
            Err(err) => {
                warning!("Re-authentication failed: {}", err);
                false
            }
        }
    }

    /// The current session, cloned for request use.
    pub fn current_session(&self) -> Option<AccountSession> {
        self.session.clone()
    }

    pub fn is_live(&self) -> bool {
        self.is_live
    }

    pub fn has_credential_pair(&self) -> bool {
        self.credentials.username.is_some() && self.credentials.password.is_some()
    }

    /// Takes the token minted by the most recent credential login, if any.
    /// Each minted token is handed out exactly once so the caller can pass
    /// it to the external credential store.
    pub fn take_minted_token(&mut self) -> Option<SessionToken> {
        self.minted_token.take()
    }

    async fn credential_login(&mut self) -> Result<AccountSession, AuthError> {
        let (Some(username), Some(password)) = (
            self.credentials.username.clone(),
            self.credentials.password.clone(),
        ) else {
            return Err(AuthError::Unknown(
                "no session token or credential pair provided".into(),
            ));
        };

        let session = self.api.login_with_password(&username, &password).await?;
        self.minted_token = Some(session.token.clone());
        self.session = Some(session.clone());
        self.is_live = true;
        Ok(session)
    }
}
