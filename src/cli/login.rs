use std::sync::Arc;

use chrono::Utc;

use crate::{
    config, error,
    instagram::{DeviceProfile, InstagramClient},
    management::{SessionManager, SessionStore},
    success,
    types::{Credentials, SessionToken, StoredSession},
    warning,
};

/// Establishes a session and caches it for later `follow` runs.
///
/// Credential material comes from the flags first and the environment
/// second. A supplied session token is tried before a password login; a
/// token that fails its liveness probe falls back to the password pair when
/// one is available. The resulting session lands in the local session cache.
pub async fn login(
    username: Option<String>,
    password: Option<String>,
    session_id: Option<String>,
) {
    let username = username.or_else(config::username);
    let password = password.or_else(config::password);
    let session_token = session_id
        .or_else(config::session_id)
        .map(SessionToken::new);

    if session_token.is_none() && (username.is_none() || password.is_none()) {
        error!(
            "No credentials provided. Pass --session-id or --username/--password, or set them in the environment."
        );
    }

    let seed = username.clone().unwrap_or_else(|| {
        session_token
            .as_ref()
            .and_then(|t| t.embedded_account_id())
            .unwrap_or_else(|| "gramfollow".to_string())
    });

    let device = DeviceProfile::new().with_seed(&seed);
    let client: Arc<InstagramClient> = Arc::new(InstagramClient::new(device));

    let credentials = Credentials {
        session_token,
        username: username.clone(),
        password,
    };

    let mut sessions = SessionManager::new(client, credentials);
    let session = match sessions.authenticate().await {
        Ok(session) => session,
        Err(e) => error!("Login failed: {}", e),
    };

    let stored = StoredSession {
        username,
        account_id: session.account_id.clone(),
        session_token: session.token.clone(),
        auth_method: session.auth_method,
        obtained_at: Utc::now(),
    };

    let store = SessionStore::new();
    match store.persist(&stored).await {
        Ok(()) => success!(
            "Logged in as account {} (token {})",
            session.account_id,
            session.token.preview()
        ),
        Err(e) => warning!("Logged in, but the session could not be cached: {}", e),
    }
}
