use std::time::Duration;

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    info,
    instagram::{DeviceProfile, InstagramClient},
    management::SessionStore,
    success,
    types::{AccountSession, AuthMethod},
    warning,
};

/// Shows the cached session and probes it for liveness.
pub async fn status() {
    let store = SessionStore::new();
    let stored = match store.load().await {
        Ok(stored) => stored,
        Err(_) => {
            warning!("No cached session found. Run gramfollow login first.");
            return;
        }
    };

    let method = match stored.auth_method {
        AuthMethod::Token => "session token",
        AuthMethod::Password => "password login",
    };
    info!(
        "Cached session for account {} via {} ({} old)",
        stored.account_id,
        method,
        age(stored.obtained_at)
    );

    let seed = stored
        .username
        .clone()
        .unwrap_or_else(|| stored.account_id.clone());
    let client = InstagramClient::new(DeviceProfile::new().with_seed(&seed));

    let pb = ProgressBar::new_spinner();
    pb.set_message("Probing session liveness...");
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );

    let session = AccountSession {
        account_id: stored.account_id,
        token: stored.session_token,
        auth_method: stored.auth_method,
        obtained_at: stored.obtained_at,
    };

    let result = client.current_account(&session).await;
    pb.finish_and_clear();

    match result {
        Ok(account_id) => success!("Session is live (account {})", account_id),
        Err(e) => warning!(
            "Session is not usable: {}\nRun gramfollow login to refresh it.",
            e
        ),
    }
}

fn age(obtained_at: chrono::DateTime<Utc>) -> String {
    let elapsed = Utc::now().signed_duration_since(obtained_at);
    if elapsed.num_days() > 0 {
        format!("{}d", elapsed.num_days())
    } else if elapsed.num_hours() > 0 {
        format!("{}h", elapsed.num_hours())
    } else {
        format!("{}m", elapsed.num_minutes().max(0))
    }
}
