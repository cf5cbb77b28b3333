use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use chrono::Utc;
use tabled::Table;

use crate::{
    config,
    engine::{FollowEngine, ProgressSink, TokioPacer},
    error, info,
    instagram::{DeviceProfile, InstagramClient},
    management::SessionStore,
    success,
    types::{
        AuthMethod, ItemRecord, ItemTableRow, RunRequest, RunSummary, SessionToken, StoredSession,
    },
    warning,
};

/// Sink that prints run events as they happen and collects the itemized
/// records for the final table.
struct CliSink {
    records: Mutex<Vec<ItemRecord>>,
    minted_token: Mutex<Option<SessionToken>>,
}

impl CliSink {
    fn new() -> Self {
        CliSink {
            records: Mutex::new(Vec::new()),
            minted_token: Mutex::new(None),
        }
    }

    fn take_records(&self) -> Vec<ItemRecord> {
        std::mem::take(&mut *self.records.lock().unwrap())
    }

    fn take_token(&self) -> Option<SessionToken> {
        self.minted_token.lock().unwrap().take()
    }
}

impl ProgressSink for CliSink {
    fn on_item_outcome(&self, record: &ItemRecord) {
        self.records.lock().unwrap().push(record.clone());
    }

    fn on_progress(&self, done: usize, total: usize, message: &str) {
        info!("[{}/{}] {}", done + 1, total, message);
    }

    fn on_token_refreshed(&self, token: &SessionToken) {
        *self.minted_token.lock().unwrap() = Some(token.clone());
    }
}

/// Runs a follow batch over the given targets.
///
/// Targets come from the positional arguments plus, optionally, a file with
/// one handle or profile URL per line (blank lines and `#` comments are
/// skipped). The session token is taken from the local session cache when
/// present; the environment's username/password pair serves as the re-auth
/// fallback. Always prints the summary, even when the run aborts early.
pub async fn follow_targets(
    targets: Vec<String>,
    file: Option<PathBuf>,
    delay_min: u64,
    delay_max: u64,
    max_targets: usize,
) {
    let mut all_targets = targets;
    if let Some(path) = file {
        match async_fs::read_to_string(&path).await {
            Ok(content) => {
                all_targets.extend(
                    content
                        .lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty() && !line.starts_with('#'))
                        .map(String::from),
                );
            }
            Err(e) => error!("Cannot read target file {}: {}", path.display(), e),
        }
    }
    if all_targets.is_empty() {
        error!("No targets given. Pass handles as arguments or use --file.");
    }

    let store = SessionStore::new();
    let stored = store.load().await.ok();

    let session_token = stored
        .as_ref()
        .map(|s| s.session_token.clone())
        .or_else(|| config::session_id().map(SessionToken::new));
    let username = stored
        .as_ref()
        .and_then(|s| s.username.clone())
        .or_else(config::username);
    let password = config::password();

    if session_token.is_none() && (username.is_none() || password.is_none()) {
        error!("No session or credentials available. Run gramfollow login first.");
    }

    let seed = username
        .clone()
        .or_else(|| stored.as_ref().map(|s| s.account_id.clone()))
        .unwrap_or_else(|| "gramfollow".to_string());
    let client: Arc<InstagramClient> = Arc::new(InstagramClient::new(
        DeviceProfile::new().with_seed(&seed),
    ));

    let request = RunRequest {
        targets: all_targets,
        session_token,
        username: username.clone(),
        password,
        delay_min,
        delay_max,
        max_targets,
    };

    let sink = CliSink::new();
    let engine = FollowEngine::new(client, Arc::new(TokioPacer));

    let result = engine.run(request, &sink).await;

    if let Some(token) = sink.take_token() {
        persist_refreshed_token(&store, stored, username, token).await;
    }

    let records = sink.take_records();
    if !records.is_empty() {
        let rows: Vec<ItemTableRow> = records
            .into_iter()
            .map(|r| ItemTableRow {
                username: r.username,
                status: r.status.to_string(),
                time: r.timestamp.format("%H:%M:%S").to_string(),
            })
            .collect();
        println!("{}", Table::new(rows));
    }

    match result {
        Ok(summary) => {
            print_summary(&summary);
            success!("Run complete");
        }
        Err(failure) => {
            print_summary(&failure.summary);
            error!("Run aborted: {}", failure.error);
        }
    }
}

fn print_summary(summary: &RunSummary) {
    info!(
        "Followed: {}  Already following: {}  Failed: {}  Total: {}",
        summary.followed, summary.already_following, summary.failed, summary.total_processed
    );
}

/// Writes a token minted mid-run back into the session cache so the next
/// run adopts it instead of logging in again.
async fn persist_refreshed_token(
    store: &SessionStore,
    stored: Option<StoredSession>,
    username: Option<String>,
    token: SessionToken,
) {
    let account_id = token
        .embedded_account_id()
        .or_else(|| stored.as_ref().map(|s| s.account_id.clone()))
        .unwrap_or_default();

    let refreshed = StoredSession {
        username: username.or_else(|| stored.and_then(|s| s.username)),
        account_id,
        session_token: token,
        auth_method: AuthMethod::Password,
        obtained_at: Utc::now(),
    };

    match store.persist(&refreshed).await {
        Ok(()) => info!("Cached the refreshed session token"),
        Err(e) => warning!("Could not cache the refreshed session token: {}", e),
    }
}
