use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;

use gramfollow::engine::{FollowEngine, METHOD_RETRY_DELAY, Pacer, ProgressSink, RATE_LIMIT_PENALTY};
use gramfollow::errors::{ApiError, AuthError, RunError};
use gramfollow::instagram::InstagramApi;
use gramfollow::types::{
    AccountSession, AuthMethod, ItemRecord, OutcomeTag, RunRequest, RunSummary, SessionToken,
};

const ACCOUNT_ID: &str = "100";

/// Scripted reply for a lookup call.
#[derive(Clone)]
enum LookupReply {
    Id(&'static str),
    SessionInvalid,
    Transient,
}

/// Scripted reply for a follow call.
#[derive(Clone)]
enum FollowReply {
    Ok,
    SessionInvalid,
    RateLimited,
    Fail,
}

/// Scripted reply for a following-list fetch. An empty script means the
/// fetch succeeds with the configured set.
#[derive(Clone)]
enum PrefetchReply {
    SessionInvalid,
    Unavailable,
}

/// In-memory stand-in for the platform. Lookups consult the `users` map
/// unless a script is installed for the handle; follows succeed unless
/// scripted otherwise.
#[derive(Default)]
struct FakeApi {
    token_login_ok: bool,
    password_login_ok: bool,
    users: HashMap<String, String>,
    following: HashSet<String>,
    live_replies: Mutex<VecDeque<bool>>,
    lookup_replies: Mutex<HashMap<String, VecDeque<LookupReply>>>,
    search_replies: Mutex<HashMap<String, VecDeque<LookupReply>>>,
    follow_replies: Mutex<HashMap<String, VecDeque<FollowReply>>>,
    prefetch_replies: Mutex<VecDeque<PrefetchReply>>,
    lookup_calls: Mutex<HashMap<String, usize>>,
    // Every lookup endpoint hit, in call order, labelled by method.
    lookup_log: Mutex<Vec<(&'static str, String)>>,
    follow_calls: Mutex<HashMap<String, usize>>,
    password_logins: Mutex<usize>,
}

impl FakeApi {
    fn with_users(users: &[(&str, &str)]) -> Self {
        FakeApi {
            token_login_ok: true,
            password_login_ok: true,
            users: users
                .iter()
                .map(|(h, id)| (h.to_string(), id.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    fn script_liveness(&self, replies: &[bool]) {
        *self.live_replies.lock().unwrap() = replies.iter().copied().collect();
    }

    fn script_lookup(&self, handle: &str, replies: &[LookupReply]) {
        self.lookup_replies
            .lock()
            .unwrap()
            .insert(handle.to_string(), replies.iter().cloned().collect());
    }

    fn script_search(&self, handle: &str, replies: &[LookupReply]) {
        self.search_replies
            .lock()
            .unwrap()
            .insert(handle.to_string(), replies.iter().cloned().collect());
    }

    fn script_follow(&self, user_id: &str, replies: &[FollowReply]) {
        self.follow_replies
            .lock()
            .unwrap()
            .insert(user_id.to_string(), replies.iter().cloned().collect());
    }

    fn script_prefetch(&self, replies: &[PrefetchReply]) {
        *self.prefetch_replies.lock().unwrap() = replies.iter().cloned().collect();
    }

    fn lookup_count(&self, handle: &str) -> usize {
        *self.lookup_calls.lock().unwrap().get(handle).unwrap_or(&0)
    }

    fn lookup_sequence(&self, handle: &str) -> Vec<&'static str> {
        self.lookup_log
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, h)| h == handle)
            .map(|(method, _)| *method)
            .collect()
    }

    fn follow_count(&self, user_id: &str) -> usize {
        *self.follow_calls.lock().unwrap().get(user_id).unwrap_or(&0)
    }

    fn password_login_count(&self) -> usize {
        *self.password_logins.lock().unwrap()
    }

    fn session(&self, method: AuthMethod) -> AccountSession {
        AccountSession {
            account_id: ACCOUNT_ID.to_string(),
            token: SessionToken::new(format!("{ACCOUNT_ID}%3Afake")),
            auth_method: method,
            obtained_at: Utc::now(),
        }
    }
}

#[async_trait]
impl InstagramApi for FakeApi {
    async fn login_by_token(&self, _token: &SessionToken) -> Result<AccountSession, AuthError> {
        if self.token_login_ok {
            Ok(self.session(AuthMethod::Token))
        } else {
            Err(AuthError::InvalidToken)
        }
    }

    async fn login_with_password(
        &self,
        _username: &str,
        _password: &str,
    ) -> Result<AccountSession, AuthError> {
        *self.password_logins.lock().unwrap() += 1;
        if self.password_login_ok {
            Ok(self.session(AuthMethod::Password))
        } else {
            Err(AuthError::BadPassword)
        }
    }

    async fn current_account(&self, _session: &AccountSession) -> Result<String, ApiError> {
        let live = self.live_replies.lock().unwrap().pop_front().unwrap_or(true);
        if live {
            Ok(ACCOUNT_ID.to_string())
        } else {
            Err(ApiError::SessionInvalid)
        }
    }

    async fn user_id_by_username(
        &self,
        _session: &AccountSession,
        handle: &str,
    ) -> Result<String, ApiError> {
        *self
            .lookup_calls
            .lock()
            .unwrap()
            .entry(handle.to_string())
            .or_insert(0) += 1;
        self.lookup_log
            .lock()
            .unwrap()
            .push(("profile", handle.to_string()));

        let scripted = self
            .lookup_replies
            .lock()
            .unwrap()
            .get_mut(handle)
            .and_then(|q| q.pop_front());
        match scripted {
            Some(LookupReply::Id(id)) => Ok(id.to_string()),
            Some(LookupReply::SessionInvalid) => Err(ApiError::SessionInvalid),
            Some(LookupReply::Transient) => {
                Err(ApiError::Unexpected("scripted transient failure".into()))
            }
            None => match self.users.get(handle) {
                Some(id) => Ok(id.clone()),
                None => Err(ApiError::NotFound),
            },
        }
    }

    async fn web_profile_user_id(
        &self,
        _session: &AccountSession,
        handle: &str,
    ) -> Result<String, ApiError> {
        self.lookup_log
            .lock()
            .unwrap()
            .push(("web", handle.to_string()));
        Err(ApiError::Unexpected("web profile unavailable".into()))
    }

    async fn search_user_id(
        &self,
        _session: &AccountSession,
        handle: &str,
    ) -> Result<String, ApiError> {
        self.lookup_log
            .lock()
            .unwrap()
            .push(("search", handle.to_string()));

        let scripted = self
            .search_replies
            .lock()
            .unwrap()
            .get_mut(handle)
            .and_then(|q| q.pop_front());
        match scripted {
            Some(LookupReply::Id(id)) => Ok(id.to_string()),
            Some(LookupReply::SessionInvalid) => Err(ApiError::SessionInvalid),
            Some(LookupReply::Transient) | None => {
                Err(ApiError::Unexpected("search unavailable".into()))
            }
        }
    }

    async fn follow_user(
        &self,
        _session: &AccountSession,
        user_id: &str,
    ) -> Result<bool, ApiError> {
        *self
            .follow_calls
            .lock()
            .unwrap()
            .entry(user_id.to_string())
            .or_insert(0) += 1;

        let scripted = self
            .follow_replies
            .lock()
            .unwrap()
            .get_mut(user_id)
            .and_then(|q| q.pop_front());
        match scripted {
            Some(FollowReply::Ok) | None => Ok(true),
            Some(FollowReply::SessionInvalid) => Err(ApiError::SessionInvalid),
            Some(FollowReply::RateLimited) => {
                Err(ApiError::RateLimited("please wait a few minutes".into()))
            }
            Some(FollowReply::Fail) => Err(ApiError::Unexpected("scripted failure".into())),
        }
    }

    async fn following_usernames(
        &self,
        _session: &AccountSession,
        _amount: usize,
    ) -> Result<HashSet<String>, ApiError> {
        match self.prefetch_replies.lock().unwrap().pop_front() {
            Some(PrefetchReply::SessionInvalid) => Err(ApiError::SessionInvalid),
            Some(PrefetchReply::Unavailable) => {
                Err(ApiError::Unexpected("following list unavailable".into()))
            }
            None => Ok(self.following.clone()),
        }
    }
}

/// Pacer that records every requested pause instead of sleeping.
#[derive(Default)]
struct RecordingPacer {
    pauses: Mutex<Vec<Duration>>,
}

impl RecordingPacer {
    fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().unwrap().clone()
    }
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn pause(&self, duration: Duration) {
        self.pauses.lock().unwrap().push(duration);
    }
}

/// Sink that keeps everything it receives.
#[derive(Default)]
struct CollectingSink {
    records: Mutex<Vec<ItemRecord>>,
    tokens: Mutex<Vec<SessionToken>>,
    completed: Mutex<Option<RunSummary>>,
}

impl CollectingSink {
    fn statuses(&self) -> Vec<(String, OutcomeTag)> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|r| (r.username.clone(), r.status))
            .collect()
    }

    fn token_count(&self) -> usize {
        self.tokens.lock().unwrap().len()
    }
}

impl ProgressSink for CollectingSink {
    fn on_item_outcome(&self, record: &ItemRecord) {
        self.records.lock().unwrap().push(record.clone());
    }

    fn on_token_refreshed(&self, token: &SessionToken) {
        self.tokens.lock().unwrap().push(token.clone());
    }

    fn on_run_complete(&self, summary: &RunSummary) {
        *self.completed.lock().unwrap() = Some(*summary);
    }
}

fn request(targets: &[&str]) -> RunRequest {
    RunRequest {
        targets: targets.iter().map(|t| t.to_string()).collect(),
        session_token: Some(SessionToken::new(format!("{ACCOUNT_ID}%3Afake"))),
        username: Some("runner".to_string()),
        password: Some("secret".to_string()),
        delay_min: 0,
        delay_max: 0,
        max_targets: 20,
    }
}

fn token_only_request(targets: &[&str]) -> RunRequest {
    RunRequest {
        username: None,
        password: None,
        ..request(targets)
    }
}

fn assert_invariant(summary: &RunSummary) {
    assert_eq!(
        summary.followed + summary.already_following + summary.failed,
        summary.total_processed
    );
}

#[tokio::test]
async fn test_mixed_outcomes() {
    let mut fake = FakeApi::with_users(&[("alice", "1"), ("bob", "2")]);
    fake.following.insert("bob".to_string());
    let api = Arc::new(fake);
    let pacer = Arc::new(RecordingPacer::default());
    let sink = CollectingSink::default();

    let engine = FollowEngine::new(api.clone(), pacer);
    let summary = engine
        .run(request(&["alice", "bob", "not_a_real_user_zzz"]), &sink)
        .await
        .unwrap();

    assert_eq!(summary.followed, 1);
    assert_eq!(summary.already_following, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.total_processed, 3);
    assert_invariant(&summary);

    // bob's membership in the prefetched set must skip resolution entirely
    assert_eq!(api.lookup_count("bob"), 0);
    assert_eq!(api.follow_count("2"), 0);

    assert_eq!(
        sink.statuses(),
        vec![
            ("alice".to_string(), OutcomeTag::Followed),
            ("bob".to_string(), OutcomeTag::AlreadyFollowing),
            (
                "not_a_real_user_zzz".to_string(),
                OutcomeTag::UserNotFound
            ),
        ]
    );
}

#[tokio::test]
async fn test_url_targets_are_normalized_and_foreign_paths_dropped() {
    let api = Arc::new(FakeApi::with_users(&[("someone", "9")]));
    let pacer = Arc::new(RecordingPacer::default());
    let sink = CollectingSink::default();

    let engine = FollowEngine::new(api.clone(), pacer);
    let summary = engine
        .run(
            request(&["https://www.instagram.com/someone/", "https://x.com/a/b"]),
            &sink,
        )
        .await
        .unwrap();

    // The second input never enters the run and is not counted as failed
    assert_eq!(summary.total_processed, 1);
    assert_eq!(summary.followed, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(
        sink.statuses(),
        vec![("someone".to_string(), OutcomeTag::Followed)]
    );
}

#[tokio::test]
async fn test_max_targets_caps_the_run() {
    let api = Arc::new(FakeApi::with_users(&[("a", "1"), ("b", "2"), ("c", "3")]));
    let pacer = Arc::new(RecordingPacer::default());
    let sink = CollectingSink::default();

    let mut req = request(&["a", "b", "c"]);
    req.max_targets = 2;

    let engine = FollowEngine::new(api, pacer);
    let summary = engine.run(req, &sink).await.unwrap();

    assert_eq!(summary.total_processed, 2);
    assert_eq!(sink.statuses().len(), 2);
}

#[tokio::test]
async fn test_target_cap_applies_before_normalization() {
    let api = Arc::new(FakeApi::with_users(&[("a", "1"), ("b", "2")]));
    let pacer = Arc::new(RecordingPacer::default());
    let sink = CollectingSink::default();

    let mut req = request(&["https://x.com/junk", "a", "b"]);
    req.max_targets = 2;

    let engine = FollowEngine::new(api.clone(), pacer);
    let summary = engine.run(req, &sink).await.unwrap();

    // The dropped input still consumed one of the two slots, so the third
    // raw input stays outside the run
    assert_eq!(summary.total_processed, 1);
    assert_eq!(
        sink.statuses(),
        vec![("a".to_string(), OutcomeTag::Followed)]
    );
    assert_eq!(api.lookup_count("b"), 0);
}

#[tokio::test]
async fn test_dead_token_without_credentials_aborts_before_any_target() {
    let mut fake = FakeApi::with_users(&[("alice", "1")]);
    fake.password_login_ok = false;
    let api = Arc::new(fake);
    // Token login succeeds, the immediate post-auth probe does not
    api.script_liveness(&[false]);

    let pacer = Arc::new(RecordingPacer::default());
    let sink = CollectingSink::default();

    let engine = FollowEngine::new(api.clone(), pacer);
    let failure = engine
        .run(token_only_request(&["alice"]), &sink)
        .await
        .unwrap_err();

    assert!(matches!(failure.error, RunError::Auth(_)));
    assert_eq!(failure.summary, RunSummary::default());
    assert_eq!(api.lookup_count("alice"), 0);
    assert!(sink.statuses().is_empty());
}

#[tokio::test]
async fn test_rejected_token_falls_back_to_password_login() {
    let mut fake = FakeApi::with_users(&[("alice", "1")]);
    fake.token_login_ok = false;
    let api = Arc::new(fake);

    let pacer = Arc::new(RecordingPacer::default());
    let sink = CollectingSink::default();

    let engine = FollowEngine::new(api.clone(), pacer);
    let summary = engine.run(request(&["alice"]), &sink).await.unwrap();

    assert_eq!(summary.followed, 1);
    assert_eq!(api.password_login_count(), 1);
    // The minted token reaches the sink for the caller's credential store
    assert_eq!(sink.token_count(), 1);
}

#[tokio::test]
async fn test_rejected_token_without_credentials_is_fatal() {
    let mut fake = FakeApi::with_users(&[("alice", "1")]);
    fake.token_login_ok = false;
    let api = Arc::new(fake);

    let pacer = Arc::new(RecordingPacer::default());
    let sink = CollectingSink::default();

    let engine = FollowEngine::new(api, pacer);
    let failure = engine
        .run(token_only_request(&["alice"]), &sink)
        .await
        .unwrap_err();

    assert!(matches!(
        failure.error,
        RunError::Auth(AuthError::InvalidToken)
    ));
    assert_eq!(failure.summary, RunSummary::default());
}

#[tokio::test]
async fn test_rate_limit_then_success_waits_once() {
    let api = Arc::new(FakeApi::with_users(&[("alice", "1")]));
    api.script_follow("1", &[FollowReply::RateLimited, FollowReply::Ok]);

    let pacer = Arc::new(RecordingPacer::default());
    let sink = CollectingSink::default();

    let engine = FollowEngine::new(api.clone(), pacer.clone());
    let summary = engine.run(request(&["alice"]), &sink).await.unwrap();

    assert_eq!(summary.followed, 1);
    assert_eq!(
        sink.statuses(),
        vec![("alice".to_string(), OutcomeTag::FollowedAfterWait)]
    );
    assert_eq!(api.follow_count("1"), 2);

    // Exactly one penalty-length wait was requested
    let penalties: Vec<_> = pacer
        .pauses()
        .into_iter()
        .filter(|d| *d == RATE_LIMIT_PENALTY)
        .collect();
    assert_eq!(penalties.len(), 1);
}

#[tokio::test]
async fn test_double_rate_limit_fails_the_item_without_a_third_attempt() {
    let api = Arc::new(FakeApi::with_users(&[("alice", "1"), ("bob", "2")]));
    api.script_follow("1", &[FollowReply::RateLimited, FollowReply::RateLimited]);

    let pacer = Arc::new(RecordingPacer::default());
    let sink = CollectingSink::default();

    let engine = FollowEngine::new(api.clone(), pacer);
    let summary = engine.run(request(&["alice", "bob"]), &sink).await.unwrap();

    // The item fails, the run continues
    assert_eq!(api.follow_count("1"), 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.followed, 1);
    assert_invariant(&summary);
    assert_eq!(
        sink.statuses(),
        vec![
            ("alice".to_string(), OutcomeTag::RateLimited),
            ("bob".to_string(), OutcomeTag::Followed),
        ]
    );
}

#[tokio::test]
async fn test_double_session_invalid_during_resolution_aborts() {
    let api = Arc::new(FakeApi::with_users(&[("b", "2"), ("c", "3")]));
    api.script_lookup(
        "a",
        &[LookupReply::SessionInvalid, LookupReply::SessionInvalid],
    );

    let pacer = Arc::new(RecordingPacer::default());
    let sink = CollectingSink::default();

    let engine = FollowEngine::new(api.clone(), pacer);
    let failure = engine
        .run(request(&["a", "b", "c"]), &sink)
        .await
        .unwrap_err();

    assert!(matches!(failure.error, RunError::SessionLost(_)));
    assert_eq!(failure.summary.failed, 1);
    assert_eq!(failure.summary.total_processed, 1);
    assert_invariant(&failure.summary);

    // Remaining targets never appear in the record stream
    assert_eq!(
        sink.statuses(),
        vec![("a".to_string(), OutcomeTag::SessionExpired)]
    );
    assert_eq!(api.lookup_count("b"), 0);
    assert_eq!(api.lookup_count("c"), 0);
}

#[tokio::test]
async fn test_session_invalid_during_follow_recovers_after_reauth() {
    let api = Arc::new(FakeApi::with_users(&[("a", "1"), ("b", "2")]));
    api.script_follow("1", &[FollowReply::SessionInvalid]);

    let pacer = Arc::new(RecordingPacer::default());
    let sink = CollectingSink::default();

    let engine = FollowEngine::new(api.clone(), pacer);
    let summary = engine.run(request(&["a", "b"]), &sink).await.unwrap();

    // The follow whose side effect is ambiguous stays failed; the run
    // continues with a fresh session
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.followed, 1);
    assert_invariant(&summary);
    assert_eq!(
        sink.statuses(),
        vec![
            ("a".to_string(), OutcomeTag::SessionExpired),
            ("b".to_string(), OutcomeTag::Followed),
        ]
    );
    assert!(api.password_login_count() >= 1);
}

#[tokio::test]
async fn test_stale_preflight_without_credentials_aborts_uncounted() {
    let mut fake = FakeApi::with_users(&[("alice", "1")]);
    fake.password_login_ok = false;
    let api = Arc::new(fake);
    // Post-auth probe passes, the pre-flight probe for the first target fails
    api.script_liveness(&[true, false]);

    let pacer = Arc::new(RecordingPacer::default());
    let sink = CollectingSink::default();

    let engine = FollowEngine::new(api, pacer);
    let failure = engine
        .run(token_only_request(&["alice"]), &sink)
        .await
        .unwrap_err();

    assert!(matches!(failure.error, RunError::SessionLost(_)));
    // Nothing was attempted for the item, so nothing is counted
    assert_eq!(failure.summary, RunSummary::default());
    assert!(sink.statuses().is_empty());
}

#[tokio::test]
async fn test_stale_preflight_with_credentials_retries_the_same_target() {
    let api = Arc::new(FakeApi::with_users(&[("alice", "1")]));
    // Post-auth probe passes, the pre-flight probe for the first target fails
    api.script_liveness(&[true, false]);

    let pacer = Arc::new(RecordingPacer::default());
    let sink = CollectingSink::default();

    let engine = FollowEngine::new(api.clone(), pacer);
    let summary = engine.run(request(&["alice"]), &sink).await.unwrap();

    // The fallback login repairs the session and the same target goes
    // through; the stale probe never costs the item anything
    assert_eq!(summary.followed, 1);
    assert_invariant(&summary);
    assert_eq!(api.password_login_count(), 1);
    assert_eq!(
        sink.statuses(),
        vec![("alice".to_string(), OutcomeTag::Followed)]
    );
    assert_eq!(sink.token_count(), 1);
}

#[tokio::test]
async fn test_exhausted_resolution_counts_as_failed() {
    let api = Arc::new(FakeApi::with_users(&[]));
    api.script_lookup("ghost", &[LookupReply::Transient, LookupReply::Transient]);

    let pacer = Arc::new(RecordingPacer::default());
    let sink = CollectingSink::default();

    let engine = FollowEngine::new(api, pacer);
    let summary = engine.run(request(&["ghost"]), &sink).await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.total_processed, 1);
    assert_eq!(
        sink.statuses(),
        vec![("ghost".to_string(), OutcomeTag::Failed)]
    );
}

#[tokio::test]
async fn test_transient_lookup_failure_is_retried_with_a_short_delay() {
    let api = Arc::new(FakeApi::with_users(&[]));
    api.script_lookup("alice", &[LookupReply::Transient, LookupReply::Id("1")]);

    let pacer = Arc::new(RecordingPacer::default());
    let sink = CollectingSink::default();

    let engine = FollowEngine::new(api.clone(), pacer.clone());
    let summary = engine.run(request(&["alice"]), &sink).await.unwrap();

    assert_eq!(summary.followed, 1);
    assert_eq!(api.lookup_count("alice"), 2);

    // The second try comes after the fixed method-retry delay
    let retries: Vec<_> = pacer
        .pauses()
        .into_iter()
        .filter(|d| *d == METHOD_RETRY_DELAY)
        .collect();
    assert_eq!(retries.len(), 1);
}

#[tokio::test]
async fn test_resolution_walks_the_method_ladder_in_order() {
    let api = Arc::new(FakeApi::with_users(&[]));
    // Profile lookups fail both tries, the web profile endpoint is down,
    // only search answers
    api.script_lookup(
        "deep_cut",
        &[LookupReply::Transient, LookupReply::Transient],
    );
    api.script_search("deep_cut", &[LookupReply::Id("7")]);

    let pacer = Arc::new(RecordingPacer::default());
    let sink = CollectingSink::default();

    let engine = FollowEngine::new(api.clone(), pacer);
    let summary = engine.run(request(&["deep_cut"]), &sink).await.unwrap();

    assert_eq!(summary.followed, 1);
    assert_eq!(api.follow_count("7"), 1);
    assert_eq!(
        sink.statuses(),
        vec![("deep_cut".to_string(), OutcomeTag::Followed)]
    );

    // Two tries per method, in ladder order, stopping at the first answer
    assert_eq!(
        api.lookup_sequence("deep_cut"),
        vec!["profile", "profile", "web", "web", "search"]
    );
}

#[tokio::test]
async fn test_generic_follow_failure_is_not_retried() {
    let api = Arc::new(FakeApi::with_users(&[("alice", "1")]));
    api.script_follow("1", &[FollowReply::Fail]);

    let pacer = Arc::new(RecordingPacer::default());
    let sink = CollectingSink::default();

    let engine = FollowEngine::new(api.clone(), pacer);
    let summary = engine.run(request(&["alice"]), &sink).await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(api.follow_count("1"), 1);
    assert_eq!(
        sink.statuses(),
        vec![("alice".to_string(), OutcomeTag::Failed)]
    );
}

#[tokio::test]
async fn test_prefetch_failure_degrades_to_attempting_every_target() {
    let mut fake = FakeApi::with_users(&[("bob", "2")]);
    fake.following.insert("bob".to_string());
    let api = Arc::new(fake);
    api.script_prefetch(&[PrefetchReply::Unavailable]);

    let pacer = Arc::new(RecordingPacer::default());
    let sink = CollectingSink::default();

    let engine = FollowEngine::new(api.clone(), pacer);
    let summary = engine.run(request(&["bob"]), &sink).await.unwrap();

    // Without the prefetched set the skip path is unavailable
    assert_eq!(summary.followed, 1);
    assert_eq!(summary.already_following, 0);
    assert_eq!(api.follow_count("2"), 1);
}

#[tokio::test]
async fn test_recovered_prefetch_clears_the_consecutive_invalidity_count() {
    let api = Arc::new(FakeApi::with_users(&[("alice", "1")]));
    // The first prefetch call is rejected; the retry after re-auth succeeds
    api.script_prefetch(&[PrefetchReply::SessionInvalid]);
    api.script_lookup(
        "alice",
        &[LookupReply::SessionInvalid, LookupReply::Id("1")],
    );

    let pacer = Arc::new(RecordingPacer::default());
    let sink = CollectingSink::default();

    let engine = FollowEngine::new(api.clone(), pacer);
    let summary = engine.run(request(&["alice"]), &sink).await.unwrap();

    // The rejection during resolution counts as the first in a row again,
    // so it gets its own re-auth recovery instead of aborting the run
    assert_eq!(summary.followed, 1);
    assert_invariant(&summary);
    assert_eq!(api.lookup_count("alice"), 2);
    assert_eq!(api.password_login_count(), 2);
    assert_eq!(
        sink.statuses(),
        vec![("alice".to_string(), OutcomeTag::Followed)]
    );
}

#[tokio::test]
async fn test_extended_break_after_every_fifth_item() {
    let api = Arc::new(FakeApi::with_users(&[
        ("u1", "1"),
        ("u2", "2"),
        ("u3", "3"),
        ("u4", "4"),
        ("u5", "5"),
        ("u6", "6"),
    ]));
    let pacer = Arc::new(RecordingPacer::default());
    let sink = CollectingSink::default();

    let engine = FollowEngine::new(api, pacer.clone());
    let summary = engine
        .run(request(&["u1", "u2", "u3", "u4", "u5", "u6"]), &sink)
        .await
        .unwrap();

    assert_eq!(summary.followed, 6);

    // Five inter-item delays (zero-length here) plus exactly one extended
    // break after the fifth item
    let pauses = pacer.pauses();
    let long_breaks = pauses
        .iter()
        .filter(|d| d.as_secs_f64() >= 120.0 && d.as_secs_f64() <= 180.0)
        .count();
    let inter_item = pauses.iter().filter(|d| d.is_zero()).count();
    assert_eq!(long_breaks, 1);
    assert_eq!(inter_item, 5);
}

#[tokio::test]
async fn test_cancellation_stops_before_the_next_target() {
    let api = Arc::new(FakeApi::with_users(&[("alice", "1")]));
    let pacer = Arc::new(RecordingPacer::default());
    let sink = CollectingSink::default();

    let engine = FollowEngine::new(api.clone(), pacer);
    engine.cancel_flag().cancel();

    let summary = engine.run(request(&["alice"]), &sink).await.unwrap();

    // A cancelled run is a normal partial completion, not a failure
    assert_eq!(summary, RunSummary::default());
    assert_eq!(api.lookup_count("alice"), 0);
    assert!(sink.completed.lock().unwrap().is_some());
}
