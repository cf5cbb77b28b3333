//! # Engine Module
//!
//! The run controller and its two workers: identifier resolution and follow
//! execution. One engine instance drives one run: authenticate, verify the
//! session, then walk the target list strictly in order, one account at a
//! time, with human-like pacing between items.
//!
//! ## Architecture
//!
//! ```text
//! FollowEngine (run controller, abort-vs-continue policy)
//!     ├── SessionManager     one live session, re-auth on demand
//!     ├── IdentifierResolver handle -> account id, layered fallbacks
//!     ├── FollowExecutor     follow mutation, rate-limit penalty wait
//!     └── ResultReporter     counters + itemized records via ProgressSink
//! ```
//!
//! ## Failure Policy
//!
//! Per-item failures (unknown account, exhausted lookups, generic follow
//! errors) are absorbed: the item is counted failed and the loop advances.
//! Session invalidity is different: every later call would fail the same
//! way, so the engine re-authenticates once and aborts the whole run on a
//! second consecutive signal. Authentication failures abort before the first
//! target. An aborted run still returns the counters accumulated so far.
//!
//! ## Pacing
//!
//! All waits are deliberate, not incidental: a uniformly sampled delay after
//! every item, a longer break after every fifth, a fixed multi-minute
//! penalty after a soft rate limit. They go through the [`Pacer`] seam so
//! tests replace them with a recorder instead of waiting out real minutes.

mod executor;
mod reporter;
mod resolver;

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;

pub use executor::FollowExecutor;
pub use reporter::{NullSink, ProgressSink, ResultReporter};
pub use resolver::IdentifierResolver;

use crate::{
    errors::{AuthError, RunError, RunFailure},
    info,
    instagram::InstagramApi,
    management::SessionManager,
    types::{FollowOutcome, OutcomeTag, Resolution, RunRequest, RunSummary, Target},
    utils, warning,
};

/// Settle time after authentication before the first operation.
pub const POST_LOGIN_SETTLE: Duration = Duration::from_secs(3);

/// Fixed delay between the two tries of one resolution method.
pub const METHOD_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Jitter bounds before each follow mutation, seconds.
pub const FOLLOW_JITTER_SECS: (u64, u64) = (1, 2);

/// Provider-imposed penalty window after a soft rate limit. Waited out in
/// full before the single retry.
pub const RATE_LIMIT_PENALTY: Duration = Duration::from_secs(300);

/// Every this many processed items, an extended break is inserted on top of
/// the regular inter-item delay.
pub const LONG_BREAK_EVERY: usize = 5;

/// Bounds of the extended break, seconds.
pub const LONG_BREAK_SECS: (u64, u64) = (120, 180);

/// How many followed accounts to prefetch for the skip path.
pub const FOLLOWING_PREFETCH: usize = 500;

/// Seam for every deliberate wait the engine performs.
///
/// Production uses [`TokioPacer`]; tests substitute a recorder so pacing
/// behavior is asserted, not slept through.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, duration: Duration);
}

/// The real pacer: a plain tokio sleep.
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Cooperative cancellation, checked between targets only. An in-flight
/// network call is never interrupted.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        CancelFlag(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// What a finished operation means for the loop.
enum Step {
    /// Item settled, advance to the next target.
    Advance,
    /// The run is over; remaining targets stay unprocessed.
    Abort(RunError),
}

/// Drives one run end to end.
///
/// Construct it with the API client and a pacer, then call [`run`] once.
/// The engine holds no state between runs; a new batch gets a new engine.
///
/// [`run`]: FollowEngine::run
pub struct FollowEngine {
    api: Arc<dyn InstagramApi>,
    pacer: Arc<dyn Pacer>,
    cancel: CancelFlag,
}

impl FollowEngine {
    pub fn new(api: Arc<dyn InstagramApi>, pacer: Arc<dyn Pacer>) -> Self {
        FollowEngine {
            api,
            pacer,
            cancel: CancelFlag::new(),
        }
    }

    /// Handle for requesting cancellation from another task. A cancelled run
    /// ends as a normal partial completion, not a failure.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Executes one run: authenticate, prefetch, process every target.
    ///
    /// Always produces a [`RunSummary`]; a run-fatal condition carries the
    /// partial summary inside the [`RunFailure`]. Per-item failures never
    /// surface here, they only move counters.
    pub async fn run(
        &self,
        request: RunRequest,
        sink: &dyn ProgressSink,
    ) -> Result<RunSummary, RunFailure> {
        let targets = normalize_targets(&request);
        let mut reporter = ResultReporter::new(sink);

        let mut sessions = SessionManager::new(Arc::clone(&self.api), request.credentials());
        if let Err(err) = sessions.authenticate().await {
            reporter.complete();
            return Err(RunFailure::new(RunError::Auth(err), reporter.summary()));
        }
        if let Some(token) = sessions.take_minted_token() {
            reporter.token_refreshed(&token);
        }

        // Let the fresh session settle, then verify it. A session that
        // cannot be verified immediately after login is not trusted with
        // mutations.
        self.pacer.pause(POST_LOGIN_SETTLE).await;
        if !sessions.check_live().await {
            reporter.complete();
            return Err(RunFailure::new(
                RunError::Auth(AuthError::Unknown(
                    "session failed its liveness probe after login".into(),
                )),
                reporter.summary(),
            ));
        }

        let resolver = IdentifierResolver::new(Arc::clone(&self.api), Arc::clone(&self.pacer));
        let mut executor = FollowExecutor::new(Arc::clone(&self.api), Arc::clone(&self.pacer));
        let mut strikes = SessionStrikes::default();

        match self
            .prefetch_following(&mut sessions, &reporter, &mut strikes)
            .await
        {
            Ok(Some(following)) => executor.set_following(following),
            Ok(None) => {}
            Err(err) => {
                reporter.complete();
                return Err(RunFailure::new(err, reporter.summary()));
            }
        }

        let total = targets.len();
        for target in &targets {
            if self.cancel.is_cancelled() {
                info!("Cancellation requested; stopping before the next target");
                break;
            }

            reporter.progress(target.sequence_index, total, &target.handle);

            let step = self
                .process_target(
                    target,
                    &mut sessions,
                    &resolver,
                    &executor,
                    &mut reporter,
                    &mut strikes,
                )
                .await;

            match step {
                Step::Advance => {}
                Step::Abort(err) => {
                    reporter.complete();
                    return Err(RunFailure::new(err, reporter.summary()));
                }
            }

            let is_last = target.sequence_index + 1 == total;
            if !is_last {
                self.pace(target.sequence_index, request.delay_min, request.delay_max)
                    .await;
            }
        }

        reporter.complete();
        Ok(reporter.summary())
    }

    /// One target through pre-flight, resolution, and follow.
    async fn process_target(
        &self,
        target: &Target,
        sessions: &mut SessionManager,
        resolver: &IdentifierResolver,
        executor: &FollowExecutor,
        reporter: &mut ResultReporter<'_>,
        strikes: &mut SessionStrikes,
    ) -> Step {
        // Pre-flight probe. An abort here leaves the current item uncounted;
        // nothing was attempted for it yet.
        if !sessions.check_live().await {
            warning!("Session went stale; re-authenticating");
            if !try_reauthenticate(sessions, reporter).await {
                return Step::Abort(RunError::SessionLost(
                    "session expired and re-authentication failed".into(),
                ));
            }
        }

        // Known targets skip resolution entirely.
        if executor.is_already_following(&target.handle) {
            reporter.record(&target.handle, OutcomeTag::AlreadyFollowing);
            strikes.reset();
            return Step::Advance;
        }

        let account_id = match self
            .resolve_with_recovery(target, sessions, resolver, reporter, strikes)
            .await
        {
            Ok(Some(id)) => id,
            Ok(None) => return Step::Advance,
            Err(err) => return Step::Abort(err),
        };

        let session = match sessions.current_session() {
            Some(session) => session,
            None => {
                return Step::Abort(RunError::SessionLost("no session available".into()));
            }
        };

        match executor.follow(&session, &target.handle, &account_id).await {
            FollowOutcome::Followed => {
                strikes.reset();
                reporter.record(&target.handle, OutcomeTag::Followed);
                info!("Followed {}", target.handle);
            }
            FollowOutcome::AlreadyFollowing => {
                strikes.reset();
                reporter.record(&target.handle, OutcomeTag::AlreadyFollowing);
            }
            FollowOutcome::RateLimitedThenFollowed => {
                strikes.reset();
                reporter.record(&target.handle, OutcomeTag::FollowedAfterWait);
                info!("Followed {} after the rate-limit wait", target.handle);
            }
            FollowOutcome::RateLimitedThenFailed { reason } => {
                reporter.record(&target.handle, OutcomeTag::RateLimited);
                warning!("Gave up on {} after the rate-limit wait: {}", target.handle, reason);
            }
            FollowOutcome::Failed { reason } => {
                reporter.record(&target.handle, OutcomeTag::Failed);
                warning!("Could not follow {}: {}", target.handle, reason);
            }
            FollowOutcome::SessionInvalid => {
                // The mutation's side effect is ambiguous, so the item is
                // failed either way; a successful re-auth only lets the run
                // continue with the next target.
                reporter.record(&target.handle, OutcomeTag::SessionExpired);
                if strikes.strike() {
                    return Step::Abort(RunError::SessionLost(
                        "session invalidated twice in a row".into(),
                    ));
                }
                if !try_reauthenticate(sessions, reporter).await {
                    return Step::Abort(RunError::SessionLost(
                        "session expired during follow and re-authentication failed".into(),
                    ));
                }
            }
        }

        Step::Advance
    }

    /// Resolution with the one-re-auth recovery path.
    ///
    /// `Ok(Some(id))` resolved, `Ok(None)` item settled as failed (already
    /// recorded), `Err` run-fatal.
    async fn resolve_with_recovery(
        &self,
        target: &Target,
        sessions: &mut SessionManager,
        resolver: &IdentifierResolver,
        reporter: &mut ResultReporter<'_>,
        strikes: &mut SessionStrikes,
    ) -> Result<Option<String>, RunError> {
        for _ in 0..2 {
            let session = sessions
                .current_session()
                .ok_or_else(|| RunError::SessionLost("no session available".into()))?;

            match resolver.resolve(&session, &target.handle).await {
                Resolution::Resolved { account_id, method } => {
                    strikes.reset();
                    info!("Resolved {} via {}", target.handle, method.label());
                    return Ok(Some(account_id));
                }
                Resolution::NotFound => {
                    reporter.record(&target.handle, OutcomeTag::UserNotFound);
                    warning!("No account named {}", target.handle);
                    return Ok(None);
                }
                Resolution::Exhausted { last_error } => {
                    reporter.record(&target.handle, OutcomeTag::Failed);
                    warning!("Could not resolve {}: {}", target.handle, last_error);
                    return Ok(None);
                }
                Resolution::SessionInvalid => {
                    if strikes.strike() {
                        reporter.record(&target.handle, OutcomeTag::SessionExpired);
                        return Err(RunError::SessionLost(
                            "session invalidated twice in a row".into(),
                        ));
                    }
                    warning!("Session rejected during resolution; re-authenticating");
                    if !try_reauthenticate(sessions, reporter).await {
                        reporter.record(&target.handle, OutcomeTag::SessionExpired);
                        return Err(RunError::SessionLost(
                            "session expired during resolution and re-authentication failed"
                                .into(),
                        ));
                    }
                    // Loop retries resolution once with the fresh session.
                }
            }
        }

        reporter.record(&target.handle, OutcomeTag::SessionExpired);
        Err(RunError::SessionLost(
            "session invalidated twice in a row".into(),
        ))
    }

    /// Prefetches the following list for the skip path.
    ///
    /// A session-invalidity signal gets the uniform one-re-auth treatment;
    /// any other failure degrades to attempting every target.
    async fn prefetch_following(
        &self,
        sessions: &mut SessionManager,
        reporter: &ResultReporter<'_>,
        strikes: &mut SessionStrikes,
    ) -> Result<Option<std::collections::HashSet<String>>, RunError> {
        for _ in 0..2 {
            let Some(session) = sessions.current_session() else {
                return Ok(None);
            };

            match self.api.following_usernames(&session, FOLLOWING_PREFETCH).await {
                Ok(following) => {
                    info!("Prefetched {} followed accounts", following.len());
                    // A fetch that succeeded after recovery clears the
                    // consecutive-signal accounting.
                    strikes.reset();
                    return Ok(Some(following));
                }
                Err(err) if err.is_session_invalid() => {
                    if strikes.strike() {
                        return Err(RunError::SessionLost(
                            "session invalidated twice in a row".into(),
                        ));
                    }
                    warning!("Session rejected while prefetching; re-authenticating");
                    if !try_reauthenticate(sessions, reporter).await {
                        return Err(RunError::SessionLost(
                            "session expired during prefetch and re-authentication failed".into(),
                        ));
                    }
                }
                Err(err) => {
                    warning!("Could not prefetch the following list: {}", err);
                    return Ok(None);
                }
            }
        }

        Err(RunError::SessionLost(
            "session invalidated twice in a row".into(),
        ))
    }

    /// Inter-item pacing: the regular sampled delay, plus the extended break
    /// after every fifth item.
    async fn pace(&self, index: usize, delay_min: u64, delay_max: u64) {
        let secs = utils::uniform_secs(delay_min, delay_max);
        self.pacer.pause(Duration::from_secs_f64(secs)).await;

        if (index + 1) % LONG_BREAK_EVERY == 0 {
            let secs = utils::uniform_secs(LONG_BREAK_SECS.0, LONG_BREAK_SECS.1);
            info!("Taking an extended break ({:.0} seconds)", secs);
            self.pacer.pause(Duration::from_secs_f64(secs)).await;
        }
    }
}

/// Re-authentication plus the minted-token handoff: a token minted by the
/// fallback login is surfaced through the sink so the caller's credential
/// store can adopt it.
async fn try_reauthenticate(
    sessions: &mut SessionManager,
    reporter: &ResultReporter<'_>,
) -> bool {
    if !sessions.reauthenticate().await {
        return false;
    }
    if let Some(token) = sessions.take_minted_token() {
        reporter.token_refreshed(&token);
    }
    true
}

/// Consecutive session-invalidity accounting for one run. Any two strikes
/// without a successful operation in between abort the run.
#[derive(Default)]
struct SessionStrikes(u8);

impl SessionStrikes {
    /// Registers one signal; `true` means this was the second in a row.
    fn strike(&mut self) -> bool {
        self.0 += 1;
        self.0 >= 2
    }

    fn reset(&mut self) {
        self.0 = 0;
    }
}

/// Applies the target cap and normalization to the raw request list.
///
/// The cap applies to the raw inputs before normalization, so a dropped
/// input still consumes one slot. Inputs that do not reduce to a single
/// handle are dropped silently; they never enter the run and never count
/// as failures.
fn normalize_targets(request: &RunRequest) -> Vec<Target> {
    request
        .targets
        .iter()
        .take(request.max_targets)
        .filter_map(|raw| utils::normalize_handle(raw))
        .enumerate()
        .map(|(sequence_index, handle)| Target {
            handle,
            sequence_index,
        })
        .collect()
}
