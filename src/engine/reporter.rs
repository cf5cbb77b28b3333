use crate::types::{ItemRecord, OutcomeTag, RunSummary, SessionToken};

/// Collaborator interface for run observability.
///
/// The engine pushes one itemized record per processed target, coarse
/// progress lines, freshly minted session tokens, and the final summary
/// through this trait. All methods default to no-ops so callers implement
/// only what they consume; a web worker would forward these to its job row,
/// the CLI prints them.
pub trait ProgressSink: Send + Sync {
    fn on_item_outcome(&self, _record: &ItemRecord) {}

    fn on_progress(&self, _done: usize, _total: usize, _message: &str) {}

    /// A credential login minted a new session token. The engine never
    /// persists it; storing it for future runs is the caller's business.
    fn on_token_refreshed(&self, _token: &SessionToken) {}

    fn on_run_complete(&self, _summary: &RunSummary) {}
}

/// Sink that discards everything, for callers that only want the returned
/// summary.
pub struct NullSink;

impl ProgressSink for NullSink {}

/// Accumulates the run counters and emits itemized records.
///
/// This is the only component that touches the [`ProgressSink`]. `record`
/// increments exactly one bucket per call, so the counter invariant
/// `followed + already_following + failed == total_processed` holds by
/// construction on every exit path.
pub struct ResultReporter<'a> {
    sink: &'a dyn ProgressSink,
    summary: RunSummary,
}

impl<'a> ResultReporter<'a> {
    pub fn new(sink: &'a dyn ProgressSink) -> Self {
        ResultReporter {
            sink,
            summary: RunSummary::default(),
        }
    }

    /// Records the final outcome of one target: one counter increment plus
    /// the itemized record through the sink.
    pub fn record(&mut self, handle: &str, tag: OutcomeTag) {
        match tag {
            OutcomeTag::Followed | OutcomeTag::FollowedAfterWait => self.summary.followed += 1,
            OutcomeTag::AlreadyFollowing => self.summary.already_following += 1,
            _ => self.summary.failed += 1,
        }
        self.summary.total_processed += 1;

        let record = ItemRecord::now(handle, tag);
        self.sink.on_item_outcome(&record);
    }

    pub fn progress(&self, done: usize, total: usize, message: &str) {
        self.sink.on_progress(done, total, message);
    }

    pub fn token_refreshed(&self, token: &SessionToken) {
        self.sink.on_token_refreshed(token);
    }

    /// Emits the final summary through the sink. Called on every exit,
    /// complete or aborted.
    pub fn complete(&self) {
        self.sink.on_run_complete(&self.summary);
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }
}
