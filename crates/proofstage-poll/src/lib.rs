//! Bounded polling primitive for background-status watching.
//!
//! A poll task repeatedly invokes an async status check at a fixed interval
//! until the check reports a terminal result, an optional maximum duration
//! elapses, or the caller cancels. The three outcomes are distinct: a
//! timeout is not an error, and it is the caller's business whether it
//! counts as a failure.
//!
//! Invariants:
//! - the check runs immediately on start, then once per interval;
//! - at most one check is in flight at a time; ticks that fire while a
//!   check is pending are dropped, not queued;
//! - the check is never invoked again after cancellation;
//! - the task never runs past `max_duration` when one is set.
//!
//! Two deployed profiles exist in the product: background-job watching at
//! [`JOB_WATCH_INTERVAL`] capped at [`JOB_WATCH_MAX_DURATION`], and
//! autonomous-run progress watching at [`PROGRESS_WATCH_INTERVAL`] with no
//! cap other than reaching a terminal progress report.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Background-job watching interval (payment and similar jobs).
pub const JOB_WATCH_INTERVAL: Duration = Duration::from_secs(3);
/// Hard cap on background-job watching.
pub const JOB_WATCH_MAX_DURATION: Duration = Duration::from_secs(600);
/// Autonomous-run progress watching interval (uncapped until terminal).
pub const PROGRESS_WATCH_INTERVAL: Duration = Duration::from_secs(2);

/// Result of a single status check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollResult<T> {
    /// Keep polling.
    Pending,
    /// Stop polling with this value.
    Terminal(T),
}

/// Final outcome of a poll task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// The check reported a terminal result.
    Terminal(T),
    /// `max_duration` elapsed before a terminal result. Not an error.
    TimedOut,
    /// The caller cancelled the task.
    Cancelled,
}

/// Handle to a running poll task.
///
/// Dropping the handle does not stop the task; call
/// [`cancel`](Self::cancel) for explicit teardown (session end, navigation
/// away), or await [`outcome`](Self::outcome) to observe the result.
#[derive(Debug)]
pub struct PollHandle<T> {
    token: CancellationToken,
    join: JoinHandle<PollOutcome<T>>,
}

impl<T> PollHandle<T> {
    /// Request cancellation. The in-flight check, if any, is abandoned and
    /// the check is never invoked again.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Token that fires when the task is cancelled, for callers that need
    /// to tie other teardown to the same signal.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Wait for the task to finish and return its outcome.
    pub async fn outcome(self) -> PollOutcome<T> {
        // A panicked or aborted task is indistinguishable from cancellation
        // at this boundary.
        self.join.await.unwrap_or(PollOutcome::Cancelled)
    }
}

/// Start a poll task.
///
/// `check` is invoked immediately, then once per `interval`. Pass
/// `max_duration = None` for tasks bounded only by their terminal
/// condition.
pub fn start<C, Fut, T>(
    mut check: C,
    interval: Duration,
    max_duration: Option<Duration>,
) -> PollHandle<T>
where
    C: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = PollResult<T>> + Send,
    T: Send + 'static,
{
    let token = CancellationToken::new();
    let task_token = token.clone();

    let join = tokio::spawn(async move {
        let deadline = max_duration.map(|d| Instant::now() + d);
        let mut ticker = time::interval(interval);
        // A tick that fires while a check is pending is dropped, not queued.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                () = task_token.cancelled() => {
                    debug!("poll task cancelled before tick");
                    return PollOutcome::Cancelled;
                }
                () = until(deadline) => return PollOutcome::TimedOut,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                () = task_token.cancelled() => {
                    debug!("poll task cancelled during check");
                    return PollOutcome::Cancelled;
                }
                () = until(deadline) => return PollOutcome::TimedOut,
                result = check() => {
                    if let PollResult::Terminal(value) = result {
                        return PollOutcome::Terminal(value);
                    }
                }
            }
        }
    });

    PollHandle { token, join }
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
