//! Status watchers built on the polling primitive.
//!
//! Two deployed profiles: background-job watching (3s interval, 10-minute
//! cap) and autonomous-run progress watching (2s interval, uncapped until
//! the session reports terminal progress). Transient backend failures keep
//! the watcher alive; anything else terminates it with the error so the
//! caller can surface it.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use proofstage_backend::{AnalysisBackend, JobStatus, SessionProgress};
use proofstage_poll::{
    start, PollHandle, PollResult, JOB_WATCH_INTERVAL, JOB_WATCH_MAX_DURATION,
    PROGRESS_WATCH_INTERVAL,
};
use proofstage_utils::error::FlowError;
use proofstage_utils::types::SessionStatus;

/// Watch an autonomous session's overall progress until it reports
/// completion. Uncapped; cancel the handle when the caller navigates away.
///
/// Uses the default [`PROGRESS_WATCH_INTERVAL`]; deployments that tune
/// `poll.progress_interval_secs` go through
/// [`watch_session_progress_with`].
#[must_use]
pub fn watch_session_progress(
    backend: Arc<dyn AnalysisBackend>,
    session_id: impl Into<String>,
) -> PollHandle<Result<SessionProgress, FlowError>> {
    watch_session_progress_with(backend, session_id, PROGRESS_WATCH_INTERVAL)
}

/// [`watch_session_progress`] with a caller-supplied interval, typically
/// `PollConfig::progress_interval()`.
#[must_use]
pub fn watch_session_progress_with(
    backend: Arc<dyn AnalysisBackend>,
    session_id: impl Into<String>,
    interval: Duration,
) -> PollHandle<Result<SessionProgress, FlowError>> {
    let session_id = session_id.into();
    start(
        move || {
            let backend = Arc::clone(&backend);
            let session_id = session_id.clone();
            async move {
                match backend.session_progress(&session_id).await {
                    Ok(progress) => {
                        debug!(
                            session_id = %session_id,
                            percent = progress.percent_complete,
                            "progress report"
                        );
                        if progress.status == SessionStatus::Completed
                            || progress.percent_complete >= 100
                        {
                            PollResult::Terminal(Ok(progress))
                        } else {
                            PollResult::Pending
                        }
                    }
                    Err(err) if err.is_transient() => {
                        warn!(session_id = %session_id, error = %err, "progress check failed, will retry");
                        PollResult::Pending
                    }
                    Err(err) => PollResult::Terminal(Err(err)),
                }
            }
        },
        interval,
        None,
    )
}

/// Watch a background job until it reaches a terminal status, bounded at
/// ten minutes. A `TimedOut` outcome means the job is still pending; the
/// caller decides whether that counts as failure.
///
/// Uses the default [`JOB_WATCH_INTERVAL`] / [`JOB_WATCH_MAX_DURATION`]
/// profile; deployments that tune the `poll` config table go through
/// [`watch_job_with`].
#[must_use]
pub fn watch_job(
    backend: Arc<dyn AnalysisBackend>,
    job_id: impl Into<String>,
) -> PollHandle<Result<JobStatus, FlowError>> {
    watch_job_with(backend, job_id, JOB_WATCH_INTERVAL, Some(JOB_WATCH_MAX_DURATION))
}

/// [`watch_job`] with a caller-supplied interval and cap, typically
/// `PollConfig::job_interval()` / `PollConfig::job_max_duration()`.
#[must_use]
pub fn watch_job_with(
    backend: Arc<dyn AnalysisBackend>,
    job_id: impl Into<String>,
    interval: Duration,
    max_duration: Option<Duration>,
) -> PollHandle<Result<JobStatus, FlowError>> {
    let job_id = job_id.into();
    start(
        move || {
            let backend = Arc::clone(&backend);
            let job_id = job_id.clone();
            async move {
                match backend.job_status(&job_id).await {
                    Ok(status) if status.is_terminal() => PollResult::Terminal(Ok(status)),
                    Ok(_) => PollResult::Pending,
                    Err(err) if err.is_transient() => {
                        warn!(job_id = %job_id, error = %err, "job check failed, will retry");
                        PollResult::Pending
                    }
                    Err(err) => PollResult::Terminal(Err(err)),
                }
            }
        },
        interval,
        max_duration,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proofstage_backend::mock::MockBackend;
    use proofstage_poll::PollOutcome;

    fn backend() -> Arc<MockBackend> {
        Arc::new(MockBackend::new())
    }

    #[tokio::test(start_paused = true)]
    async fn progress_watch_stops_on_completed_report() {
        let mock = backend();
        mock.script_progress([
            SessionProgress {
                status: SessionStatus::Active,
                percent_complete: 33,
            },
            SessionProgress {
                status: SessionStatus::Active,
                percent_complete: 66,
            },
            SessionProgress {
                status: SessionStatus::Completed,
                percent_complete: 100,
            },
        ]);
        let handle =
            watch_session_progress(Arc::clone(&mock) as Arc<dyn AnalysisBackend>, "sess-1");

        match handle.outcome().await {
            PollOutcome::Terminal(Ok(progress)) => {
                assert_eq!(progress.percent_complete, 100);
                assert_eq!(progress.status, SessionStatus::Completed);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn progress_watch_treats_full_percent_as_terminal() {
        let mock = backend();
        mock.script_progress([SessionProgress {
            status: SessionStatus::Active,
            percent_complete: 100,
        }]);
        let handle =
            watch_session_progress(Arc::clone(&mock) as Arc<dyn AnalysisBackend>, "sess-1");
        assert!(matches!(
            handle.outcome().await,
            PollOutcome::Terminal(Ok(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn job_watch_stops_on_terminal_status() {
        let mock = backend();
        mock.script_jobs([JobStatus::Pending, JobStatus::Pending, JobStatus::Done]);
        let handle = watch_job(Arc::clone(&mock) as Arc<dyn AnalysisBackend>, "job-1");

        match handle.outcome().await {
            PollOutcome::Terminal(Ok(status)) => assert_eq!(status, JobStatus::Done),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn job_watch_reports_failed_jobs_as_terminal_too() {
        let mock = backend();
        mock.script_jobs([JobStatus::Failed]);
        let handle = watch_job(Arc::clone(&mock) as Arc<dyn AnalysisBackend>, "job-1");
        assert!(matches!(
            handle.outcome().await,
            PollOutcome::Terminal(Ok(JobStatus::Failed))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn job_watch_times_out_while_job_stays_pending() {
        // The mock reports Pending forever once its script drains.
        let mock = backend();
        let handle = watch_job(Arc::clone(&mock) as Arc<dyn AnalysisBackend>, "job-1");
        assert!(matches!(handle.outcome().await, PollOutcome::TimedOut));
    }

    #[tokio::test(start_paused = true)]
    async fn configured_poll_profile_drives_the_job_watcher() {
        use proofstage_config::PollConfig;

        let poll = PollConfig {
            job_interval_secs: 1,
            job_max_duration_secs: 4,
            progress_interval_secs: 1,
        };

        // Terminal within the configured cap.
        let mock = backend();
        mock.script_jobs([JobStatus::Pending, JobStatus::Done]);
        let handle = watch_job_with(
            Arc::clone(&mock) as Arc<dyn AnalysisBackend>,
            "job-cfg",
            poll.job_interval(),
            Some(poll.job_max_duration()),
        );
        assert!(matches!(
            handle.outcome().await,
            PollOutcome::Terminal(Ok(JobStatus::Done))
        ));

        // A pending-forever job times out at the configured cap, far
        // before the built-in ten-minute default.
        let mock = backend();
        let started = tokio::time::Instant::now();
        let handle = watch_job_with(
            Arc::clone(&mock) as Arc<dyn AnalysisBackend>,
            "job-cfg",
            poll.job_interval(),
            Some(poll.job_max_duration()),
        );
        assert!(matches!(handle.outcome().await, PollOutcome::TimedOut));
        assert!(started.elapsed() <= std::time::Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn configured_interval_drives_the_progress_watcher() {
        use proofstage_config::PollConfig;

        let mock = backend();
        mock.script_progress([
            SessionProgress {
                status: SessionStatus::Active,
                percent_complete: 50,
            },
            SessionProgress {
                status: SessionStatus::Completed,
                percent_complete: 100,
            },
        ]);
        let handle = watch_session_progress_with(
            Arc::clone(&mock) as Arc<dyn AnalysisBackend>,
            "sess-cfg",
            PollConfig::default().progress_interval(),
        );
        assert!(matches!(
            handle.outcome().await,
            PollOutcome::Terminal(Ok(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_a_watch_stops_it() {
        let mock = backend();
        let handle =
            watch_session_progress(Arc::clone(&mock) as Arc<dyn AnalysisBackend>, "sess-1");
        handle.cancel();
        assert!(matches!(handle.outcome().await, PollOutcome::Cancelled));
    }
}
