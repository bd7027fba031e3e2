//! Background polling of import job progress.
//!
//! [`spawn_poller`] starts a tokio task that asks a [`ProgressSource`] for a
//! job snapshot on a fixed interval until the job reaches a terminal status
//! or the [`CancellationToken`] is triggered. The latest [`PollStatus`] is
//! published through a `watch` channel, so observers always see the newest
//! snapshot and may miss intermediate ones.
//!
//! Dropping the returned [`PollHandle`] cancels the task.

use std::sync::Arc;
use std::time::Duration;

use hrms_client::ProgressSource;
use hrms_core::job::{JobOutcome, JobProgress};
use hrms_core::types::EntityId;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Default delay between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Default number of consecutive failed polls before the poller reports
/// itself as stalled.
pub const DEFAULT_STALL_THRESHOLD: u32 = 5;

/// Tunable parameters for the poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// Delay between polls. The first poll happens immediately.
    pub interval: Duration,
    /// Consecutive failures after which [`PollStatus::stalled`] is set.
    pub stall_threshold: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            stall_threshold: DEFAULT_STALL_THRESHOLD,
        }
    }
}

/// Snapshot published after every poll attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollStatus {
    /// Most recent successful snapshot, kept across failed polls.
    pub latest: Option<JobProgress>,
    pub consecutive_failures: u32,
    /// Set once `consecutive_failures` reaches the stall threshold; cleared
    /// by the next successful poll.
    pub stalled: bool,
}

/// Owner of a running poll task.
#[derive(Debug)]
pub struct PollHandle {
    job_id: EntityId,
    cancel: CancellationToken,
    task: Option<JoinHandle<Option<JobOutcome>>>,
    updates: watch::Receiver<PollStatus>,
}

impl PollHandle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// The most recently published status.
    pub fn status(&self) -> PollStatus {
        self.updates.borrow().clone()
    }

    /// A receiver that is notified on every published status.
    pub fn subscribe(&self) -> watch::Receiver<PollStatus> {
        self.updates.clone()
    }

    /// Stop polling. An in-flight request is abandoned.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether the task has exited, either on a terminal status or after
    /// cancellation.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the task to exit. Returns the outcome if a terminal status
    /// was observed, `None` if the poller was cancelled.
    pub async fn join(mut self) -> Option<JobOutcome> {
        let task = self.task.take()?;
        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(job_id = %self.job_id, error = %e, "Progress poller task failed");
                None
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Start polling `job_id` on a background task.
///
/// `on_complete` is called exactly once, with the first terminal snapshot.
/// It is never called if the poller is cancelled first.
pub fn spawn_poller<S, F>(
    source: Arc<S>,
    job_id: impl Into<EntityId>,
    config: PollerConfig,
    on_complete: F,
) -> PollHandle
where
    S: ProgressSource + ?Sized + 'static,
    F: FnOnce(JobOutcome) + Send + 'static,
{
    let job_id = job_id.into();
    let cancel = CancellationToken::new();
    let (tx, rx) = watch::channel(PollStatus::default());

    let task = tokio::spawn(run(
        source,
        job_id.clone(),
        config,
        cancel.clone(),
        tx,
        on_complete,
    ));

    PollHandle {
        job_id,
        cancel,
        task: Some(task),
        updates: rx,
    }
}

async fn run<S, F>(
    source: Arc<S>,
    job_id: EntityId,
    config: PollerConfig,
    cancel: CancellationToken,
    tx: watch::Sender<PollStatus>,
    on_complete: F,
) -> Option<JobOutcome>
where
    S: ProgressSource + ?Sized,
    F: FnOnce(JobOutcome),
{
    tracing::info!(
        job_id = %job_id,
        interval_ms = config.interval.as_millis() as u64,
        "Progress poller started",
    );

    // `interval` panics on a zero period.
    let mut interval = tokio::time::interval(config.interval.max(Duration::from_millis(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut status = PollStatus::default();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(job_id = %job_id, "Progress poller cancelled");
                return None;
            }
            _ = interval.tick() => {}
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(job_id = %job_id, "Progress poller cancelled during request");
                return None;
            }
            result = source.job_progress(&job_id) => result,
        };

        match result {
            Ok(snapshot) => {
                tracing::debug!(
                    job_id = %job_id,
                    status = %snapshot.status,
                    processed = snapshot.processed,
                    total = snapshot.total,
                    "Polled job progress",
                );
                if status.stalled {
                    tracing::info!(job_id = %job_id, "Progress polling recovered");
                }
                status.consecutive_failures = 0;
                status.stalled = false;
                status.latest = Some(snapshot.clone());
                tx.send_replace(status.clone());

                if let Some(outcome) = JobOutcome::from_terminal(snapshot) {
                    if outcome.success {
                        tracing::info!(
                            job_id = %job_id,
                            success_count = outcome.final_state.success_count,
                            error_count = outcome.final_state.error_count,
                            "Import job completed",
                        );
                    } else {
                        tracing::error!(
                            job_id = %job_id,
                            status = %outcome.final_state.status,
                            error_count = outcome.final_state.error_count,
                            "Import job ended unsuccessfully",
                        );
                    }
                    on_complete(outcome.clone());
                    return Some(outcome);
                }
            }
            Err(e) => {
                status.consecutive_failures += 1;
                tracing::warn!(
                    job_id = %job_id,
                    error = %e,
                    consecutive_failures = status.consecutive_failures,
                    "Progress poll failed",
                );
                if !status.stalled && status.consecutive_failures >= config.stall_threshold {
                    status.stalled = true;
                    tracing::warn!(
                        job_id = %job_id,
                        consecutive_failures = status.consecutive_failures,
                        "Progress polling stalled",
                    );
                }
                tx.send_replace(status.clone());
            }
        }
    }
}
