//! Poll-until-terminal driver for the engine's detection job.
//!
//! The engine exposes no completion callback, only a pollable status and
//! a raw progress triple. This poller drives the job to a terminal state,
//! aggregating raw reports through [`overall_percent`] and emitting a
//! progress snapshot only when the aggregated percentage actually
//! changes, so the UI never sees redundant churn.
//!
//! The `last_known` accumulator lives on the `run` stack: each invocation
//! tracks its own monotonicity, and two overlapping detection runs cannot
//! corrupt each other.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::time::Instant;

use crate::cancel::CancelToken;
use crate::engine::{AnalyticsEngine, JobStatus};
use crate::progress::{overall_percent, phase_message, ProgressCallback, SyncProgress, SyncStatus};

/// Reference polling cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Ceiling on one detection run before the poller gives up waiting.
pub const DEFAULT_MAX_TOTAL: Duration = Duration::from_secs(300);

/// Drives the engine's asynchronous detection job to completion.
pub struct AnalysisPoller {
    engine: Arc<dyn AnalyticsEngine>,
    poll_interval: Duration,
    max_total: Duration,
}

impl AnalysisPoller {
    pub fn new(engine: Arc<dyn AnalyticsEngine>) -> Self {
        Self::with_timing(engine, DEFAULT_POLL_INTERVAL, DEFAULT_MAX_TOTAL)
    }

    pub fn with_timing(
        engine: Arc<dyn AnalyticsEngine>,
        poll_interval: Duration,
        max_total: Duration,
    ) -> Self {
        Self {
            engine,
            poll_interval,
            max_total,
        }
    }

    /// Poll the job until it reaches a terminal state, is cancelled, or
    /// exceeds the time ceiling.
    ///
    /// `on_progress` fires at most once per distinct percentage and never
    /// after this returns. A job `Error` is logged and returned, not
    /// raised: the activities are already stored, only the analysis is
    /// incomplete. A timeout is soft: the caller proceeds without
    /// complete analysis and the job keeps running engine-side.
    pub async fn run(&self, cancel: &CancelToken, on_progress: &ProgressCallback) -> JobStatus {
        let started = Instant::now();
        let mut last_percent: u8 = 0;

        loop {
            let status = self.engine.poll_job().await;

            match status {
                JobStatus::Complete => {
                    if last_percent < 100 {
                        on_progress(SyncProgress::new(
                            SyncStatus::Computing,
                            100,
                            100,
                            phase_message("complete", 100),
                        ));
                    }
                    info!(
                        "[AnalysisPoller] Detection complete after {:.1}s",
                        started.elapsed().as_secs_f64()
                    );
                    return status;
                }
                JobStatus::Error => {
                    warn!("[AnalysisPoller] Detection job failed; activities remain synced");
                    return status;
                }
                JobStatus::Idle | JobStatus::Running => {}
            }

            if cancel.is_cancelled() {
                debug!("[AnalysisPoller] Cancelled while job {}", status.as_str());
                return status;
            }

            if started.elapsed() >= self.max_total {
                warn!(
                    "[AnalysisPoller] Giving up after {:.0}s; job still {}",
                    self.max_total.as_secs_f64(),
                    status.as_str()
                );
                return status;
            }

            if status == JobStatus::Running {
                let report = self.engine.job_progress().await;
                let percent =
                    overall_percent(&report.phase, report.completed, report.total, last_percent);
                if percent != last_percent {
                    last_percent = percent;
                    on_progress(SyncProgress::new(
                        SyncStatus::Computing,
                        percent as u32,
                        100,
                        phase_message(&report.phase, percent),
                    ));
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
