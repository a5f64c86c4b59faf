//! Top-level sync coordination.
//!
//! One coordinator owns the fetch -> store -> analyze sequence for a
//! process. It captures the sync generation before doing any work and
//! re-checks it at every commit point; a mismatch means the user reset
//! state while the sync was in flight, and the run's results are
//! discarded silently. Generation checking is the correctness
//! mechanism; the mount check and cancellation token only avoid wasted
//! work.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::engine::{AnalyticsEngine, IngestRecord, JobStatus};
use crate::error::{Result, SyncError};
use crate::fetch::{BatchFetcher, FetchProgressCallback, DEFAULT_BATCH_SIZE};
use crate::generation::GenerationTracker;
use crate::poller::{AnalysisPoller, DEFAULT_MAX_TOTAL, DEFAULT_POLL_INTERVAL};
use crate::progress::{ProgressCallback, SyncProgress, SyncStatus};
use crate::retention::RetentionCleaner;
use crate::telemetry::TelemetrySource;
use crate::ActivityRef;

/// Returns whether the consuming view is still mounted. Progress stops
/// flowing to an unmounted caller; the sync itself is governed by the
/// generation, not by this.
pub type MountedCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// Tunables for one coordinator instance.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub batch_size: usize,
    pub poll_interval: Duration,
    pub max_poll_total: Duration,
    /// Run a retention cleanup after each successful sync, when a cleaner
    /// is attached via [`SyncCoordinator::with_retention`].
    pub retention_aware: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_total: DEFAULT_MAX_TOTAL,
            retention_aware: false,
        }
    }
}

/// Per-call hooks supplied by the UI shell.
#[derive(Clone)]
pub struct SyncHooks {
    /// Pre-formatted authorization value for the telemetry service.
    /// `None` is fatal to the attempt.
    pub credential: Option<String>,
    pub cancel: CancelToken,
    pub mounted: MountedCheck,
    pub on_progress: ProgressCallback,
}

impl SyncHooks {
    /// Hooks with an always-mounted check and a no-op progress sink.
    pub fn new(credential: Option<String>) -> Self {
        Self {
            credential,
            cancel: CancelToken::new(),
            mounted: Arc::new(|| true),
            on_progress: Arc::new(|_| {}),
        }
    }
}

/// Result of one sync attempt.
#[derive(Debug, Clone, Default)]
pub struct SyncResult {
    /// Activities successfully fetched and stored, whether or not the
    /// analysis phase completed.
    pub synced_ids: Vec<String>,
    /// How many of those carried at least one valid GPS point.
    pub with_data_count: u32,
    pub message: String,
    /// True when the run was superseded by a reset and its results were
    /// thrown away. Not an error.
    pub discarded: bool,
}

impl SyncResult {
    fn empty(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    fn discarded() -> Self {
        Self {
            discarded: true,
            message: "Sync superseded by reset".to_string(),
            ..Default::default()
        }
    }
}

/// Sequences fetch -> store -> analyze with cancellation, mutual exclusion
/// and staleness checkpoints.
pub struct SyncCoordinator {
    engine: Arc<dyn AnalyticsEngine>,
    fetcher: BatchFetcher,
    poller: AnalysisPoller,
    tracker: Arc<GenerationTracker>,
    retention: Option<RetentionCleaner>,
    retention_aware: bool,
    in_flight: AtomicBool,
}

impl SyncCoordinator {
    pub fn new(
        engine: Arc<dyn AnalyticsEngine>,
        source: Arc<dyn TelemetrySource>,
        tracker: Arc<GenerationTracker>,
        options: SyncOptions,
    ) -> Self {
        Self {
            fetcher: BatchFetcher::new(source, options.batch_size),
            poller: AnalysisPoller::with_timing(
                Arc::clone(&engine),
                options.poll_interval,
                options.max_poll_total,
            ),
            engine,
            tracker,
            retention: None,
            retention_aware: options.retention_aware,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Attach a retention cleaner, run after each successful sync when
    /// [`SyncOptions::retention_aware`] is set.
    pub fn with_retention(mut self, cleaner: RetentionCleaner) -> Self {
        self.retention = Some(cleaner);
        self
    }

    /// Sync the given activities into the engine.
    ///
    /// A single sync runs per coordinator at a time; a call that arrives
    /// while one is in flight returns immediately with an empty result
    /// and no side effects, so redundant syncs don't pile up.
    ///
    /// Only a missing credential or an unavailable engine is an error.
    /// Per-item fetch failures, detection failures and timeouts degrade
    /// to partial success, reported through the result.
    pub async fn sync(&self, activities: &[ActivityRef], hooks: &SyncHooks) -> Result<SyncResult> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            debug!("[SyncCoordinator] Sync already in progress, ignoring call");
            return Ok(SyncResult::empty("Sync already in progress"));
        }

        let result = self.run(activities, hooks).await;
        self.in_flight.store(false, Ordering::Release);
        result
    }

    async fn run(&self, activities: &[ActivityRef], hooks: &SyncHooks) -> Result<SyncResult> {
        let emit = gated_progress(hooks);

        let credential = match hooks.credential.as_deref() {
            Some(c) if !c.is_empty() => c,
            _ => {
                emit(SyncProgress::new(
                    SyncStatus::Error,
                    0,
                    0,
                    "No credential configured",
                ));
                return Err(SyncError::MissingCredential);
            }
        };

        if !self.engine.available().await {
            emit(SyncProgress::new(
                SyncStatus::Error,
                0,
                0,
                "Analytics engine unavailable",
            ));
            return Err(SyncError::EngineUnavailable {
                message: "engine not initialized".to_string(),
            });
        }

        let generation = self.tracker.current();

        // Idempotence: only fetch what the engine doesn't hold yet.
        let mut pending: Vec<&ActivityRef> = Vec::new();
        for activity in activities {
            if !self.engine.item_exists(&activity.id).await {
                pending.push(activity);
            }
        }

        if pending.is_empty() {
            info!(
                "[SyncCoordinator] All {} activities already synced",
                activities.len()
            );
            emit(SyncProgress::new(
                SyncStatus::Complete,
                0,
                0,
                "Already up to date",
            ));
            return Ok(SyncResult::empty("Already up to date"));
        }

        info!(
            "[SyncCoordinator] Syncing {} of {} activities (generation {})",
            pending.len(),
            activities.len(),
            generation
        );

        let ids: Vec<String> = pending.iter().map(|a| a.id.clone()).collect();
        let sport_types: HashMap<&str, &str> = pending
            .iter()
            .map(|a| (a.id.as_str(), a.sport_type.as_str()))
            .collect();

        let fetch_progress: FetchProgressCallback = {
            let emit = emit.clone();
            Arc::new(move |done, total| {
                emit(SyncProgress::new(
                    SyncStatus::Fetching,
                    done,
                    total,
                    format!("Syncing activities... {}/{}", done, total),
                ));
            })
        };
        let outcomes = self
            .fetcher
            .fetch_all(&ids, credential, &hooks.cancel, Some(fetch_progress))
            .await;

        if self.tracker.is_stale(generation) {
            debug!("[SyncCoordinator] Generation moved on during fetch, discarding results");
            return Ok(SyncResult::discarded());
        }

        let successful: Vec<_> = outcomes.iter().filter(|o| o.success).collect();
        let with_data_count = successful.iter().filter(|o| !o.points.is_empty()).count() as u32;
        let synced_ids: Vec<String> = successful.iter().map(|o| o.activity_id.clone()).collect();

        if synced_ids.is_empty() {
            warn!(
                "[SyncCoordinator] Nothing fetched ({} failures)",
                outcomes.len()
            );
            emit(SyncProgress::new(
                SyncStatus::Complete,
                0,
                0,
                "No activities could be fetched",
            ));
            return Ok(SyncResult::empty("No activities could be fetched"));
        }

        emit(SyncProgress::new(
            SyncStatus::Processing,
            0,
            0,
            format!("Storing {} activities...", synced_ids.len()),
        ));

        let records: Vec<IngestRecord> = successful
            .iter()
            .map(|o| IngestRecord {
                id: o.activity_id.clone(),
                points: o.points.clone(),
                sport_type: sport_types
                    .get(o.activity_id.as_str())
                    .unwrap_or(&"unknown")
                    .to_string(),
            })
            .collect();
        if let Err(e) = self.engine.ingest(&records).await {
            // Not fatal by policy: the attempt degrades to an empty
            // result instead of unwinding to the UI.
            warn!("[SyncCoordinator] Ingestion failed: {}", e);
            emit(SyncProgress::new(
                SyncStatus::Complete,
                0,
                0,
                "Could not store activities",
            ));
            return Ok(SyncResult::empty(format!(
                "Could not store activities: {}",
                e
            )));
        }

        let mut analysis_degraded = false;

        if hooks.cancel.is_cancelled() {
            info!(
                "[SyncCoordinator] Cancelled after storing {} activities",
                synced_ids.len()
            );
            return Ok(SyncResult {
                with_data_count,
                message: format!("Sync cancelled, {} activities stored", synced_ids.len()),
                synced_ids,
                discarded: false,
            });
        }

        match self.engine.start_job().await {
            Ok(()) => {
                emit(SyncProgress::new(
                    SyncStatus::Computing,
                    0,
                    100,
                    "Analyzing routes... 0%",
                ));
                let status = self.poller.run(&hooks.cancel, &emit).await;
                if status != JobStatus::Complete {
                    analysis_degraded = true;
                }
            }
            Err(e) => {
                // Activities are stored; failed analysis doesn't undo that.
                warn!("[SyncCoordinator] Could not start detection job: {}", e);
                analysis_degraded = true;
            }
        }

        if self.tracker.is_stale(generation) {
            debug!("[SyncCoordinator] Generation moved on during analysis, discarding results");
            return Ok(SyncResult::discarded());
        }

        let message = if analysis_degraded {
            format!("Synced {} activities (analysis incomplete)", synced_ids.len())
        } else {
            format!("Synced {} activities", synced_ids.len())
        };

        info!("[SyncCoordinator] {}", message);
        emit(SyncProgress::new(
            SyncStatus::Complete,
            with_data_count,
            synced_ids.len() as u32,
            message.clone(),
        ));

        if self.retention_aware {
            if let Some(cleaner) = &self.retention {
                if let Err(e) = cleaner.cleanup(None).await {
                    warn!("[SyncCoordinator] Post-sync retention cleanup failed: {}", e);
                }
            }
        }

        Ok(SyncResult {
            synced_ids,
            with_data_count,
            message,
            discarded: false,
        })
    }

    /// Drop all engine-held data and bump the sync generation so any
    /// in-flight sync discards its results.
    pub async fn clear_all_data(&self) -> Result<()> {
        self.engine.clear().await?;
        let generation = self.tracker.bump();
        info!("[SyncCoordinator] Cleared all data (now generation {})", generation);
        Ok(())
    }
}

/// Wrap the UI progress callback behind the mounted check so an unmounted
/// view stops receiving updates.
fn gated_progress(hooks: &SyncHooks) -> ProgressCallback {
    let mounted = Arc::clone(&hooks.mounted);
    let on_progress = Arc::clone(&hooks.on_progress);
    Arc::new(move |progress| {
        if mounted() {
            on_progress(progress);
        }
    })
}
