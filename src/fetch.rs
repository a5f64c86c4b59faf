//! Concurrency-bounded batch fetching with per-item failure isolation.
//!
//! Requests within a batch execute concurrently; batches execute
//! sequentially, which bounds peak concurrency without a semaphore.
//! Individual failures (transport errors, malformed payloads) become
//! `FetchOutcome { success: false }` records and never abort the batch or
//! the batches after it. Partial failure is the expected steady state
//! when syncing against a flaky mobile network.
//!
//! No retries happen at this layer; retry policy belongs to callers (or
//! to the transport underneath the [`TelemetrySource`] seam).

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use log::{info, warn};

use crate::cancel::CancelToken;
use crate::telemetry::{FetchOutcome, RawTrack, TelemetrySource};
use crate::GpsPoint;

/// Reference batch size: five concurrent requests per batch.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Per-item fetch progress callback: `(completed, total)`.
pub type FetchProgressCallback = Arc<dyn Fn(u32, u32) + Send + Sync>;

/// Fetches per-activity telemetry in sequential batches of concurrent
/// requests.
pub struct BatchFetcher {
    source: Arc<dyn TelemetrySource>,
    batch_size: usize,
}

impl BatchFetcher {
    /// Create a fetcher over `source`. A `batch_size` of zero is clamped
    /// to one.
    pub fn new(source: Arc<dyn TelemetrySource>, batch_size: usize) -> Self {
        Self {
            source,
            batch_size: batch_size.max(1),
        }
    }

    /// Fetch telemetry for every id, returning exactly one outcome per id.
    ///
    /// Checks `cancel` before starting each batch; a cancelled fetch
    /// returns the outcomes collected so far. Cancellation is a voluntary
    /// abort, not an error.
    pub async fn fetch_all(
        &self,
        ids: &[String],
        credential: &str,
        cancel: &CancelToken,
        on_progress: Option<FetchProgressCallback>,
    ) -> Vec<FetchOutcome> {
        let total = ids.len() as u32;
        let completed = AtomicU32::new(0);
        let mut outcomes = Vec::with_capacity(ids.len());

        info!(
            "[BatchFetcher] Fetching {} activities in batches of {}",
            total, self.batch_size
        );

        for chunk in ids.chunks(self.batch_size) {
            if cancel.is_cancelled() {
                info!(
                    "[BatchFetcher] Cancelled after {}/{} activities",
                    outcomes.len(),
                    total
                );
                return outcomes;
            }

            let batch = join_all(chunk.iter().map(|id| {
                let callback = on_progress.clone();
                let completed = &completed;
                async move {
                    let outcome = self.fetch_one(credential, id).await;
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(cb) = callback {
                        cb(done, total);
                    }
                    outcome
                }
            }))
            .await;
            outcomes.extend(batch);
        }

        let success_count = outcomes.iter().filter(|o| o.success).count();
        info!(
            "[BatchFetcher] Complete: {}/{} successful",
            success_count, total
        );

        outcomes
    }

    async fn fetch_one(&self, credential: &str, activity_id: &str) -> FetchOutcome {
        match self.source.fetch_track(credential, activity_id).await {
            Ok(track) => validate_track(activity_id, track),
            Err(e) => {
                warn!("[BatchFetcher] Fetch failed for {}: {}", activity_id, e);
                FetchOutcome::failure(activity_id, e.to_string())
            }
        }
    }
}

/// Validate a raw track into a fetch outcome.
///
/// Null entries (GPS dropouts) are skipped; points with non-finite or
/// out-of-range coordinates are dropped and counted. The item stays
/// successful even when every point was dropped: an empty track is data
/// too, and the dropped count is the diagnostic.
fn validate_track(activity_id: &str, track: RawTrack) -> FetchOutcome {
    let pairs = track.latlngs.unwrap_or_default();
    let mut points = Vec::with_capacity(pairs.len());
    let mut dropped = 0u32;

    for [lat, lng] in pairs.into_iter().flatten() {
        let point = GpsPoint::new(lat, lng);
        if point.is_valid() {
            points.push(point);
        } else {
            dropped += 1;
        }
    }

    if dropped > 0 {
        warn!(
            "[BatchFetcher] Dropped {} invalid points for {}",
            dropped, activity_id
        );
    }

    FetchOutcome {
        activity_id: activity_id.to_string(),
        success: true,
        points,
        dropped_points: dropped,
        error: None,
    }
}
