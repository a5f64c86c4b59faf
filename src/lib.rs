//! # Tracesync
//!
//! Sync orchestration and progress pipeline for GPS activity analytics.
//!
//! This library sits between a UI shell and an external route-analytics
//! engine. It provides:
//! - Generation-based staleness tracking, so results from superseded or
//!   aborted sync attempts are never applied
//! - Concurrency-bounded telemetry fetching with per-item failure
//!   isolation
//! - Monotonic multi-phase progress aggregation for the engine's
//!   asynchronous detection job
//! - Poll-until-terminal job driving with cancellation and a soft time
//!   ceiling
//! - Bounded-retention cleanup of engine-held data
//!
//! The spatial clustering and section detection algorithms live in the
//! engine, which this crate consumes through the [`AnalyticsEngine`]
//! trait and never reimplements.
//!
//! ## Quick Start
//!
//! ```rust
//! use tracesync::progress::overall_percent;
//!
//! // Fold raw engine phase reports into one monotonic 0-100 value
//! let p1 = overall_percent("loading", 0, 0, 0);
//! let p2 = overall_percent("finding_overlaps", 50, 100, p1);
//! let p3 = overall_percent("complete", 0, 0, p2);
//!
//! assert!(p2 >= p1);
//! assert_eq!(p3, 100);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{Result, SyncError};

// Cooperative cancellation token
pub mod cancel;
pub use cancel::CancelToken;

// Sync generation tracking (reset epochs)
pub mod generation;
pub use generation::GenerationTracker;

// Progress model and multi-phase aggregation
pub mod progress;
pub use progress::{
    overall_percent, phase_message, PhaseWeight, ProgressCallback, SyncProgress, SyncStatus,
};

// Consumed analytics-engine capability set
pub mod engine;
pub use engine::{AnalyticsEngine, IngestRecord, JobProgress, JobStatus};

// Telemetry source seam and fetch outcomes
pub mod telemetry;
pub use telemetry::{FetchOutcome, RawTrack, TelemetrySource};

// Concurrency-bounded batch fetching
pub mod fetch;
pub use fetch::{BatchFetcher, FetchProgressCallback, DEFAULT_BATCH_SIZE};

// HTTP telemetry source for the remote activity API
pub mod http;
pub use http::RemoteTelemetrySource;

// Detection-job polling
pub mod poller;
pub use poller::AnalysisPoller;

// Top-level sync coordination
pub mod coordinator;
pub use coordinator::{MountedCheck, SyncCoordinator, SyncHooks, SyncOptions, SyncResult};

// Retention cleanup
pub mod retention;
pub use retention::{PreferenceStore, RetentionCleaner, DEFAULT_RETENTION_DAYS};

// In-memory fixtures (local ingestion path and test doubles)
pub mod fixtures;
pub use fixtures::{FixtureTelemetrySource, ScriptStep, ScriptedEngine};

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use tracesync::GpsPoint;
/// let point = GpsPoint::new(51.5074, -0.1278); // London
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Reference to an activity the caller wants synced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRef {
    /// Unique identifier of the activity at the telemetry service.
    pub id: String,
    /// Sport type, forwarded to engine ingestion (grouping is
    /// sport-aware).
    pub sport_type: String,
}

impl ActivityRef {
    pub fn new(id: impl Into<String>, sport_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sport_type: sport_type.into(),
        }
    }
}
