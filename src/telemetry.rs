//! Telemetry source seam and per-item fetch outcomes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::GpsPoint;

/// Wire body of a per-activity telemetry response.
///
/// The activity-map endpoint delivers nullable `[lat, lng]` pairs; null
/// entries mark GPS dropouts and are skipped during validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTrack {
    #[serde(default)]
    pub latlngs: Option<Vec<Option<[f64; 2]>>>,
}

/// Outcome of fetching one activity's telemetry.
///
/// One outcome per requested activity, in no particular order. Never
/// mutated after creation; consumed immediately by the storage step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchOutcome {
    pub activity_id: String,
    pub success: bool,
    /// Validated GPS points. May be empty for activities without
    /// location data (e.g. indoor rides).
    pub points: Vec<GpsPoint>,
    /// Points discarded for non-finite or out-of-range coordinates.
    pub dropped_points: u32,
    pub error: Option<String>,
}

impl FetchOutcome {
    pub fn failure(activity_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            activity_id: activity_id.into(),
            success: false,
            points: Vec::new(),
            dropped_points: 0,
            error: Some(error.into()),
        }
    }
}

/// Per-activity telemetry provider.
///
/// The remote API may batch requests however it likes; the only
/// requirement here is that failures are reported per activity, never
/// batch-fatal. `credential` is an opaque pre-formatted authorization
/// value supplied with every request.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn fetch_track(&self, credential: &str, activity_id: &str) -> Result<RawTrack>;
}
