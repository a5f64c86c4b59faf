//! Sync progress reporting and multi-phase aggregation.
//!
//! The analytics engine reports raw `(phase, completed, total)` triples
//! while a detection job runs. This module folds those heterogeneous
//! reports into a single 0-100 percentage that is monotonically
//! non-decreasing across the life of one detection run, so the UI
//! progress bar never jumps backward.
//!
//! Aggregation is a pure function of its inputs plus a static weight
//! table. The `last_known` accumulator belongs to the caller (one per
//! poll loop), never to this module: a module-level accumulator would let
//! two overlapping detection runs corrupt each other's monotonicity
//! tracking.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Status of a sync operation, as presented to the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Idle,
    Fetching,
    Processing,
    Computing,
    Complete,
    Error,
}

/// Progress snapshot delivered to the UI at every meaningful transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncProgress {
    pub status: SyncStatus,
    pub completed: u32,
    pub total: u32,
    pub message: String,
}

impl SyncProgress {
    pub fn new(status: SyncStatus, completed: u32, total: u32, message: impl Into<String>) -> Self {
        Self {
            status,
            completed,
            total,
            message: message.into(),
        }
    }

    /// The resting state, used before a sync starts and after the UI
    /// discards a finished one.
    pub fn idle() -> Self {
        Self::new(SyncStatus::Idle, 0, 0, "")
    }
}

/// Callback invoked with progress snapshots.
///
/// Called from async tasks, so implementations must be `Send + Sync`.
pub type ProgressCallback = Arc<dyn Fn(SyncProgress) + Send + Sync>;

/// Contribution of one detection phase to the overall percentage.
///
/// `start` is the overall percent at which the phase begins; `weight` is
/// the share of the bar the phase covers. Weights sum to 100 across the
/// ordered phase sequence, and `start + weight <= 100` for every entry.
#[derive(Debug, Clone, Copy)]
pub struct PhaseWeight {
    pub start: u8,
    pub weight: u8,
}

/// Weight table for the engine's detection phases, in execution order.
///
/// `complete` carries zero weight: reaching it pins the bar at 100.
static PHASE_WEIGHTS: Lazy<HashMap<&'static str, PhaseWeight>> = Lazy::new(|| {
    HashMap::from([
        ("loading", PhaseWeight { start: 0, weight: 5 }),
        ("building_index", PhaseWeight { start: 5, weight: 10 }),
        ("finding_overlaps", PhaseWeight { start: 15, weight: 45 }),
        ("clustering", PhaseWeight { start: 60, weight: 20 }),
        ("building_groups", PhaseWeight { start: 80, weight: 10 }),
        ("postprocessing", PhaseWeight { start: 90, weight: 10 }),
        ("complete", PhaseWeight { start: 100, weight: 0 }),
    ])
});

/// Fold engine-internal sub-phases into their externally visible phase.
///
/// Multi-scale detection emits one `scale_*` sub-phase per scale preset;
/// the number of presets is an engine detail, so all of them report as
/// `finding_overlaps`.
fn canonical_phase(phase: &str) -> &str {
    if phase.starts_with("scale_") {
        "finding_overlaps"
    } else {
        phase
    }
}

/// Aggregate one `(phase, completed, total)` report into an overall 0-100
/// percentage.
///
/// The returned value never regresses below `last_known`, with one
/// exception: `loading` only recurs at the start of a brand-new detection
/// run, so a `loading` report may reset the bar to a lower value.
///
/// A phase name missing from the weight table returns `last_known`
/// unchanged, so engine-side phase additions degrade gracefully instead
/// of snapping the bar to 0.
pub fn overall_percent(phase: &str, completed: u32, total: u32, last_known: u8) -> u8 {
    let name = canonical_phase(phase);
    let Some(entry) = PHASE_WEIGHTS.get(name) else {
        return last_known;
    };

    let fraction = if total > 0 {
        (completed as f64 / total as f64).min(1.0)
    } else {
        0.0
    };
    let percent = (entry.start as f64 + entry.weight as f64 * fraction).round() as u8;

    if name == "loading" {
        percent
    } else {
        percent.max(last_known)
    }
}

/// Human-readable message for a phase at a given overall percentage.
pub fn phase_message(phase: &str, percent: u8) -> String {
    let label = match canonical_phase(phase) {
        "loading" => "Loading activities",
        "building_index" => "Indexing routes",
        "finding_overlaps" => "Analyzing routes",
        "clustering" => "Clustering routes",
        "building_groups" => "Building route groups",
        "postprocessing" => "Refining sections",
        "complete" => return "Analysis complete".to_string(),
        _ => "Processing",
    };
    format!("{}... {}%", label, percent)
}
