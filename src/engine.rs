//! Consumed capability set of the analytics engine.
//!
//! The engine performs spatial clustering and section detection out of
//! band; this crate only observes it. Detection runs as an asynchronous
//! job with no completion callback, so the engine exposes a pollable
//! status plus a raw progress triple, both validated into typed values at
//! this boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::GpsPoint;

/// Status of the engine's asynchronous detection job.
///
/// Observed on each poll, never owned by this crate. The serde encoding
/// is the engine's wire contract (`"idle"`, `"running"`, `"complete"`,
/// `"error"`), validated once at this boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Idle,
    Running,
    Complete,
    Error,
}

impl JobStatus {
    /// Returns the status as the engine's wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Idle => "idle",
            JobStatus::Running => "running",
            JobStatus::Complete => "complete",
            JobStatus::Error => "error",
        }
    }
}

/// Raw progress triple reported by the engine while a detection job runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobProgress {
    pub phase: String,
    pub completed: u32,
    pub total: u32,
}

/// One activity handed to engine ingestion.
#[derive(Debug, Clone)]
pub struct IngestRecord {
    pub id: String,
    pub points: Vec<GpsPoint>,
    pub sport_type: String,
}

/// Capability set this crate consumes from the analytics engine.
///
/// Implementations must be `Send + Sync`; the coordinator shares one
/// instance across fetch tasks and the poll loop.
#[async_trait]
pub trait AnalyticsEngine: Send + Sync {
    /// Whether the engine is initialized and reachable. Probed once at
    /// sync start; a negative answer is fatal to the attempt.
    async fn available(&self) -> bool;

    /// Store fetched activities. Ingestion is idempotent per id.
    async fn ingest(&self, records: &[IngestRecord]) -> Result<()>;

    /// Whether an activity is already held by the engine. Used to filter
    /// re-syncs down to the missing set.
    async fn item_exists(&self, id: &str) -> bool;

    /// Kick off the asynchronous detection job.
    async fn start_job(&self) -> Result<()>;

    /// Current job status.
    async fn poll_job(&self) -> JobStatus;

    /// Progress of the running job.
    async fn job_progress(&self) -> JobProgress;

    /// Delete activities older than the cutoff. Returns the deleted count.
    async fn delete_older_than(&self, days: u32) -> Result<u32>;

    /// Drop all engine-held data. Callers bump the sync generation after
    /// this so in-flight syncs discard their results.
    async fn clear(&self) -> Result<()>;
}
