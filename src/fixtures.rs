//! In-memory fixtures for tests and offline use.
//!
//! `FixtureTelemetrySource` serves canned tracks instead of hitting the
//! remote API, covering the local fixture ingestion path. `ScriptedEngine`
//! records ingestion and plays back a scripted detection job, one script
//! step per poll. Both are used by the integration tests and by demo
//! shells that run without a real engine.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::engine::{AnalyticsEngine, IngestRecord, JobProgress, JobStatus};
use crate::error::{Result, SyncError};
use crate::telemetry::{RawTrack, TelemetrySource};

/// Telemetry source backed by in-memory tracks, with injectable per-item
/// failures.
#[derive(Debug, Default)]
pub struct FixtureTelemetrySource {
    tracks: HashMap<String, Vec<Option<[f64; 2]>>>,
    failures: HashMap<String, String>,
}

impl FixtureTelemetrySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `pairs` for `id`. Pairs may contain `None` dropout entries,
    /// matching the remote body shape.
    pub fn with_track(mut self, id: impl Into<String>, pairs: Vec<Option<[f64; 2]>>) -> Self {
        self.tracks.insert(id.into(), pairs);
        self
    }

    /// Fail fetches for `id` with the given error message.
    pub fn with_failure(mut self, id: impl Into<String>, error: impl Into<String>) -> Self {
        self.failures.insert(id.into(), error.into());
        self
    }

    /// Convenience: a short valid track near the given origin.
    pub fn sample_track(lat: f64, lng: f64) -> Vec<Option<[f64; 2]>> {
        (0..10)
            .map(|i| Some([lat + i as f64 * 0.001, lng]))
            .collect()
    }
}

#[async_trait]
impl TelemetrySource for FixtureTelemetrySource {
    async fn fetch_track(&self, _credential: &str, activity_id: &str) -> Result<RawTrack> {
        if let Some(message) = self.failures.get(activity_id) {
            return Err(SyncError::HttpError {
                message: message.clone(),
                status_code: Some(500),
            });
        }

        match self.tracks.get(activity_id) {
            Some(pairs) => Ok(RawTrack {
                latlngs: Some(pairs.clone()),
            }),
            None => Err(SyncError::HttpError {
                message: "HTTP 404 Not Found".to_string(),
                status_code: Some(404),
            }),
        }
    }
}

/// One scripted poll step: the status `poll_job` returns, and the raw
/// progress visible while that status is current.
#[derive(Debug, Clone)]
pub struct ScriptStep {
    pub status: JobStatus,
    pub progress: JobProgress,
}

impl ScriptStep {
    pub fn running(phase: &str, completed: u32, total: u32) -> Self {
        Self {
            status: JobStatus::Running,
            progress: JobProgress {
                phase: phase.to_string(),
                completed,
                total,
            },
        }
    }

    pub fn terminal(status: JobStatus) -> Self {
        Self {
            status,
            progress: JobProgress::default(),
        }
    }
}

#[derive(Debug, Default)]
struct ScriptedEngineState {
    ingested: Vec<IngestRecord>,
    existing: HashSet<String>,
    script: Vec<ScriptStep>,
    cursor: usize,
    last_step: Option<ScriptStep>,
    job_started: bool,
    clear_count: u32,
    last_delete_days: Option<u32>,
}

/// Analytics engine double: records every call and plays back a scripted
/// detection job.
///
/// `poll_job` consumes the script one step per call; the final step
/// repeats once the script is exhausted. `job_progress` reports the step
/// most recently returned by `poll_job`, so the two reads a poll loop
/// performs always observe the same step.
pub struct ScriptedEngine {
    state: Mutex<ScriptedEngineState>,
    available: bool,
    fail_start: bool,
    delete_result: u32,
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ScriptedEngineState::default()),
            available: true,
            fail_start: false,
            delete_result: 0,
        }
    }

    /// Engine that reports itself unavailable.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Script the detection job's poll sequence.
    pub fn with_script(self, script: Vec<ScriptStep>) -> Self {
        self.state.lock().unwrap().script = script;
        self
    }

    /// Pre-seed an activity as already held by the engine.
    pub fn with_existing(self, id: impl Into<String>) -> Self {
        self.state.lock().unwrap().existing.insert(id.into());
        self
    }

    /// Make `start_job` fail.
    pub fn with_failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Fix the count `delete_older_than` reports.
    pub fn with_delete_result(mut self, deleted: u32) -> Self {
        self.delete_result = deleted;
        self
    }

    /// Ids ingested so far, in ingestion order.
    pub fn ingested_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .ingested
            .iter()
            .map(|r| r.id.clone())
            .collect()
    }

    /// Full records ingested so far.
    pub fn ingested_records(&self) -> Vec<IngestRecord> {
        self.state.lock().unwrap().ingested.clone()
    }

    pub fn job_started(&self) -> bool {
        self.state.lock().unwrap().job_started
    }

    pub fn clear_count(&self) -> u32 {
        self.state.lock().unwrap().clear_count
    }

    /// Cutoff passed to the last `delete_older_than` call.
    pub fn last_delete_days(&self) -> Option<u32> {
        self.state.lock().unwrap().last_delete_days
    }
}

#[async_trait]
impl AnalyticsEngine for ScriptedEngine {
    async fn available(&self) -> bool {
        self.available
    }

    async fn ingest(&self, records: &[IngestRecord]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        for record in records {
            state.existing.insert(record.id.clone());
            state.ingested.push(record.clone());
        }
        Ok(())
    }

    async fn item_exists(&self, id: &str) -> bool {
        self.state.lock().unwrap().existing.contains(id)
    }

    async fn start_job(&self) -> Result<()> {
        if self.fail_start {
            return Err(SyncError::EngineError {
                message: "detection already running".to_string(),
            });
        }
        self.state.lock().unwrap().job_started = true;
        Ok(())
    }

    async fn poll_job(&self) -> JobStatus {
        let mut state = self.state.lock().unwrap();
        if state.script.is_empty() {
            return JobStatus::Idle;
        }

        let index = state.cursor.min(state.script.len() - 1);
        let step = state.script[index].clone();
        state.cursor += 1;
        state.last_step = Some(step.clone());
        step.status
    }

    async fn job_progress(&self) -> JobProgress {
        self.state
            .lock()
            .unwrap()
            .last_step
            .as_ref()
            .map(|s| s.progress.clone())
            .unwrap_or_default()
    }

    async fn delete_older_than(&self, days: u32) -> Result<u32> {
        self.state.lock().unwrap().last_delete_days = Some(days);
        Ok(self.delete_result)
    }

    async fn clear(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.ingested.clear();
        state.existing.clear();
        state.clear_count += 1;
        Ok(())
    }
}
