//! Tests for the analysis poller

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracesync::{
    AnalysisPoller, CancelToken, JobStatus, ProgressCallback, ScriptStep, ScriptedEngine,
    SyncProgress, SyncStatus,
};

fn fast_poller(engine: Arc<ScriptedEngine>) -> AnalysisPoller {
    AnalysisPoller::with_timing(
        engine,
        Duration::from_millis(1),
        Duration::from_millis(500),
    )
}

fn recording_callback() -> (ProgressCallback, Arc<Mutex<Vec<SyncProgress>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let callback: ProgressCallback = Arc::new(move |p| sink.lock().unwrap().push(p));
    (callback, seen)
}

#[tokio::test]
async fn test_runs_to_completion_and_ends_at_100() {
    let engine = Arc::new(ScriptedEngine::new().with_script(vec![
        ScriptStep::running("loading", 0, 0),
        ScriptStep::running("building_index", 5, 10),
        ScriptStep::running("finding_overlaps", 50, 100),
        ScriptStep::running("postprocessing", 10, 10),
        ScriptStep::terminal(JobStatus::Complete),
    ]));
    let (callback, seen) = recording_callback();

    let status = fast_poller(engine).run(&CancelToken::new(), &callback).await;
    assert_eq!(status, JobStatus::Complete);

    let seen = seen.lock().unwrap();
    let percents: Vec<u32> = seen.iter().map(|p| p.completed).collect();
    assert!(!percents.is_empty());
    assert!(percents.windows(2).all(|w| w[1] >= w[0]));
    assert_eq!(*percents.last().unwrap(), 100);
    assert!(seen.iter().all(|p| p.status == SyncStatus::Computing));
}

#[tokio::test]
async fn test_emits_at_most_once_per_distinct_percent() {
    // Three polls land in the same phase position; only one emission
    let engine = Arc::new(ScriptedEngine::new().with_script(vec![
        ScriptStep::running("finding_overlaps", 50, 100),
        ScriptStep::running("finding_overlaps", 50, 100),
        ScriptStep::running("scale_0", 50, 100),
        ScriptStep::terminal(JobStatus::Complete),
    ]));
    let (callback, seen) = recording_callback();

    fast_poller(engine).run(&CancelToken::new(), &callback).await;

    let seen = seen.lock().unwrap();
    let mut percents: Vec<u32> = seen.iter().map(|p| p.completed).collect();
    let before = percents.len();
    percents.dedup();
    assert_eq!(before, percents.len(), "duplicate percent emitted");
}

#[tokio::test]
async fn test_job_error_is_terminal_and_non_fatal() {
    let engine = Arc::new(ScriptedEngine::new().with_script(vec![
        ScriptStep::running("loading", 0, 0),
        ScriptStep::terminal(JobStatus::Error),
    ]));
    let (callback, seen) = recording_callback();

    let status = fast_poller(engine).run(&CancelToken::new(), &callback).await;
    assert_eq!(status, JobStatus::Error);

    // No terminal 100% emission on failure
    assert!(seen.lock().unwrap().iter().all(|p| p.completed < 100));
}

#[tokio::test]
async fn test_cancel_stops_polling() {
    // Script never terminates; cancellation must end the loop
    let engine = Arc::new(
        ScriptedEngine::new().with_script(vec![ScriptStep::running("finding_overlaps", 1, 100)]),
    );
    let cancel = CancelToken::new();
    cancel.cancel();
    let (callback, seen) = recording_callback();

    let status = fast_poller(engine).run(&cancel, &callback).await;
    assert_eq!(status, JobStatus::Running);

    // The loop exited at the cancel check; the emission count is frozen
    let count = seen.lock().unwrap().len();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(seen.lock().unwrap().len(), count);
}

#[tokio::test]
async fn test_soft_timeout_returns_last_status() {
    let engine = Arc::new(
        ScriptedEngine::new().with_script(vec![ScriptStep::running("finding_overlaps", 1, 100)]),
    );
    let poller = AnalysisPoller::with_timing(
        engine,
        Duration::from_millis(1),
        Duration::from_millis(20),
    );
    let (callback, _seen) = recording_callback();

    let status = poller.run(&CancelToken::new(), &callback).await;
    assert_eq!(status, JobStatus::Running);
}

#[tokio::test]
async fn test_idle_engine_times_out_without_emissions() {
    // Empty script: the engine reports Idle forever
    let engine = Arc::new(ScriptedEngine::new());
    let poller = AnalysisPoller::with_timing(
        engine,
        Duration::from_millis(1),
        Duration::from_millis(20),
    );
    let (callback, seen) = recording_callback();

    let status = poller.run(&CancelToken::new(), &callback).await;
    assert_eq!(status, JobStatus::Idle);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_two_runs_track_monotonicity_independently() {
    // A second detection run starts over from loading without being
    // clamped by the first run's high-water mark.
    let first = Arc::new(ScriptedEngine::new().with_script(vec![
        ScriptStep::running("postprocessing", 10, 10),
        ScriptStep::terminal(JobStatus::Complete),
    ]));
    let second = Arc::new(ScriptedEngine::new().with_script(vec![
        ScriptStep::running("loading", 0, 0),
        ScriptStep::running("building_index", 5, 10),
        ScriptStep::terminal(JobStatus::Complete),
    ]));

    let (cb1, seen1) = recording_callback();
    fast_poller(first).run(&CancelToken::new(), &cb1).await;
    assert_eq!(seen1.lock().unwrap().last().unwrap().completed, 100);

    let (cb2, seen2) = recording_callback();
    fast_poller(second).run(&CancelToken::new(), &cb2).await;
    let seen2 = seen2.lock().unwrap();
    // 10% for building_index half-way, not clamped to the prior run's 100
    assert!(seen2.iter().any(|p| p.completed == 10));
}
