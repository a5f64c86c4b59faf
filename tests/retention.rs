//! Tests for retention cleanup

use std::sync::Arc;

use tracesync::{PreferenceStore, RetentionCleaner, ScriptedEngine};

struct StoredPreference(Option<i64>);

impl PreferenceStore for StoredPreference {
    fn retention_days(&self) -> Option<i64> {
        self.0
    }
}

fn cleaner(engine: Arc<ScriptedEngine>, stored: Option<i64>) -> RetentionCleaner {
    RetentionCleaner::new(engine, Arc::new(StoredPreference(stored)))
}

#[tokio::test]
async fn test_stored_preference_is_used() {
    let engine = Arc::new(ScriptedEngine::new().with_delete_result(7));
    let cleaner = cleaner(Arc::clone(&engine), Some(180));

    let deleted = cleaner.cleanup(None).await.unwrap();
    assert_eq!(deleted, 7);
    assert_eq!(engine.last_delete_days(), Some(180));
}

#[tokio::test]
async fn test_missing_preference_falls_back_to_default() {
    let engine = Arc::new(ScriptedEngine::new());
    let cleaner = cleaner(Arc::clone(&engine), None);

    cleaner.cleanup(None).await.unwrap();
    assert_eq!(engine.last_delete_days(), Some(90));
}

#[tokio::test]
async fn test_sub_minimum_preference_falls_back_to_default() {
    // A stored value of 10 days must not mass-delete history
    let engine = Arc::new(ScriptedEngine::new());
    let cleaner = cleaner(Arc::clone(&engine), Some(10));

    cleaner.cleanup(None).await.unwrap();
    assert_eq!(engine.last_delete_days(), Some(90));
}

#[tokio::test]
async fn test_zero_and_negative_preferences_fall_back_to_default() {
    for stored in [Some(0), Some(-5)] {
        let engine = Arc::new(ScriptedEngine::new());
        let cleaner = cleaner(Arc::clone(&engine), stored);
        cleaner.cleanup(None).await.unwrap();
        assert_eq!(engine.last_delete_days(), Some(90));
    }
}

#[tokio::test]
async fn test_explicit_window_overrides_preference() {
    let engine = Arc::new(ScriptedEngine::new());
    let cleaner = cleaner(Arc::clone(&engine), Some(180));

    cleaner.cleanup(Some(365)).await.unwrap();
    assert_eq!(engine.last_delete_days(), Some(365));
}

#[tokio::test]
async fn test_minimum_window_is_inclusive() {
    let engine = Arc::new(ScriptedEngine::new());
    let cleaner = cleaner(Arc::clone(&engine), Some(30));

    cleaner.cleanup(None).await.unwrap();
    assert_eq!(engine.last_delete_days(), Some(30));
}

#[tokio::test]
async fn test_sub_minimum_explicit_window_gets_no_special_trust() {
    let engine = Arc::new(ScriptedEngine::new());
    let cleaner = cleaner(Arc::clone(&engine), None);

    cleaner.cleanup(Some(10)).await.unwrap();
    assert_eq!(engine.last_delete_days(), Some(90));
}
