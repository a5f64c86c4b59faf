//! Bounded-retention cleanup of engine-held activity data.
//!
//! The engine owns the deletion (by age cutoff, cascading to signatures
//! and tracks); this component only resolves the effective retention
//! window and reports the deleted count. No retries.

use std::sync::Arc;

use log::{info, warn};

use crate::engine::AnalyticsEngine;
use crate::error::Result;

/// Retention window applied when no usable preference exists.
pub const DEFAULT_RETENTION_DAYS: u32 = 90;
/// Smallest retention window a stored preference may select. Anything
/// below it falls back to the default, so a corrupt preference can't
/// mass-delete history.
pub const MIN_RETENTION_DAYS: u32 = 30;

/// Consumed preference storage capability.
pub trait PreferenceStore: Send + Sync {
    /// Stored retention window in days, if any.
    fn retention_days(&self) -> Option<i64>;
}

/// On-demand purge of activities older than the retention window.
pub struct RetentionCleaner {
    engine: Arc<dyn AnalyticsEngine>,
    prefs: Arc<dyn PreferenceStore>,
}

impl RetentionCleaner {
    pub fn new(engine: Arc<dyn AnalyticsEngine>, prefs: Arc<dyn PreferenceStore>) -> Self {
        Self { engine, prefs }
    }

    /// Delete activities older than the effective retention window and
    /// return the deleted count.
    ///
    /// The window is `retention_days` when given, else the stored
    /// preference; a missing or sub-minimum value resolves to
    /// [`DEFAULT_RETENTION_DAYS`].
    pub async fn cleanup(&self, retention_days: Option<u32>) -> Result<u32> {
        let days = self.resolve_days(retention_days);
        let deleted = self.engine.delete_older_than(days).await?;

        info!(
            "[RetentionCleaner] Deleted {} activities older than {} days",
            deleted, days
        );
        Ok(deleted)
    }

    fn resolve_days(&self, explicit: Option<u32>) -> u32 {
        let stored = explicit
            .map(i64::from)
            .or_else(|| self.prefs.retention_days());

        match stored {
            Some(days) if days >= i64::from(MIN_RETENTION_DAYS) => {
                u32::try_from(days).unwrap_or(DEFAULT_RETENTION_DAYS)
            }
            Some(days) => {
                warn!(
                    "[RetentionCleaner] Ignoring retention of {} days (minimum {}), using {}",
                    days, MIN_RETENTION_DAYS, DEFAULT_RETENTION_DAYS
                );
                DEFAULT_RETENTION_DAYS
            }
            None => DEFAULT_RETENTION_DAYS,
        }
    }
}
