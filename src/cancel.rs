//! Cooperative cancellation token.
//!
//! Cancellation is best-effort: callees check the token before starting
//! new work (the next fetch batch, the next poll), but in-flight requests
//! are not forcibly aborted. A cancelled operation returns whatever it has
//! already collected, and callers must not treat that as an error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable cancellation flag shared between a sync operation and its owner.
///
/// Single writer (the UI/owner calling [`CancelToken::cancel`]), multiple
/// readers (fetch and poll loops).
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
