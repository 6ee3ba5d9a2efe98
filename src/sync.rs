//! Search-control synchronization primitives.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared, monotonic-within-a-search stop flag.
///
/// Workers poll it every 256 nodes; the UCI thread sets it on `stop`.
/// Relaxed ordering is sufficient because the coordinator's join
/// establishes the necessary happens-before at search completion.
#[derive(Clone, Debug, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    #[must_use]
    pub fn new() -> Self {
        StopFlag(Arc::new(AtomicBool::new(false)))
    }

    #[inline]
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Re-arm before a new search.
    #[inline]
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}
