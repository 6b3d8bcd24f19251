use std::sync::Arc;
use std::sync::atomic::AtomicU32;

use atomic_float::AtomicF32;

/// Counters written by the recompute thread and read by whoever drives it.
/// Relaxed atomics; a reader may see a value one update behind.
pub struct RecalcStats {
    /// Wall time of the most recent grid computation, in milliseconds.
    pub last_compute_ms: AtomicF32,
    /// Grids computed since the worker started.
    pub recomputes: AtomicU32,
    /// Commands that arrived while a change was already pending and were
    /// folded into the same recompute.
    pub commands_coalesced: AtomicU32,
}

impl RecalcStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            last_compute_ms: AtomicF32::new(0.0),
            recomputes: AtomicU32::new(0),
            commands_coalesced: AtomicU32::new(0),
        })
    }
}
