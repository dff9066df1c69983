//! Pending-change tracking

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Remembers whether local mutations still need a push.
///
/// Every [`set_pending`](Self::set_pending) bumps a generation counter, so a
/// push that serialized the document at generation `g` can clear the flag
/// only if nothing changed while the request was in flight.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    pending: AtomicBool,
    generation: AtomicU64,
}

impl ChangeTracker {
    pub fn new(pending: bool) -> Self {
        Self {
            pending: AtomicBool::new(pending),
            generation: AtomicU64::new(0),
        }
    }

    pub fn set_pending(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.pending.store(true, Ordering::SeqCst);
    }

    /// Unconditionally clear; used when a session ends
    pub fn clear_pending(&self) {
        self.pending.store(false, Ordering::SeqCst);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Clear the flag if no mutation happened since `generation` was read.
    ///
    /// Returns whether the flag was cleared.
    pub fn clear_if_unchanged(&self, generation: u64) -> bool {
        if self.generation() != generation {
            return false;
        }
        self.pending.store(false, Ordering::SeqCst);
        // A mutation may have slipped in between the check and the store
        if self.generation() != generation {
            self.pending.store(true, Ordering::SeqCst);
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_lifecycle() {
        let tracker = ChangeTracker::default();
        assert!(!tracker.is_pending());

        tracker.set_pending();
        let generation = tracker.generation();
        assert!(tracker.is_pending());
        assert!(tracker.clear_if_unchanged(generation));
        assert!(!tracker.is_pending());
    }

    #[test]
    fn mutation_after_snapshot_keeps_pending() {
        let tracker = ChangeTracker::new(true);
        let generation = tracker.generation();
        tracker.set_pending();

        assert!(!tracker.clear_if_unchanged(generation));
        assert!(tracker.is_pending());
        assert!(tracker.clear_if_unchanged(tracker.generation()));
    }
}
