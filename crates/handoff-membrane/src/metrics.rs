//! Atomic counters for boundary observability.
//!
//! All counters use relaxed ordering; they are advisory/diagnostic,
//! not synchronization primitives.

use std::sync::atomic::{AtomicU64, Ordering};

/// Boundary operation counters.
pub struct BoundaryMetrics {
    /// Native objects constructed.
    pub objects_created: AtomicU64,
    /// Native objects destroyed.
    pub objects_destroyed: AtomicU64,
    /// Explicit early releases.
    pub releases: AtomicU64,
    /// Ownership moves between host and native.
    pub transfers: AtomicU64,
    /// Callbacks invoked from native code.
    pub callbacks_dispatched: AtomicU64,
    /// Callbacks that reported failure.
    pub callbacks_failed: AtomicU64,
    /// Calls rejected for a violated precondition.
    pub contract_violations: AtomicU64,
    /// Accesses through a stale handle.
    pub use_after_release_faults: AtomicU64,
    /// Accesses through a handle this registry never minted.
    pub unknown_handles: AtomicU64,
    /// Rejected ownership claims.
    pub ownership_conflicts: AtomicU64,
}

impl BoundaryMetrics {
    /// Create a new zeroed metrics instance.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            objects_created: AtomicU64::new(0),
            objects_destroyed: AtomicU64::new(0),
            releases: AtomicU64::new(0),
            transfers: AtomicU64::new(0),
            callbacks_dispatched: AtomicU64::new(0),
            callbacks_failed: AtomicU64::new(0),
            contract_violations: AtomicU64::new(0),
            use_after_release_faults: AtomicU64::new(0),
            unknown_handles: AtomicU64::new(0),
            ownership_conflicts: AtomicU64::new(0),
        }
    }

    /// Increment a counter by 1.
    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Read a counter value.
    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    /// Snapshot all counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            objects_created: Self::get(&self.objects_created),
            objects_destroyed: Self::get(&self.objects_destroyed),
            releases: Self::get(&self.releases),
            transfers: Self::get(&self.transfers),
            callbacks_dispatched: Self::get(&self.callbacks_dispatched),
            callbacks_failed: Self::get(&self.callbacks_failed),
            contract_violations: Self::get(&self.contract_violations),
            use_after_release_faults: Self::get(&self.use_after_release_faults),
            unknown_handles: Self::get(&self.unknown_handles),
            ownership_conflicts: Self::get(&self.ownership_conflicts),
        }
    }
}

impl Default for BoundaryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time snapshot of all boundary counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub objects_created: u64,
    pub objects_destroyed: u64,
    pub releases: u64,
    pub transfers: u64,
    pub callbacks_dispatched: u64,
    pub callbacks_failed: u64,
    pub contract_violations: u64,
    pub use_after_release_faults: u64,
    pub unknown_handles: u64,
    pub ownership_conflicts: u64,
}

impl MetricsSnapshot {
    /// Objects constructed but not yet destroyed.
    #[must_use]
    pub fn live_objects(&self) -> u64 {
        self.objects_created.saturating_sub(self.objects_destroyed)
    }

    /// Counter deltas since `earlier`.
    #[must_use]
    pub fn since(&self, earlier: &Self) -> Self {
        Self {
            objects_created: self.objects_created - earlier.objects_created,
            objects_destroyed: self.objects_destroyed - earlier.objects_destroyed,
            releases: self.releases - earlier.releases,
            transfers: self.transfers - earlier.transfers,
            callbacks_dispatched: self.callbacks_dispatched - earlier.callbacks_dispatched,
            callbacks_failed: self.callbacks_failed - earlier.callbacks_failed,
            contract_violations: self.contract_violations - earlier.contract_violations,
            use_after_release_faults: self.use_after_release_faults
                - earlier.use_after_release_faults,
            unknown_handles: self.unknown_handles - earlier.unknown_handles,
            ownership_conflicts: self.ownership_conflicts - earlier.ownership_conflicts,
        }
    }
}

/// Global metrics instance.
static GLOBAL_METRICS: BoundaryMetrics = BoundaryMetrics::new();

/// Process-wide boundary counters.
#[must_use]
pub fn global_metrics() -> &'static BoundaryMetrics {
    &GLOBAL_METRICS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_increments() {
        let metrics = BoundaryMetrics::new();
        BoundaryMetrics::inc(&metrics.objects_created);
        BoundaryMetrics::inc(&metrics.objects_created);
        BoundaryMetrics::inc(&metrics.objects_destroyed);

        let snap = metrics.snapshot();
        assert_eq!(snap.objects_created, 2);
        assert_eq!(snap.objects_destroyed, 1);
        assert_eq!(snap.live_objects(), 1);
    }

    #[test]
    fn since_computes_deltas() {
        let metrics = BoundaryMetrics::new();
        BoundaryMetrics::inc(&metrics.releases);
        let before = metrics.snapshot();
        BoundaryMetrics::inc(&metrics.releases);
        BoundaryMetrics::inc(&metrics.use_after_release_faults);
        BoundaryMetrics::inc(&metrics.unknown_handles);

        let delta = metrics.snapshot().since(&before);
        assert_eq!(delta.releases, 1);
        assert_eq!(delta.use_after_release_faults, 1);
        assert_eq!(delta.unknown_handles, 1);
        assert_eq!(delta.callbacks_failed, 0);
        assert_eq!(delta.objects_created, 0);
    }
}
