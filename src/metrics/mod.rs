//! Mining event counters.
//!
//! One [`MinerMetrics`] instance is shared by every worker of a run; all
//! counters are atomic, so recording an event is a single relaxed increment
//! and never synchronizes workers with each other. [`MinerMetrics::snapshot`]
//! reads a consistent-enough view for reporting once mining is done.

use std::sync::atomic::{AtomicU64, Ordering};

/// Shared atomic event counters for one mining run.
#[derive(Debug, Default)]
pub struct MinerMetrics {
    expanded_steps: AtomicU64,
    failed_fp_tests: AtomicU64,
    redone_counters: AtomicU64,
    view_projections: AtomicU64,
    materialized_projections: AtomicU64,
}

impl MinerMetrics {
    /// Create zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted extension that produced a child step.
    pub fn record_expansion(&self) {
        self.expanded_steps.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed first-parent test.
    pub fn record_failed_fp_test(&self) {
        self.failed_fp_tests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record counters re-derived after a stale support floor.
    pub fn record_redo(&self) {
        self.redone_counters.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a projection kept as a view.
    pub fn record_view_projection(&self) {
        self.view_projections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a projection materialized into a fresh dataset.
    pub fn record_materialized_projection(&self) {
        self.materialized_projections.fetch_add(1, Ordering::Relaxed);
    }

    /// Read every counter.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            expanded_steps: self.expanded_steps.load(Ordering::Relaxed),
            failed_fp_tests: self.failed_fp_tests.load(Ordering::Relaxed),
            redone_counters: self.redone_counters.load(Ordering::Relaxed),
            view_projections: self.view_projections.load(Ordering::Relaxed),
            materialized_projections: self.materialized_projections.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time counter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsSnapshot {
    /// Accepted extensions that produced a child step.
    pub expanded_steps: u64,
    /// Failed first-parent tests.
    pub failed_fp_tests: u64,
    /// Counter recomputations after a stale support floor.
    pub redone_counters: u64,
    /// Projections kept as views.
    pub view_projections: u64,
    /// Projections materialized into fresh datasets.
    pub materialized_projections: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = MinerMetrics::new();
        metrics.record_expansion();
        metrics.record_expansion();
        metrics.record_failed_fp_test();
        metrics.record_redo();
        metrics.record_view_projection();
        metrics.record_materialized_projection();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.expanded_steps, 2);
        assert_eq!(snapshot.failed_fp_tests, 1);
        assert_eq!(snapshot.redone_counters, 1);
        assert_eq!(snapshot.view_projections, 1);
        assert_eq!(snapshot.materialized_projections, 1);
    }

    #[test]
    fn test_concurrent_increments() {
        use std::sync::Arc;
        let metrics = Arc::new(MinerMetrics::new());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let metrics = Arc::clone(&metrics);
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    metrics.record_expansion();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.snapshot().expanded_steps, 4000);
    }
}
