//! Lifecycle counters for the controller.
//!
//! [`ControllerMetrics`] is a point-in-time copy of the controller's
//! cumulative counters plus the current size of its pending state.
//! Counters are updated with relaxed atomics from whichever thread
//! observes the event.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of controller activity.
///
/// All counters are cumulative since the controller was created.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ControllerMetrics {
    /// Insert requests accepted into the pending table.
    pub inserts_accepted: u64,
    /// Insert requests rejected at entry (duplicate, full, shutting down).
    pub inserts_rejected: u64,
    /// Inserts handed to the engine by an end-of-step drain.
    pub inserts_started: u64,
    /// Inserts closed out by a creation notification.
    pub inserts_completed: u64,
    /// Inserts the engine refused.
    pub inserts_failed: u64,
    /// Delete requests accepted into the remove queue.
    pub removals_accepted: u64,
    /// Delete requests rejected at entry (not found, full, shutting down).
    pub removals_rejected: u64,
    /// Removals applied to the engine by a begin-of-step drain.
    pub removals_applied: u64,
    /// Removals the engine refused.
    pub removals_failed: u64,
    /// Death reports (external or lifespan) queued for removal.
    pub death_reports_accepted: u64,
    /// Death reports dropped (unknown name, queue full, shutting down).
    /// A report for an already queued removal is not counted.
    pub death_reports_dropped: u64,
    /// Begin-of-step drains skipped because the queue lock was busy.
    pub removal_drains_skipped: u64,
    /// Creation notifications that matched no inserted entry.
    pub spurious_notifications: u64,
    /// Responses that could not be published.
    pub publish_failures: u64,
    /// Entries currently in the pending insert table.
    pub pending_inserts: usize,
    /// Entries currently in the pending remove queue.
    pub pending_removals: usize,
}

/// Atomic backing store for [`ControllerMetrics`].
#[derive(Debug, Default)]
pub(crate) struct MetricCounters {
    pub inserts_accepted: AtomicU64,
    pub inserts_rejected: AtomicU64,
    pub inserts_started: AtomicU64,
    pub inserts_completed: AtomicU64,
    pub inserts_failed: AtomicU64,
    pub removals_accepted: AtomicU64,
    pub removals_rejected: AtomicU64,
    pub removals_applied: AtomicU64,
    pub removals_failed: AtomicU64,
    pub death_reports_accepted: AtomicU64,
    pub death_reports_dropped: AtomicU64,
    pub removal_drains_skipped: AtomicU64,
    pub spurious_notifications: AtomicU64,
    pub publish_failures: AtomicU64,
}

/// Increment a counter by one.
pub(crate) fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl MetricCounters {
    pub fn snapshot(&self, pending_inserts: usize, pending_removals: usize) -> ControllerMetrics {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        ControllerMetrics {
            inserts_accepted: load(&self.inserts_accepted),
            inserts_rejected: load(&self.inserts_rejected),
            inserts_started: load(&self.inserts_started),
            inserts_completed: load(&self.inserts_completed),
            inserts_failed: load(&self.inserts_failed),
            removals_accepted: load(&self.removals_accepted),
            removals_rejected: load(&self.removals_rejected),
            removals_applied: load(&self.removals_applied),
            removals_failed: load(&self.removals_failed),
            death_reports_accepted: load(&self.death_reports_accepted),
            death_reports_dropped: load(&self.death_reports_dropped),
            removal_drains_skipped: load(&self.removal_drains_skipped),
            spurious_notifications: load(&self.spurious_notifications),
            publish_failures: load(&self.publish_failures),
            pending_inserts,
            pending_removals,
        }
    }
}
