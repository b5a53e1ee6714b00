//! Always-on safety counters.
//!
//! These are not debug-only assertions: lock-rank violations, CAS
//! retries, and other benign-but-worth-knowing-about events are
//! recorded here in every build so a production deployment can alert
//! on them rather than silently absorbing them.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters tracking recoverable anomalies observed by the concurrency
/// layer. Cheap enough to increment unconditionally on the hot path.
#[derive(Debug, Default)]
pub struct SafetyCounters {
    lock_contention_total: AtomicU64,
    operation_retry_total: AtomicU64,
    lock_rank_violation_total: AtomicU64,
}

impl SafetyCounters {
    pub(crate) fn record_lock_contention(&self) {
        self.lock_contention_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retry(&self) {
        self.operation_retry_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_lock_rank_violation(&self) {
        self.lock_rank_violation_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a point-in-time snapshot for the `stats()` public API.
    #[must_use]
    pub fn snapshot(&self) -> SafetySnapshot {
        SafetySnapshot {
            lock_contention_total: self.lock_contention_total.load(Ordering::Relaxed),
            operation_retry_total: self.operation_retry_total.load(Ordering::Relaxed),
            lock_rank_violation_total: self.lock_rank_violation_total.load(Ordering::Relaxed),
        }
    }
}

/// An immutable snapshot of [`SafetyCounters`] for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SafetySnapshot {
    /// Times a spinlock acquisition had to spin past its first attempt.
    pub lock_contention_total: u64,
    /// Times a CAS-based operation (e.g. entry-point raise) retried.
    pub operation_retry_total: u64,
    /// Times a lock was taken out of the declared rank order.
    pub lock_rank_violation_total: u64,
}
