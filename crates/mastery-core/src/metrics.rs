//! Global atomic counters for progression observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. when a unit attempt ends).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters.
pub struct Metrics {
    tasks_evaluated: AtomicU64,
    fallback_grades: AtomicU64,
    auto_submits: AtomicU64,
    deliveries_failed: AtomicU64,
    advances: AtomicU64,
    restarts: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            tasks_evaluated: AtomicU64::new(0),
            fallback_grades: AtomicU64::new(0),
            auto_submits: AtomicU64::new(0),
            deliveries_failed: AtomicU64::new(0),
            advances: AtomicU64::new(0),
            restarts: AtomicU64::new(0),
        }
    }

    pub fn inc_tasks_evaluated(&self) {
        self.tasks_evaluated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_fallback_grades(&self) {
        self.fallback_grades.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "fallback_grades", "counter incremented");
    }

    pub fn inc_auto_submits(&self) {
        self.auto_submits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_deliveries_failed(&self) {
        self.deliveries_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "deliveries_failed", "counter incremented");
    }

    pub fn inc_advances(&self) {
        self.advances.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_restarts(&self) {
        self.restarts.fetch_add(1, Ordering::Relaxed);
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            tasks_evaluated = self.tasks_evaluated(),
            fallback_grades = self.fallback_grades(),
            auto_submits = self.auto_submits(),
            deliveries_failed = self.deliveries_failed(),
            advances = self.advances(),
            restarts = self.restarts(),
        );
    }

    pub fn tasks_evaluated(&self) -> u64 {
        self.tasks_evaluated.load(Ordering::Relaxed)
    }

    pub fn fallback_grades(&self) -> u64 {
        self.fallback_grades.load(Ordering::Relaxed)
    }

    pub fn auto_submits(&self) -> u64 {
        self.auto_submits.load(Ordering::Relaxed)
    }

    pub fn deliveries_failed(&self) -> u64 {
        self.deliveries_failed.load(Ordering::Relaxed)
    }

    pub fn advances(&self) -> u64 {
        self.advances.load(Ordering::Relaxed)
    }

    pub fn restarts(&self) -> u64 {
        self.restarts.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        for counter in [
            &self.tasks_evaluated,
            &self.fallback_grades,
            &self.auto_submits,
            &self.deliveries_failed,
            &self.advances,
            &self.restarts,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
