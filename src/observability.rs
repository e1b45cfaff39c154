//! Retrieval counters, mirrored to tracing

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics handle for recording fetch outcomes
#[derive(Debug, Default)]
pub struct Metrics {
    fetches_succeeded: AtomicU64,
    fetches_rejected: AtomicU64,
    fetches_failed: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fetch_succeeded(&self) {
        self.fetches_succeeded.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "fetches_succeeded", "Metric incremented");
    }

    /// Rejected by the size limit before download
    pub fn fetch_rejected(&self) {
        self.fetches_rejected.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "fetches_rejected", "Metric incremented");
    }

    pub fn fetch_failed(&self) {
        self.fetches_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "fetches_failed", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            fetches_succeeded: self.fetches_succeeded.load(Ordering::Relaxed),
            fetches_rejected: self.fetches_rejected.load(Ordering::Relaxed),
            fetches_failed: self.fetches_failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub fetches_succeeded: u64,
    pub fetches_rejected: u64,
    pub fetches_failed: u64,
}
