use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::Serialize;

/// Counters of one operation loop. Written by the loop, read by anyone.
#[derive(Debug, Default)]
pub struct LoopStats {
    iterations: AtomicU64,
    failures: AtomicU64,
    documents: AtomicU64,
    last_error: Mutex<Option<String>>,
}

/// Point-in-time copy of [`LoopStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoopStatsSnapshot {
    pub iterations: u64,
    pub failures: u64,
    /// Documents inserted, updated or soft-deleted.
    pub documents: u64,
    pub last_error: Option<String>,
}

impl LoopStats {
    pub fn record_success(&self, documents: usize) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
        self.documents.fetch_add(documents as u64, Ordering::Relaxed);
    }

    pub fn record_failure(&self, error: &dyn std::fmt::Display) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
        self.failures.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_error.lock() {
            *last = Some(error.to_string());
        }
    }

    pub fn snapshot(&self) -> LoopStatsSnapshot {
        LoopStatsSnapshot {
            iterations: self.iterations.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            documents: self.documents.load(Ordering::Relaxed),
            last_error: self.last_error.lock().ok().and_then(|l| l.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_successes_and_failures() {
        let s = LoopStats::default();
        s.record_success(3);
        s.record_failure(&"store down");
        s.record_success(2);

        let snap = s.snapshot();
        assert_eq!(snap.iterations, 3);
        assert_eq!(snap.failures, 1);
        assert_eq!(snap.documents, 5);
        assert_eq!(snap.last_error.as_deref(), Some("store down"));
    }
}
